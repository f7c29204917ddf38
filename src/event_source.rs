use std::collections::VecDeque;
use std::str::FromStr;

/// User interaction with the viewer. Coordinates are panel pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerEvent {
    ZoomIn,
    ZoomOut,
    ResetZoom,
    FitToScreen,
    Resize { width: f64, height: f64 },
    DragStart { x: f64, y: f64 },
    DragMove { x: f64, y: f64 },
    DragEnd,
    Wheel { x: f64, y: f64, delta_y: f64 },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid viewer event '{0}'")]
pub struct ParseEventError(String);

fn parse_numbers<const N: usize>(args: &str, separators: &[char]) -> Option<[f64; N]> {
    let mut values = [0.0; N];
    let mut parts = args.split(separators);
    for value in &mut values {
        *value = parts.next()?.trim().parse().ok()?;
    }
    parts.next().is_none().then_some(values)
}

impl FromStr for ViewerEvent {
    type Err = ParseEventError;

    /// Compact text form: `zoom-in`, `zoom-out`, `reset`, `fit`,
    /// `resize:800x600`, `drag:x,y`, `move:x,y`, `release`, `wheel:x,y,dy`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, args) = s.split_once(':').unwrap_or((s, ""));
        let event = match name {
            "zoom-in" => Some(Self::ZoomIn),
            "zoom-out" => Some(Self::ZoomOut),
            "reset" => Some(Self::ResetZoom),
            "fit" => Some(Self::FitToScreen),
            "release" => Some(Self::DragEnd),
            "resize" => {
                parse_numbers::<2>(args, &['x']).map(|[width, height]| Self::Resize { width, height })
            }
            "drag" => parse_numbers::<2>(args, &[',']).map(|[x, y]| Self::DragStart { x, y }),
            "move" => parse_numbers::<2>(args, &[',']).map(|[x, y]| Self::DragMove { x, y }),
            "wheel" => parse_numbers::<3>(args, &[','])
                .map(|[x, y, delta_y]| Self::Wheel { x, y, delta_y }),
            _ => None,
        };
        event.ok_or_else(|| ParseEventError(s.to_string()))
    }
}

/// Parse events separated by whitespace or `;`
pub fn parse_event_script(script: &str) -> Result<Vec<ViewerEvent>, ParseEventError> {
    script
        .split(|c: char| c == ';' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}

/// Trait for abstracting where viewer events come from
pub trait EventSource {
    fn next_event(&mut self) -> Option<ViewerEvent>;
}

/// Replays a fixed list of events
#[derive(Debug, Default)]
pub struct ScriptedEventSource {
    events: VecDeque<ViewerEvent>,
}

impl ScriptedEventSource {
    pub fn new(events: impl IntoIterator<Item = ViewerEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl EventSource for ScriptedEventSource {
    fn next_event(&mut self) -> Option<ViewerEvent> {
        self.events.pop_front()
    }
}
