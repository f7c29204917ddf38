use std::fmt;

use serde::{Deserialize, Serialize};

/// Diagram theme used for on-screen rendering in light editors
pub const LIGHT_DIAGRAM_THEME: &str = "default";
/// Diagram theme used for on-screen rendering in dark editors
pub const DARK_DIAGRAM_THEME: &str = "dark";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorTheme {
    #[default]
    Light,
    Dark,
}

impl EditorTheme {
    /// Classify an editor background colour. Hex colours below `#808080`
    /// are dark (`#rgb` is read as `#rrggbb`, alpha is ignored); anything
    /// else is dark only if it says so.
    pub fn from_background(color: &str) -> Self {
        let color = color.trim().to_lowercase();
        let is_dark = match color.strip_prefix('#') {
            Some(hex) => rgb_hex(hex)
                .and_then(|rgb| u32::from_str_radix(&rgb, 16).ok())
                .is_some_and(|value| value < 0x0080_8080),
            None => color.contains("dark"),
        };
        if is_dark { Self::Dark } else { Self::Light }
    }

    pub fn diagram_theme(self) -> &'static str {
        match self {
            Self::Light => LIGHT_DIAGRAM_THEME,
            Self::Dark => DARK_DIAGRAM_THEME,
        }
    }
}

/// `rgb`, `rgba`, `rrggbb` or `rrggbbaa` as six hex digits
fn rgb_hex(hex: &str) -> Option<String> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 | 4 => Some(hex.chars().take(3).flat_map(|c| [c, c]).collect()),
        6 | 8 => Some(hex[..6].to_string()),
        _ => None,
    }
}

/// Theme for exported diagrams: follow the editor or use a fixed one
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExportTheme {
    #[default]
    Auto,
    Named(String),
}

impl ExportTheme {
    pub fn resolve(&self, editor: EditorTheme) -> String {
        match self {
            Self::Auto => editor.diagram_theme().to_string(),
            Self::Named(name) => name.clone(),
        }
    }
}

impl From<String> for ExportTheme {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("auto") || value.trim().is_empty() {
            Self::Auto
        } else {
            Self::Named(value)
        }
    }
}

impl From<ExportTheme> for String {
    fn from(value: ExportTheme) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ExportTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Named(name) => f.write_str(name),
        }
    }
}
