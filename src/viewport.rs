//! Viewport controller
//!
//! Owns the current `FrameCoordinates` and decides which transform policy
//! applies to each event. New blocks get a fresh reset-and-fit; edits to
//! the block already on screen keep the user's pan and zoom and only
//! re-clamp. Rendering is split into `begin_render` / `complete_render` so
//! a completion that arrives after its descriptor was superseded can be
//! recognised and dropped.

use log::{debug, info, warn};

use crate::block::{BlockChange, BlockDescriptor};
use crate::event_source::ViewerEvent;
use crate::frame_coords::FrameCoordinates;
use crate::geometry::Rect;
use crate::renderer::{DiagramRenderer, RenderError, RenderedDiagram};

/// Toolbar zoom multiplier per step
pub const ZOOM_STEP: f64 = 1.2;
/// Wheel zoom multiplier per notch
pub const WHEEL_ZOOM_STEP: f64 = 1.1;
/// Height reserved at the bottom of the panel for overlay controls
pub const DEFAULT_CONTROL_STRIP_HEIGHT: f64 = 56.0;

const TOOLBAR_BUTTON_COUNT: f64 = 7.0;
const TOOLBAR_BUTTON_WIDTH: f64 = 36.0;
const TOOLBAR_GAP_WIDTH: f64 = 4.0;
pub const OVERLAY_TOOLBAR_WIDTH: f64 = TOOLBAR_BUTTON_COUNT * TOOLBAR_BUTTON_WIDTH
    + (TOOLBAR_BUTTON_COUNT - 1.0) * TOOLBAR_GAP_WIDTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewerStatus {
    /// Nothing has rendered successfully yet
    #[default]
    Uninitialized,
    Ready,
}

/// Permission to render one descriptor, handed back on completion
#[derive(Debug, Clone)]
pub struct RenderTicket {
    descriptor: BlockDescriptor,
}

impl RenderTicket {
    pub fn descriptor(&self) -> &BlockDescriptor {
        &self.descriptor
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    /// Markup replaced; `NewBlock` means the viewport was reset
    Rendered(BlockChange),
    /// Renderer rejected the text; `cleared` when the old diagram was removed
    Failed { message: String, cleared: bool },
    /// Text matches what is already on screen
    Unchanged,
    /// A newer descriptor arrived while this one was rendering
    Stale,
}

/// CSS-style placement of the natural-size content inside the panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayTransform {
    pub width: f64,
    pub height: f64,
    pub origin_x: f64,
    pub origin_y: f64,
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale: f64,
}

impl DisplayTransform {
    pub fn css(&self) -> String {
        format!(
            "width: {}px; height: {}px; transform-origin: {}px {}px; transform: translate({}px, {}px) scale({});",
            self.width,
            self.height,
            self.origin_x,
            self.origin_y,
            self.translate_x,
            self.translate_y,
            self.scale
        )
    }
}

#[derive(Debug)]
pub struct ViewportController {
    coords: FrameCoordinates,
    status: ViewerStatus,
    active: Option<BlockDescriptor>,
    last_rendered: Option<BlockDescriptor>,
    svg: Option<String>,
    error: Option<String>,
    drag_anchor: Option<(f64, f64)>,
    control_strip_height: f64,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewportController {
    pub fn new() -> Self {
        Self::with_control_strip_height(DEFAULT_CONTROL_STRIP_HEIGHT)
    }

    pub fn with_control_strip_height(control_strip_height: f64) -> Self {
        Self {
            coords: FrameCoordinates::default(),
            status: ViewerStatus::Uninitialized,
            active: None,
            last_rendered: None,
            svg: None,
            error: None,
            drag_anchor: None,
            control_strip_height,
        }
    }

    pub fn coords(&self) -> &FrameCoordinates {
        &self.coords
    }

    pub fn status(&self) -> ViewerStatus {
        self.status
    }

    pub fn active_block(&self) -> Option<&BlockDescriptor> {
        self.active.as_ref()
    }

    pub fn last_rendered(&self) -> Option<&BlockDescriptor> {
        self.last_rendered.as_ref()
    }

    /// Markup currently on screen
    pub fn svg(&self) -> Option<&str> {
        self.svg.as_deref()
    }

    /// Inline error shown over (or instead of) the diagram
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }

    fn apply(&mut self, transform: impl FnOnce(FrameCoordinates) -> FrameCoordinates) {
        self.coords = transform(self.coords);
    }

    pub fn set_active_block(&mut self, descriptor: BlockDescriptor) {
        debug!(
            "Active block is now #{} of {}",
            descriptor.sequence, descriptor.document_uri
        );
        self.active = Some(descriptor);
    }

    /// Ticket for the active descriptor if it has text that is not on screen yet
    pub fn begin_render(&self) -> Option<RenderTicket> {
        let descriptor = self.active.as_ref()?;
        if descriptor.content.is_empty() {
            return None;
        }
        if !descriptor.is_content_changed(self.last_rendered.as_ref()) {
            debug!("Block #{} unchanged, skipping render", descriptor.sequence);
            return None;
        }
        Some(RenderTicket {
            descriptor: descriptor.clone(),
        })
    }

    pub fn complete_render(
        &mut self,
        ticket: RenderTicket,
        result: Result<RenderedDiagram, RenderError>,
    ) -> RenderOutcome {
        let descriptor = ticket.descriptor;

        if !descriptor.is_current_with(self.active.as_ref()) {
            debug!("Dropping stale render of block #{}", descriptor.sequence);
            return RenderOutcome::Stale;
        }

        let change = descriptor.classify(self.last_rendered.as_ref());
        if change == BlockChange::Unchanged {
            return RenderOutcome::Unchanged;
        }

        match result {
            Ok(diagram) => {
                info!(
                    "Rendered block #{} ({}x{})",
                    descriptor.sequence, diagram.width, diagram.height
                );
                let image_rect = diagram.natural_rect();
                self.apply(|c| {
                    let c = c.with_image_rect(Some(image_rect));
                    if change == BlockChange::NewBlock {
                        c.reset().with_clamped_scale().prevent_exceed_boundary()
                    } else {
                        c.prevent_exceed_boundary()
                    }
                });
                self.svg = Some(diagram.svg);
                self.error = None;
                self.last_rendered = Some(descriptor);
                self.status = ViewerStatus::Ready;
                RenderOutcome::Rendered(change)
            }
            Err(e) => {
                let message = e.to_string();
                warn!("Failed to render block #{}: {message}", descriptor.sequence);
                let cleared = change == BlockChange::NewBlock;
                if cleared {
                    self.svg = None;
                }
                self.error = Some(message.clone());
                self.last_rendered = Some(descriptor);
                RenderOutcome::Failed { message, cleared }
            }
        }
    }

    /// Render the active descriptor synchronously. `None` when there was
    /// nothing new to render.
    pub fn render_active(
        &mut self,
        renderer: &mut dyn DiagramRenderer,
        theme: &str,
    ) -> Option<RenderOutcome> {
        let ticket = self.begin_render()?;
        let result = renderer.render(&ticket.descriptor().content, theme);
        Some(self.complete_render(ticket, result))
    }

    pub fn zoom_in(&mut self) {
        self.apply(|c| {
            c.with_scale(FrameCoordinates::clamp_scale(c.scale * ZOOM_STEP))
                .prevent_exceed_boundary()
        });
    }

    pub fn zoom_out(&mut self) {
        self.apply(|c| {
            c.with_scale(FrameCoordinates::clamp_scale(c.scale / ZOOM_STEP))
                .prevent_exceed_boundary()
        });
    }

    pub fn reset_zoom(&mut self) {
        self.apply(|c| c.reset().with_clamped_scale().prevent_exceed_boundary());
    }

    pub fn fit_to_screen(&mut self) {
        self.apply(|c| c.scale_to_fit().with_clamped_scale().prevent_exceed_boundary());
    }

    pub fn begin_drag(&mut self, x: f64, y: f64) {
        self.drag_anchor = Some((x, y));
    }

    /// Move the content by the pointer delta since the previous position
    pub fn drag_to(&mut self, x: f64, y: f64) {
        let Some((last_x, last_y)) = self.drag_anchor else {
            return;
        };
        self.apply(|c| c.translate(x - last_x, y - last_y).prevent_exceed_boundary());
        self.drag_anchor = Some((x, y));
    }

    pub fn end_drag(&mut self) {
        self.drag_anchor = None;
    }

    /// Wheel zoom anchored at the pointer. Positive `delta_y` (scrolling
    /// down) zooms out, negative zooms in, zero is ignored.
    pub fn wheel(&mut self, x: f64, y: f64, delta_y: f64) {
        if delta_y == 0.0 || delta_y.is_nan() {
            return;
        }
        let factor = if delta_y > 0.0 {
            1.0 / WHEEL_ZOOM_STEP
        } else {
            WHEEL_ZOOM_STEP
        };
        let scale = FrameCoordinates::clamp_scale(self.coords.scale * factor);
        self.apply(|c| c.zoom_at(x, y, scale).prevent_exceed_boundary());
    }

    /// Panel resized. The inner frame loses the control strip unless the
    /// panel is shorter than the strip itself.
    pub fn resize(&mut self, width: f64, height: f64) {
        let inner_height = if height - self.control_strip_height < 0.0 {
            height
        } else {
            height - self.control_strip_height
        };
        self.apply(|c| {
            c.with_boundary_rect(Some(Rect::from_size(width, height)))
                .with_inner_frame_rect(Some(Rect::from_size(width, inner_height)))
                .prevent_exceed_boundary()
        });
    }

    pub fn handle_event(&mut self, event: ViewerEvent) {
        match event {
            ViewerEvent::ZoomIn => self.zoom_in(),
            ViewerEvent::ZoomOut => self.zoom_out(),
            ViewerEvent::ResetZoom => self.reset_zoom(),
            ViewerEvent::FitToScreen => self.fit_to_screen(),
            ViewerEvent::Resize { width, height } => self.resize(width, height),
            ViewerEvent::DragStart { x, y } => self.begin_drag(x, y),
            ViewerEvent::DragMove { x, y } => self.drag_to(x, y),
            ViewerEvent::DragEnd => self.end_drag(),
            ViewerEvent::Wheel { x, y, delta_y } => self.wheel(x, y, delta_y),
        }
    }

    pub fn display_transform(&self) -> Option<DisplayTransform> {
        let image = self.coords.image_rect?;
        let origin_x = image.width / 2.0;
        let origin_y = image.height / 2.0;
        Some(DisplayTransform {
            width: image.width,
            height: image.height,
            origin_x,
            origin_y,
            translate_x: self.coords.offset_x - origin_x,
            translate_y: self.coords.offset_y - origin_y,
            scale: self.coords.scale,
        })
    }

    /// The toolbar sits centred when the panel is wide enough for all of it
    pub fn is_toolbar_centered(&self) -> bool {
        self.coords
            .boundary_rect
            .is_some_and(|b| b.width >= OVERLAY_TOOLBAR_WIDTH)
    }
}
