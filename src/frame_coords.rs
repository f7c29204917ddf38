//! Viewport coordinate model
//!
//! Maps a rendered diagram of arbitrary natural size into the viewing
//! frame. Every operation consumes a `FrameCoordinates` value and returns a
//! new one, so calls chain left to right and later calls win:
//!
//! ```
//! use mermaidlens::frame_coords::FrameCoordinates;
//! use mermaidlens::geometry::Rect;
//!
//! let coords = FrameCoordinates::default()
//!     .with_boundary_rect(Some(Rect::from_size(800.0, 600.0)))
//!     .with_image_rect(Some(Rect::from_size(400.0, 300.0)))
//!     .scale_to_fit();
//! assert_eq!(coords.scale, 2.0);
//! assert_eq!((coords.offset_x, coords.offset_y), (400.0, 300.0));
//! ```
//!
//! Operations that need a rect which is not set return the input unchanged.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// Smallest zoom factor reachable through user zoom
pub const MIN_SCALE: f64 = 0.2;
/// Largest zoom factor reachable through user zoom
pub const MAX_SCALE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameCoordinates {
    /// Zoom applied to the natural-size content
    pub scale: f64,
    /// Where the centre of the scaled content sits inside the boundary
    pub offset_x: f64,
    pub offset_y: f64,
    /// Natural size of the rendered content, unset until the first render
    pub image_rect: Option<Rect>,
    /// Full viewing area
    pub boundary_rect: Option<Rect>,
    /// Viewing area minus the strip reserved for overlay controls
    pub inner_frame_rect: Option<Rect>,
}

impl Default for FrameCoordinates {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            image_rect: None,
            boundary_rect: None,
            inner_frame_rect: None,
        }
    }
}

impl FrameCoordinates {
    /// Clamp a zoom factor into `[MIN_SCALE, MAX_SCALE]`, mapping NaN to 1.0
    pub fn clamp_scale(scale: f64) -> f64 {
        if scale.is_nan() {
            1.0
        } else {
            scale.clamp(MIN_SCALE, MAX_SCALE)
        }
    }

    #[must_use]
    pub fn with_scale(self, scale: f64) -> Self {
        Self { scale, ..self }
    }

    #[must_use]
    pub fn with_clamped_scale(self) -> Self {
        self.with_scale(Self::clamp_scale(self.scale))
    }

    #[must_use]
    pub fn with_offset(self, offset_x: f64, offset_y: f64) -> Self {
        Self {
            offset_x,
            offset_y,
            ..self
        }
    }

    #[must_use]
    pub fn with_offset_x(self, offset_x: f64) -> Self {
        Self { offset_x, ..self }
    }

    #[must_use]
    pub fn with_offset_y(self, offset_y: f64) -> Self {
        Self { offset_y, ..self }
    }

    #[must_use]
    pub fn with_image_rect(self, image_rect: Option<Rect>) -> Self {
        Self { image_rect, ..self }
    }

    #[must_use]
    pub fn with_boundary_rect(self, boundary_rect: Option<Rect>) -> Self {
        Self {
            boundary_rect,
            ..self
        }
    }

    #[must_use]
    pub fn with_inner_frame_rect(self, inner_frame_rect: Option<Rect>) -> Self {
        Self {
            inner_frame_rect,
            ..self
        }
    }

    /// Shift the offset by a pointer delta
    #[must_use]
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        self.with_offset(self.offset_x + dx, self.offset_y + dy)
    }

    /// Place the content centre at the boundary centre, or at the origin
    /// when no boundary is known
    #[must_use]
    pub fn center(self) -> Self {
        match self.boundary_rect {
            Some(boundary) => {
                let (x, y) = boundary.center();
                self.with_offset(x, y)
            }
            None => self.with_offset(0.0, 0.0),
        }
    }

    #[must_use]
    pub fn center_at_inner_frame(self) -> Self {
        let (Some(_), Some(frame)) = (self.image_rect, self.inner_frame_rect) else {
            return self;
        };
        let (x, y) = frame.center();
        self.with_offset(x, y)
    }

    /// Keep the content from leaving the boundary.
    ///
    /// Per axis: content larger than the boundary may be panned only until
    /// one of its edges meets the boundary edge, so the offset stays in
    /// `[boundary - scaled / 2, scaled / 2]`. Content that fits is pinned
    /// inside, offset in `[scaled / 2, boundary - scaled / 2]`.
    #[must_use]
    pub fn prevent_exceed_boundary(self) -> Self {
        let (Some(image), Some(boundary)) = (self.image_rect, self.boundary_rect) else {
            return self;
        };

        let offset_x = clamp_axis(self.offset_x, image.width * self.scale, boundary.width);
        let offset_y = clamp_axis(self.offset_y, image.height * self.scale, boundary.height);
        self.with_offset(offset_x, offset_y)
    }

    /// Scale so the whole content fits the boundary, then centre it.
    /// The result is not clamped to the user zoom range.
    #[must_use]
    pub fn scale_to_fit(self) -> Self {
        let (Some(image), Some(boundary)) = (self.image_rect, self.boundary_rect) else {
            return self;
        };
        if image.is_degenerate() {
            return self;
        }

        let scale_x = boundary.width / image.width;
        let scale_y = boundary.height / image.height;
        self.with_scale(scale_x.min(scale_y)).center()
    }

    /// First view of new content: native size centred in the inner frame
    /// when it fits there, otherwise fit to the boundary and centre.
    #[must_use]
    pub fn reset(self) -> Self {
        let (Some(image), Some(frame)) = (self.image_rect, self.inner_frame_rect) else {
            return self;
        };

        if image.fits_within(&frame) {
            return self.with_scale(1.0).center_at_inner_frame();
        }

        self.scale_to_fit().center()
    }

    /// Content-space point (relative to the content centre, unscaled) that
    /// is currently drawn at the given panel position
    pub fn content_point_at(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.offset_x) / self.scale,
            (y - self.offset_y) / self.scale,
        )
    }

    /// Change the scale while keeping the content point under `(x, y)` fixed
    #[must_use]
    pub fn zoom_at(self, x: f64, y: f64, scale: f64) -> Self {
        if !(self.scale > 0.0) {
            return self.with_scale(scale);
        }
        let (content_x, content_y) = self.content_point_at(x, y);
        self.with_scale(scale)
            .with_offset(x - content_x * scale, y - content_y * scale)
    }
}

fn clamp_axis(offset: f64, scaled: f64, boundary: f64) -> f64 {
    let half = scaled / 2.0;
    if scaled > boundary {
        offset.min(half).max(boundary - half)
    } else {
        offset.max(half).min(boundary - half)
    }
}
