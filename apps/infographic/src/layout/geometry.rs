//! Box geometry shared by the painter and the generation client.
//!
//! Generated boxes are normalized `[x, y, w, h]` with `(x, y)` at the box
//! center. Painting happens in pixel space, so every box is converted with
//! the canvas size right before it is drawn.

use serde::{Deserialize, Serialize};

/// Canvas dimensions in pixels, `(height, width)` ordered like the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub height: u32,
    pub width: u32,
}

/// A normalized layout box. `x`/`y` are the center, all values in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct NormalizedBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl From<[f64; 4]> for NormalizedBox {
    fn from([x, y, width, height]: [f64; 4]) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl From<NormalizedBox> for [f64; 4] {
    fn from(b: NormalizedBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

impl NormalizedBox {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// All four values finite and within `[0, 1]`.
    pub fn is_normalized(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite() && (0.0..=1.0).contains(v))
    }

    /// `(left, top, right, bottom)` in normalized units.
    pub fn to_ltrb(&self) -> (f64, f64, f64, f64) {
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        (
            self.x - half_w,
            self.y - half_h,
            self.x + half_w,
            self.y + half_h,
        )
    }

    /// Scales the box onto the canvas. Each edge is truncated toward zero.
    pub fn to_pixels(&self, canvas: CanvasSize) -> PixelRect {
        let (l, t, r, b) = self.to_ltrb();
        let w = canvas.width as f64;
        let h = canvas.height as f64;
        PixelRect {
            left: (l * w) as i64,
            top: (t * h) as i64,
            right: (r * w) as i64,
            bottom: (b * h) as i64,
        }
    }
}

/// A box in canvas pixels. Edges may lie outside the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl PixelRect {
    pub fn width(&self) -> i64 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i64 {
        self.bottom.saturating_sub(self.top)
    }

    /// The part of the rect inside the canvas, or `None` if nothing is visible.
    pub fn clip_to(&self, canvas: CanvasSize) -> Option<PixelRect> {
        let clipped = PixelRect {
            left: self.left.max(0),
            top: self.top.max(0),
            right: self.right.min(canvas.width as i64),
            bottom: self.bottom.min(canvas.height as i64),
        };
        (clipped.width() > 0 && clipped.height() > 0).then_some(clipped)
    }
}
