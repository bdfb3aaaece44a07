//! Conversion between the interaction surface's current display size and
//! the project's fixed canvas-native resolution.
//!
//! All persisted coordinates are native; display-to-native conversion
//! happens once on write, native-to-display on every read at render time.
//! Both directions truncate (multiply first, then divide in integers) so
//! round trips are deterministic.

use crate::model::Point;

/// A width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: i64,
    pub height: i64,
}

impl Dimensions {
    pub fn new(width: i64, height: i64) -> Self {
        Self { width, height }
    }
}

/// Convert a display-space point into canvas-native coordinates.
pub fn to_native(p: Point, display: Dimensions, native: Dimensions) -> Point {
    Point {
        x: p.x * native.width / display.width,
        y: p.y * native.height / display.height,
    }
}

/// Convert a canvas-native point into display-space coordinates, the
/// inverse of `to_native` using the reciprocal ratio.
pub fn to_display(p: Point, native: Dimensions, display: Dimensions) -> Point {
    Point {
        x: p.x * display.width / native.width,
        y: p.y * display.height / native.height,
    }
}

/// Scale a stroke width from native to target space. Widths follow the
/// horizontal ratio only.
pub fn scale_width(stroke_width: i64, native: Dimensions, target: Dimensions) -> f64 {
    stroke_width as f64 * target.width as f64 / native.width as f64
}
