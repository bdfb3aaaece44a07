use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CelError;

/// A point in canvas-native coordinates (the project's configured
/// width x height, independent of on-screen zoom).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Translate by a delta, used by object repositioning.
    pub fn offset(self, dx: i64, dy: i64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// RGBA color, each channel 0-255. Persisted as the delimited text form
/// `R|G|B|A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque black, the default stroke color of a new project.
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

    /// Fully transparent, the default fill color of a new project.
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub fn channels(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}|{}", self.r, self.g, self.b, self.a)
    }
}

impl FromStr for Color {
    type Err = CelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut channels = [0u8; 4];
        let mut parts = s.split('|');
        for channel in &mut channels {
            let part = parts
                .next()
                .ok_or_else(|| CelError::validation(format!("malformed color '{s}'")))?;
            *channel = part
                .trim()
                .parse()
                .map_err(|_| CelError::validation(format!("malformed color '{s}'")))?;
        }
        if parts.next().is_some() {
            return Err(CelError::validation(format!("malformed color '{s}'")));
        }
        Ok(Color::rgba(channels[0], channels[1], channels[2], channels[3]))
    }
}

/// The four drawable-object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Freehand stroke approximated by circular dabs ("pen").
    Pen,
    /// A single straight segment.
    Line,
    /// Axis-aligned bounding-box ellipse, stroked and filled.
    Ellipse,
    /// Filled closed polygon ("filler").
    Filler,
}

impl Variant {
    pub const ALL: [Variant; 4] = [Variant::Pen, Variant::Line, Variant::Ellipse, Variant::Filler];

    /// Table name of the variant's geometry rows.
    pub fn table(self) -> &'static str {
        match self {
            Variant::Pen => "pen",
            Variant::Line => "line",
            Variant::Ellipse => "ellipse",
            Variant::Filler => "filler",
        }
    }

    /// Point-list variants own a child point table.
    pub fn has_points(self) -> bool {
        matches!(self, Variant::Pen | Variant::Filler)
    }

    /// Default display name given to a freshly created object.
    pub fn default_name(self) -> &'static str {
        match self {
            Variant::Pen => "Pen",
            Variant::Line => "Line",
            Variant::Ellipse => "Ellipse",
            Variant::Filler => "Filler",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Handle to a persisted object. Row ids are per-variant table, so the
/// variant tag is part of the identity. `ObjectStore::create` returns this
/// and the caller holds it for the duration of a drag gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId {
    pub variant: Variant,
    pub row: i64,
}

impl ObjectId {
    pub fn new(variant: Variant, row: i64) -> Self {
        Self { variant, row }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.variant, self.row)
    }
}

/// Variant-specific geometry, tagged explicitly. The persisted rows keep
/// the historical nullable-column layout; this union is built once at the
/// store boundary and dispatch never re-derives the kind downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "lowercase")]
pub enum Shape {
    Pen {
        stroke_width: i64,
        color: Color,
        /// Append-only; insertion order is render order for the dabs.
        points: Vec<Point>,
    },
    Line {
        stroke_width: i64,
        color: Color,
        start: Point,
        end: Point,
    },
    Ellipse {
        stroke_width: i64,
        color: Color,
        fill_color: Color,
        corner_a: Point,
        corner_b: Point,
    },
    Filler {
        fill_color: Color,
        points: Vec<Point>,
    },
}

impl Shape {
    pub fn variant(&self) -> Variant {
        match self {
            Shape::Pen { .. } => Variant::Pen,
            Shape::Line { .. } => Variant::Line,
            Shape::Ellipse { .. } => Variant::Ellipse,
            Shape::Filler { .. } => Variant::Filler,
        }
    }
}

/// One drawable object as returned by `ObjectStore::list_for_frame`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawableObject {
    pub id: ObjectId,
    pub frame: i64,
    pub z_index: i64,
    pub name: String,
    pub shape: Shape,
}
