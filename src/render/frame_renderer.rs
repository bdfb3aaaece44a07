//! Interprets one frame's object set into a raster image.

use crate::mapper::{self, Dimensions};
use crate::model::{DrawableObject, Point, Shape};
use crate::render::{painter, FrameBuffer};

/// Ghost objects are drawn in fixed black at full opacity divided by this.
const GHOST_ALPHA_DIVISOR: u8 = 10;

fn ghost_color() -> [u8; 4] {
    [0, 0, 0, 255 / GHOST_ALPHA_DIVISOR]
}

/// Renders z-ordered object lists at any target resolution, scaling from
/// the project's canvas-native coordinate space.
pub struct FrameRenderer {
    native: Dimensions,
}

impl FrameRenderer {
    pub fn new(native: Dimensions) -> Self {
        Self { native }
    }

    /// Produce one frame. `objects` must already be in paint order (as
    /// `list_for_frame` returns them). When `ghost` carries the preceding
    /// frame's objects they are drawn first, as a translucent black trace
    /// beneath the current frame, ignoring their own colors.
    pub fn render(
        &self,
        target: Dimensions,
        objects: &[DrawableObject],
        ghost: Option<&[DrawableObject]>,
    ) -> FrameBuffer {
        let mut buffer = FrameBuffer::new(target.width as u32, target.height as u32);
        buffer.clear([255, 255, 255, 255]);
        if let Some(ghost_objects) = ghost {
            log::debug!("ghost underlay: {} objects", ghost_objects.len());
            for object in ghost_objects {
                self.draw(&mut buffer, target, object, Some(ghost_color()));
            }
        }
        for object in objects {
            self.draw(&mut buffer, target, object, None);
        }
        buffer
    }

    fn draw(
        &self,
        buffer: &mut FrameBuffer,
        target: Dimensions,
        object: &DrawableObject,
        override_color: Option<[u8; 4]>,
    ) {
        let scale = |p: Point| mapper::to_display(p, self.native, target);
        match &object.shape {
            Shape::Pen {
                stroke_width,
                color,
                points,
            } => {
                let color = override_color.unwrap_or_else(|| color.channels());
                let radius = mapper::scale_width(*stroke_width, self.native, target);
                for point in points {
                    let p = scale(*point);
                    painter::fill_circle(buffer, p.x, p.y, radius, color);
                }
            }
            Shape::Line {
                stroke_width,
                color,
                start,
                end,
            } => {
                let color = override_color.unwrap_or_else(|| color.channels());
                let width = mapper::scale_width(*stroke_width, self.native, target);
                painter::stroke_segment(buffer, scale(*start), scale(*end), width, color);
            }
            Shape::Ellipse {
                stroke_width,
                color,
                fill_color,
                corner_a,
                corner_b,
            } => {
                let stroke = override_color.unwrap_or_else(|| color.channels());
                let fill = override_color.unwrap_or_else(|| fill_color.channels());
                let width = mapper::scale_width(*stroke_width, self.native, target);
                painter::draw_ellipse(buffer, scale(*corner_a), scale(*corner_b), width, stroke, fill);
            }
            Shape::Filler { fill_color, points } => {
                let color = override_color.unwrap_or_else(|| fill_color.channels());
                let scaled: Vec<Point> = points.iter().map(|p| scale(*p)).collect();
                painter::fill_polygon(buffer, &scaled, color);
            }
        }
    }
}
