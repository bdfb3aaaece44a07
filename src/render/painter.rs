//! Per-variant rasterizers. Everything scans a clamped bounding box and
//! blends through the frame buffer, so out-of-canvas geometry simply
//! clips.

use crate::model::Point;
use crate::render::FrameBuffer;

/// Filled circle, the dab that approximates one freehand-stroke sample.
pub fn fill_circle(buffer: &mut FrameBuffer, cx: i64, cy: i64, radius: f64, color: [u8; 4]) {
    let radius = radius.max(0.5);
    let r2 = radius * radius;
    for (px, py) in clamped_box(
        buffer,
        cx - radius.ceil() as i64,
        cy - radius.ceil() as i64,
        cx + radius.ceil() as i64,
        cy + radius.ceil() as i64,
    ) {
        let dx = px as f64 + 0.5 - cx as f64;
        let dy = py as f64 + 0.5 - cy as f64;
        if dx * dx + dy * dy <= r2 {
            buffer.blend_pixel(px as u32, py as u32, color);
        }
    }
}

/// Stroked straight segment of the given width.
pub fn stroke_segment(buffer: &mut FrameBuffer, a: Point, b: Point, width: f64, color: [u8; 4]) {
    let radius = (width / 2.0).max(0.5);
    let reach = radius.ceil() as i64;
    for (px, py) in clamped_box(
        buffer,
        a.x.min(b.x) - reach,
        a.y.min(b.y) - reach,
        a.x.max(b.x) + reach,
        a.y.max(b.y) + reach,
    ) {
        let d = segment_distance(px as f64 + 0.5, py as f64 + 0.5, a, b);
        if d <= radius {
            buffer.blend_pixel(px as u32, py as u32, color);
        }
    }
}

/// Filled and stroked axis-aligned bounding-box ellipse. The stroke
/// straddles the boundary, half inside and half outside.
pub fn draw_ellipse(
    buffer: &mut FrameBuffer,
    corner_a: Point,
    corner_b: Point,
    stroke_width: f64,
    stroke: [u8; 4],
    fill: [u8; 4],
) {
    let cx = (corner_a.x + corner_b.x) as f64 / 2.0;
    let cy = (corner_a.y + corner_b.y) as f64 / 2.0;
    let rx = ((corner_a.x - corner_b.x).abs() as f64 / 2.0).max(0.5);
    let ry = ((corner_a.y - corner_b.y).abs() as f64 / 2.0).max(0.5);
    let half_stroke = (stroke_width / 2.0).max(0.5);
    let reach = half_stroke.ceil() as i64 + 1;
    for (px, py) in clamped_box(
        buffer,
        corner_a.x.min(corner_b.x) - reach,
        corner_a.y.min(corner_b.y) - reach,
        corner_a.x.max(corner_b.x) + reach,
        corner_a.y.max(corner_b.y) + reach,
    ) {
        let nx = (px as f64 + 0.5 - cx) / rx;
        let ny = (py as f64 + 0.5 - cy) / ry;
        let v = (nx * nx + ny * ny).sqrt();
        // Radial distance from the boundary, approximated on the minor
        // axis scale.
        let boundary_distance = (v - 1.0).abs() * rx.min(ry);
        if v <= 1.0 {
            buffer.blend_pixel(px as u32, py as u32, fill);
        }
        if boundary_distance <= half_stroke {
            buffer.blend_pixel(px as u32, py as u32, stroke);
        }
    }
}

/// Even-odd filled closed polygon through the vertices in order.
pub fn fill_polygon(buffer: &mut FrameBuffer, points: &[Point], color: [u8; 4]) {
    if points.len() < 3 {
        return;
    }
    let (_, buf_height) = buffer.dimensions();
    let y_min = points.iter().map(|p| p.y).min().unwrap_or(0).max(0);
    let y_max = points
        .iter()
        .map(|p| p.y)
        .max()
        .unwrap_or(0)
        .min(buf_height as i64 - 1);
    let mut crossings: Vec<f64> = Vec::new();
    for py in y_min..=y_max {
        let scan = py as f64 + 0.5;
        crossings.clear();
        for i in 0..points.len() {
            let a = points[i];
            let b = points[(i + 1) % points.len()];
            let (ay, by) = (a.y as f64, b.y as f64);
            if (ay <= scan && by > scan) || (by <= scan && ay > scan) {
                let t = (scan - ay) / (by - ay);
                crossings.push(a.x as f64 + t * (b.x - a.x) as f64);
            }
        }
        crossings.sort_by(|a, b| a.partial_cmp(b).expect("finite crossings"));
        for pair in crossings.chunks_exact(2) {
            let start = pair[0].floor().max(0.0) as i64;
            let end = pair[1].ceil() as i64;
            for px in start..end {
                if px >= 0 {
                    buffer.blend_pixel(px as u32, py as u32, color);
                }
            }
        }
    }
}

/// Iterate the buffer pixels inside an inclusive box, clamped to bounds.
fn clamped_box(
    buffer: &FrameBuffer,
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
) -> impl Iterator<Item = (i64, i64)> {
    let (width, height) = buffer.dimensions();
    let x0 = x0.max(0);
    let y0 = y0.max(0);
    let x1 = x1.min(width as i64 - 1);
    let y1 = y1.min(height as i64 - 1);
    (y0..=y1).flat_map(move |py| (x0..=x1).map(move |px| (px, py)))
}

fn segment_distance(px: f64, py: f64, a: Point, b: Point) -> f64 {
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (bx, by) = (b.x as f64, b.y as f64);
    let (dx, dy) = (bx - ax, by - ay);
    let length2 = dx * dx + dy * dy;
    let t = if length2 == 0.0 {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / length2).clamp(0.0, 1.0)
    };
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];
    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    fn white_buffer() -> FrameBuffer {
        let mut fb = FrameBuffer::new(100, 100);
        fb.clear(WHITE);
        fb
    }

    #[test]
    fn test_fill_circle_covers_center_not_corner() {
        let mut fb = white_buffer();
        fill_circle(&mut fb, 50, 50, 10.0, RED);
        assert_eq!(fb.get_pixel(50, 50), Some(RED));
        assert_eq!(fb.get_pixel(50, 42), Some(RED));
        // Corner of the bounding box lies outside the disc.
        assert_eq!(fb.get_pixel(41, 41), Some(WHITE));
    }

    #[test]
    fn test_fill_circle_clips_at_edges() {
        let mut fb = white_buffer();
        fill_circle(&mut fb, 0, 0, 5.0, RED);
        assert_eq!(fb.get_pixel(0, 0), Some(RED));
        // No panic, nothing outside was touched.
        assert_eq!(fb.get_pixel(10, 10), Some(WHITE));
    }

    #[test]
    fn test_stroke_segment_diagonal() {
        let mut fb = white_buffer();
        stroke_segment(&mut fb, Point::new(10, 10), Point::new(90, 90), 4.0, RED);
        assert_eq!(fb.get_pixel(50, 50), Some(RED));
        assert_eq!(fb.get_pixel(10, 90), Some(WHITE));
    }

    #[test]
    fn test_zero_length_segment_still_dabs() {
        let mut fb = white_buffer();
        stroke_segment(&mut fb, Point::new(30, 30), Point::new(30, 30), 6.0, RED);
        assert_eq!(fb.get_pixel(30, 30), Some(RED));
    }

    #[test]
    fn test_ellipse_fill_and_stroke() {
        let mut fb = white_buffer();
        draw_ellipse(
            &mut fb,
            Point::new(20, 30),
            Point::new(80, 70),
            2.0,
            RED,
            BLUE,
        );
        // Center is fill, boundary midpoints are stroke.
        assert_eq!(fb.get_pixel(50, 50), Some(BLUE));
        assert_eq!(fb.get_pixel(20, 50), Some(RED));
        assert_eq!(fb.get_pixel(50, 30), Some(RED));
        // Bounding-box corner stays clear.
        assert_eq!(fb.get_pixel(21, 31), Some(WHITE));
    }

    #[test]
    fn test_degenerate_ellipse_does_not_panic() {
        let mut fb = white_buffer();
        draw_ellipse(
            &mut fb,
            Point::new(40, 40),
            Point::new(40, 40),
            2.0,
            RED,
            BLUE,
        );
    }

    #[test]
    fn test_polygon_even_odd_fill() {
        let mut fb = white_buffer();
        let square = [
            Point::new(10, 10),
            Point::new(60, 10),
            Point::new(60, 60),
            Point::new(10, 60),
        ];
        fill_polygon(&mut fb, &square, RED);
        assert_eq!(fb.get_pixel(30, 30), Some(RED));
        assert_eq!(fb.get_pixel(70, 30), Some(WHITE));
    }

    #[test]
    fn test_polygon_needs_three_vertices() {
        let mut fb = white_buffer();
        fill_polygon(&mut fb, &[Point::new(1, 1), Point::new(5, 5)], RED);
        assert_eq!(fb.get_pixel(3, 3), Some(WHITE));
    }

    #[test]
    fn test_concave_polygon_leaves_notch_clear() {
        let mut fb = white_buffer();
        let arrow = [
            Point::new(10, 10),
            Point::new(90, 10),
            Point::new(90, 90),
            Point::new(50, 40),
            Point::new(10, 90),
        ];
        fill_polygon(&mut fb, &arrow, RED);
        assert_eq!(fb.get_pixel(50, 20), Some(RED));
        // Inside the notch between the two legs.
        assert_eq!(fb.get_pixel(50, 80), Some(WHITE));
    }
}
