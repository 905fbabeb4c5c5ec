//! Rasterization primitives on top of [`Canvas`].

use super::Canvas;
use crate::color::Rgb;

/// Convert polar coordinates to cartesian.
/// `cx`, `cy`: center point; `angle`: radians; `radius`: distance from center.
#[inline]
pub fn polar(cx: f32, cy: f32, angle: f32, radius: f32) -> (f32, f32) {
    (cx + angle.cos() * radius, cy + angle.sin() * radius)
}

/// Fill a disc of radius `radius` centered on (cx, cy)
pub fn fill_circle(canvas: &mut Canvas, cx: i32, cy: i32, radius: i32, color: Rgb) {
    let r2 = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= r2 {
                canvas.put_pixel(cx + dx, cy + dy, color);
            }
        }
    }
}

/// Horizontal span from x0 to x1 inclusive
pub fn hline(canvas: &mut Canvas, x0: i32, x1: i32, y: i32, color: Rgb) {
    let (start, end) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
    for x in start..=end {
        canvas.put_pixel(x, y, color);
    }
}

/// Draw a line using Bresenham's algorithm. Thickness above 1 stamps a
/// disc at every step.
pub fn line(canvas: &mut Canvas, from: (i32, i32), to: (i32, i32), thickness: i32, color: Rgb) {
    let (mut x0, mut y0) = from;
    let (x1, y1) = to;
    let brush = (thickness.max(1) - 1) / 2;

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if brush == 0 {
            canvas.put_pixel(x0, y0, color);
        } else {
            fill_circle(canvas, x0, y0, brush, color);
        }

        if x0 == x1 && y0 == y1 {
            break;
        }

        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Connect consecutive points; `closed` also joins the last point to the first
pub fn polyline(canvas: &mut Canvas, points: &[(i32, i32)], closed: bool, thickness: i32, color: Rgb) {
    for pair in points.windows(2) {
        line(canvas, pair[0], pair[1], thickness, color);
    }
    if closed && points.len() > 2 {
        line(canvas, points[points.len() - 1], points[0], thickness, color);
    }
}

/// Scale a reference-surface thickness, never below one pixel
#[inline]
pub fn scaled_thickness(reference: f32, scale: f32) -> i32 {
    (reference * scale).round().max(1.0) as i32
}
