//! Pixel renderer
//!
//! Every visualization mode draws into an owned RGB pixel buffer (`Canvas`).
//! The terminal backend turns two vertically adjacent pixels into one
//! half-block character cell at submission time.

pub mod draw;
pub mod modes;

use crate::color::{Rgb, BLACK};

/// Width and height of the surface the mode constants are tuned for
pub const REFERENCE_WIDTH: f32 = 1600.0;
pub const REFERENCE_HEIGHT: f32 = 900.0;

/// Owned RGB pixel buffer, row-major
pub struct Canvas {
    pub data: Vec<Rgb>,
    pub width: usize,
    pub height: usize,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: vec![BLACK; width * height],
            width,
            height,
        }
    }

    /// Resize the canvas. Returns true when the dimensions changed, in which
    /// case the contents are cleared to black.
    pub fn resize(&mut self, width: usize, height: usize) -> bool {
        if width == self.width && height == self.height {
            return false;
        }
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(width * height, BLACK);
        true
    }

    #[inline]
    pub fn fill(&mut self, color: Rgb) {
        self.data.fill(color);
    }

    /// Write a pixel, silently ignoring coordinates outside the canvas
    #[inline]
    pub fn put_pixel(&mut self, x: i32, y: i32, color: Rgb) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = color;
        }
    }

    /// Read the pixel at (x, y). Out-of-range reads return black.
    #[inline]
    pub fn get_pixel(&self, x: usize, y: usize) -> Rgb {
        if x < self.width && y < self.height {
            self.data[y * self.width + x]
        } else {
            BLACK
        }
    }

    /// Multiplier that maps reference-surface pixel sizes onto this canvas
    pub fn scale(&self) -> f32 {
        scale_factor(self.width, self.height)
    }
}

pub fn scale_factor(width: usize, height: usize) -> f32 {
    (width as f32 / REFERENCE_WIDTH).min(height as f32 / REFERENCE_HEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_pixel_clips() {
        let mut canvas = Canvas::new(4, 3);
        canvas.put_pixel(-1, 0, (255, 0, 0));
        canvas.put_pixel(4, 0, (255, 0, 0));
        canvas.put_pixel(0, 3, (255, 0, 0));
        assert!(canvas.data.iter().all(|&p| p == BLACK));

        canvas.put_pixel(3, 2, (1, 2, 3));
        assert_eq!(canvas.get_pixel(3, 2), (1, 2, 3));
        assert_eq!(canvas.data[11], (1, 2, 3));
    }

    #[test]
    fn resize_reports_change() {
        let mut canvas = Canvas::new(4, 3);
        canvas.fill((9, 9, 9));
        assert!(!canvas.resize(4, 3));
        assert_eq!(canvas.get_pixel(0, 0), (9, 9, 9));

        assert!(canvas.resize(8, 2));
        assert_eq!(canvas.data.len(), 16);
        assert_eq!(canvas.get_pixel(7, 1), BLACK);
    }

    #[test]
    fn scale_uses_tighter_axis() {
        assert_eq!(scale_factor(1600, 900), 1.0);
        assert_eq!(scale_factor(160, 900), 0.1);
        assert_eq!(scale_factor(1600, 90), 0.1);
    }
}
