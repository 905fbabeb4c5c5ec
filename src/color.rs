use palette::{Hsv, IntoColor, Srgb};

/// 8-bit RGB triple
pub type Rgb = (u8, u8, u8);

pub const BLACK: Rgb = (0, 0, 0);

/// Convert HSV with all components in 0.0..=1.0 to 8-bit RGB.
/// Hue wraps, so 1.25 and 0.25 give the same color.
pub fn hsv(hue: f32, saturation: f32, value: f32) -> Rgb {
    let hue = hue.rem_euclid(1.0) * 360.0;
    let hsv = Hsv::new(hue, saturation.clamp(0.0, 1.0), value.clamp(0.0, 1.0));
    let rgb: Srgb = hsv.into_color();

    (
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

/// Scale every channel by `factor` (0.0 = black, 1.0 = unchanged)
pub fn dim(color: Rgb, factor: f32) -> Rgb {
    let factor = factor.clamp(0.0, 1.0);
    (
        (color.0 as f32 * factor) as u8,
        (color.1 as f32 * factor) as u8,
        (color.2 as f32 * factor) as u8,
    )
}
