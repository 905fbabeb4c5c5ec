//! The five visualization mode renderers.
//!
//! Each function clears the canvas and draws one complete frame. Pixel
//! sizes are given for the 1600x900 reference surface and multiplied by
//! the canvas scale.

use std::f32::consts::TAU;

use super::draw::{fill_circle, hline, line, polar, polyline, scaled_thickness};
use super::Canvas;
use crate::audio::frequency_bands;
use crate::color::{dim, hsv, BLACK};
use crate::visualizer::{ParticleSystem, VisualizerMode};

/// Per-frame inputs shared by all modes
pub struct ModeContext<'a> {
    pub spectrum: &'a [f32],
    pub samples: &'a [i16],
    pub beat: bool,
    pub hue: f32,
    pub particles: &'a ParticleSystem,
}

/// Dispatch to the correct mode renderer.
pub fn render_mode(canvas: &mut Canvas, mode: VisualizerMode, ctx: &ModeContext) {
    if canvas.width == 0 || canvas.height == 0 {
        return;
    }

    match mode {
        VisualizerMode::Circular => render_circular(canvas, ctx),
        VisualizerMode::Spectrum => render_spectrum(canvas, ctx),
        VisualizerMode::Waveform => render_waveform(canvas, ctx),
        VisualizerMode::Radial => render_radial(canvas, ctx),
        VisualizerMode::Particles => render_particles(canvas, ctx),
    }
}

/// Mode 1: bars radiating outward from a ring, longer on beats
fn render_circular(canvas: &mut Canvas, ctx: &ModeContext) {
    canvas.fill(BLACK);

    let bands = frequency_bands(ctx.spectrum, 120);
    let scale = canvas.scale();
    let cx = (canvas.width / 2) as f32;
    let cy = (canvas.height / 2) as f32;
    let radius = (canvas.width.min(canvas.height) / 3) as f32;
    let thickness = scaled_thickness(3.0, scale);
    let count = bands.len() as f32;

    for (i, &magnitude) in bands.iter().enumerate() {
        let angle = (i as f32 / count) * TAU;
        let color = hsv((ctx.hue + i as f32 / count) % 1.0, 0.8, 0.9);

        let mut bar_length = magnitude * 3.0 * scale;
        if ctx.beat {
            bar_length *= 1.5;
        }

        let (x1, y1) = polar(cx, cy, angle, radius);
        let (x2, y2) = polar(cx, cy, angle, radius + bar_length);
        line(canvas, (x1 as i32, y1 as i32), (x2 as i32, y2 as i32), thickness, color);
    }
}

/// Mode 2: classic spectrum bars, blue when low, red when tall
fn render_spectrum(canvas: &mut Canvas, ctx: &ModeContext) {
    canvas.fill((5, 5, 15));

    let bands = frequency_bands(ctx.spectrum, 80);
    let scale = canvas.scale();
    let height = canvas.height as f32;
    let bar_width = (canvas.width / bands.len().max(1)).max(1) as i32;
    let max_height = (height - 20.0 * scale).max(0.0);

    for (i, &magnitude) in bands.iter().enumerate() {
        let bar_height = (magnitude * 4.0 * scale).min(max_height);
        if bar_height < 1.0 {
            continue;
        }

        let intensity = bar_height / height;
        let hue = (0.6 - intensity * 0.6).rem_euclid(1.0);
        let color = hsv(hue, 0.9, 0.9);

        let x = i as i32 * bar_width;
        let right = x + (bar_width - 2).max(0);

        // Fade towards the top of the bar
        for j in 0..bar_height as i32 {
            let alpha = 1.0 - (j as f32 / bar_height) * 0.3;
            let y = canvas.height as i32 - 1 - j;
            hline(canvas, x, right, y, dim(color, alpha));
        }
    }
}

/// Mode 3: oscilloscope trace with a three-pass glow
fn render_waveform(canvas: &mut Canvas, ctx: &ModeContext) {
    canvas.fill(BLACK);

    let samples = ctx.samples;
    if samples.is_empty() {
        return;
    }

    let scale = canvas.scale();
    let step = (samples.len() / canvas.width).max(1);
    let center = (canvas.height / 2) as i32;
    let amplitude = (canvas.height / 3) as f32;

    let points: Vec<(i32, i32)> = samples
        .iter()
        .step_by(step)
        .enumerate()
        .map(|(x, &sample)| {
            let y = center + ((sample as f32 / 32768.0) * amplitude) as i32;
            (x as i32, y)
        })
        .collect();

    if points.len() < 2 {
        return;
    }

    for (thickness, alpha) in [(5.0, 50u8), (3.0, 150), (1.0, 255)] {
        let color = (0, 255 - alpha / 2, alpha);
        polyline(canvas, &points, false, scaled_thickness(thickness, scale), color);
    }
}

/// Mode 4: three concentric closed waves modulated by the spectrum
fn render_radial(canvas: &mut Canvas, ctx: &ModeContext) {
    canvas.fill(BLACK);

    let bands = frequency_bands(ctx.spectrum, 200);
    let scale = canvas.scale();
    let cx = (canvas.width / 2) as f32;
    let cy = (canvas.height / 2) as f32;
    let thickness = scaled_thickness(2.0, scale);
    let count = bands.len() as f32;

    for wave in 0..3 {
        let wave_f = wave as f32;
        let base_radius = (100.0 + wave_f * 80.0) * scale;
        let gain = (2.0 - wave_f * 0.5) * scale;

        let points: Vec<(i32, i32)> = bands
            .iter()
            .enumerate()
            .map(|(i, &magnitude)| {
                let angle = (i as f32 / count) * TAU;
                let (x, y) = polar(cx, cy, angle, base_radius + magnitude * gain);
                (x as i32, y as i32)
            })
            .collect();

        let color = hsv((ctx.hue + wave_f * 0.2) % 1.0, 0.7, 0.8);
        polyline(canvas, &points, true, thickness, color);
    }
}

/// Mode 5: fading particles, spawned on beats by the visualizer state
fn render_particles(canvas: &mut Canvas, ctx: &ModeContext) {
    canvas.fill((0, 0, 10));

    let scale = canvas.scale();
    for particle in ctx.particles.iter() {
        let alpha = particle.alpha();
        let color = hsv(particle.hue, 0.9, alpha);
        let size = ((3.0 * alpha) as i32 + 1) as f32;
        let radius = (size * scale).round().max(1.0) as i32;
        fill_circle(canvas, particle.x as i32, particle.y as i32, radius, color);
    }
}
