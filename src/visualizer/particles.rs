use std::collections::VecDeque;
use std::f32::consts::TAU;

use crate::audio::frequency_bands;

/// Frames a particle lives for
pub const PARTICLE_LIFE: u32 = 60;
const SPAWN_BANDS: usize = 32;
const SPAWN_THRESHOLD: f32 = 5.0;
const SPEED_PER_MAGNITUDE: f32 = 0.5;
const GRAVITY: f32 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub life: u32,
    pub hue: f32,
}

impl Particle {
    /// Remaining life in 0.0..=1.0
    pub fn alpha(&self) -> f32 {
        self.life as f32 / PARTICLE_LIFE as f32
    }
}

/// Beat-spawned particles flying out from the center under gravity
pub struct ParticleSystem {
    particles: VecDeque<Particle>,
    max_particles: usize,
}

impl ParticleSystem {
    pub fn new(max_particles: usize) -> Self {
        Self {
            particles: VecDeque::new(),
            max_particles,
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Emit one particle per loud band, spread evenly around the circle.
    /// The oldest particles are dropped when the cap is exceeded.
    pub fn spawn_burst(&mut self, spectrum: &[f32], center: (f32, f32), hue: f32, scale: f32) {
        let bands = frequency_bands(spectrum, SPAWN_BANDS);
        for (i, &magnitude) in bands.iter().enumerate() {
            if magnitude <= SPAWN_THRESHOLD {
                continue;
            }
            let angle = (i as f32 / SPAWN_BANDS as f32) * TAU;
            let speed = magnitude * SPEED_PER_MAGNITUDE * scale;
            self.particles.push_back(Particle {
                x: center.0,
                y: center.1,
                vx: angle.cos() * speed,
                vy: angle.sin() * speed,
                life: PARTICLE_LIFE,
                hue: (hue + i as f32 / SPAWN_BANDS as f32) % 1.0,
            });
        }

        while self.particles.len() > self.max_particles {
            self.particles.pop_front();
        }
    }

    /// Advance one frame: move, apply gravity, age, and drop dead particles
    pub fn update(&mut self, scale: f32) {
        for p in self.particles.iter_mut() {
            p.x += p.vx;
            p.y += p.vy;
            p.vy += GRAVITY * scale;
            p.life = p.life.saturating_sub(1);
        }
        self.particles.retain(|p| p.life > 0);
    }
}
