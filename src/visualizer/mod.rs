mod particles;

pub use particles::ParticleSystem;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::audio::AudioFrame;
use crate::config::VisualizerConfig;
use crate::renderer::{modes, Canvas};

/// The five selectable visualization modes, numbered as on the keyboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VisualizerMode {
    #[default]
    Circular,
    Spectrum,
    Waveform,
    Radial,
    Particles,
}

impl VisualizerMode {
    pub fn all() -> &'static [VisualizerMode] {
        &[
            VisualizerMode::Circular,
            VisualizerMode::Spectrum,
            VisualizerMode::Waveform,
            VisualizerMode::Radial,
            VisualizerMode::Particles,
        ]
    }

    /// Keyboard number, 1-5
    pub fn number(&self) -> u8 {
        match self {
            VisualizerMode::Circular => 1,
            VisualizerMode::Spectrum => 2,
            VisualizerMode::Waveform => 3,
            VisualizerMode::Radial => 4,
            VisualizerMode::Particles => 5,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Self::all().get((n as usize).checked_sub(1)?).copied()
    }

    /// Short lowercase identifier used in config files and IPC
    pub fn key(&self) -> &'static str {
        match self {
            VisualizerMode::Circular => "circular",
            VisualizerMode::Spectrum => "spectrum",
            VisualizerMode::Waveform => "waveform",
            VisualizerMode::Radial => "radial",
            VisualizerMode::Particles => "particles",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VisualizerMode::Circular => "Circular Frequency Bars",
            VisualizerMode::Spectrum => "Spectrum Analyzer",
            VisualizerMode::Waveform => "Waveform Oscilloscope",
            VisualizerMode::Radial => "Radial Wave Pattern",
            VisualizerMode::Particles => "Particle Explosion",
        }
    }

    pub fn next(&self) -> Self {
        let all = Self::all();
        all[(self.number() as usize) % all.len()]
    }

    pub fn prev(&self) -> Self {
        let all = Self::all();
        all[(self.number() as usize + all.len() - 2) % all.len()]
    }
}

impl fmt::Display for VisualizerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for VisualizerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if let Ok(n) = s.parse::<u8>() {
            return Self::from_number(n).ok_or_else(|| format!("Mode number out of range: {}", n));
        }
        Self::all()
            .iter()
            .find(|m| m.key() == s)
            .copied()
            .ok_or_else(|| format!("Unknown mode: {}", s))
    }
}

impl Serialize for VisualizerMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for VisualizerMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<VisualizerMode>().map_err(serde::de::Error::custom)
    }
}

/// Everything the render loop mutates between frames
pub struct VisualizerState {
    mode: VisualizerMode,
    paused: bool,
    hue: f32,
    beat: bool,
    hue_step: f32,
    bass_energy: f32,
    particles: ParticleSystem,
}

impl VisualizerState {
    pub fn new(config: &VisualizerConfig, start_mode: VisualizerMode) -> Self {
        Self {
            mode: start_mode,
            paused: false,
            hue: 0.0,
            beat: false,
            hue_step: config.hue_step,
            bass_energy: 0.0,
            particles: ParticleSystem::new(config.max_particles),
        }
    }

    pub fn mode(&self) -> VisualizerMode {
        self.mode
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn hue(&self) -> f32 {
        self.hue
    }

    pub fn beat(&self) -> bool {
        self.beat
    }

    /// Bass energy of the last stepped frame
    pub fn bass_energy(&self) -> f32 {
        self.bass_energy
    }

    pub fn particles(&self) -> &ParticleSystem {
        &self.particles
    }

    /// Switch modes. Particles are cleared even when re-selecting the
    /// current mode.
    pub fn set_mode(&mut self, mode: VisualizerMode) {
        self.mode = mode;
        self.particles.clear();
    }

    pub fn next_mode(&mut self) {
        self.set_mode(self.mode.next());
    }

    pub fn prev_mode(&mut self) {
        self.set_mode(self.mode.prev());
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Advance the animation by one analyzed frame. No-op while paused.
    pub fn step(&mut self, frame: &AudioFrame, width: usize, height: usize) {
        if self.paused {
            return;
        }

        self.beat = frame.beat;
        self.bass_energy = frame.bass_energy;
        self.hue = (self.hue + self.hue_step) % 1.0;

        if self.mode == VisualizerMode::Particles {
            let scale = crate::renderer::scale_factor(width, height);
            if self.beat {
                let center = ((width / 2) as f32, (height / 2) as f32);
                self.particles
                    .spawn_burst(&frame.spectrum, center, self.hue, scale);
            }
            self.particles.update(scale);
        }
    }

    /// Draw the active mode for `frame` into the canvas
    pub fn render(&self, canvas: &mut Canvas, frame: &AudioFrame) {
        let ctx = modes::ModeContext {
            spectrum: &frame.spectrum,
            samples: &frame.samples,
            beat: self.beat,
            hue: self.hue,
            particles: &self.particles,
        };
        modes::render_mode(canvas, self.mode, &ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beat_frame() -> AudioFrame {
        AudioFrame {
            sequence: 1,
            samples: vec![0; 2048],
            spectrum: vec![30.0; 1024],
            beat: true,
            bass_energy: 270.0,
        }
    }

    #[test]
    fn numbers_round_trip() {
        for mode in VisualizerMode::all() {
            assert_eq!(VisualizerMode::from_number(mode.number()), Some(*mode));
        }
        assert_eq!(VisualizerMode::from_number(0), None);
        assert_eq!(VisualizerMode::from_number(6), None);
    }

    #[test]
    fn parses_numbers_and_names() {
        assert_eq!("3".parse::<VisualizerMode>(), Ok(VisualizerMode::Waveform));
        assert_eq!(" Particles ".parse::<VisualizerMode>(), Ok(VisualizerMode::Particles));
        assert!("7".parse::<VisualizerMode>().is_err());
        assert!("lasers".parse::<VisualizerMode>().is_err());
    }

    #[test]
    fn config_value_accepts_number() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: VisualizerMode,
        }
        let parsed: Wrapper = toml::from_str("mode = \"4\"").unwrap();
        assert_eq!(parsed.mode, VisualizerMode::Radial);
        assert!(toml::from_str::<Wrapper>("mode = \"zoom\"").is_err());
    }

    #[test]
    fn cycling_wraps() {
        assert_eq!(VisualizerMode::Particles.next(), VisualizerMode::Circular);
        assert_eq!(VisualizerMode::Circular.prev(), VisualizerMode::Particles);
        assert_eq!(VisualizerMode::Spectrum.next(), VisualizerMode::Waveform);
        assert_eq!(VisualizerMode::Spectrum.prev(), VisualizerMode::Circular);
    }

    #[test]
    fn hue_advances_and_wraps() {
        let config = VisualizerConfig {
            hue_step: 0.3,
            ..VisualizerConfig::default()
        };
        let mut state = VisualizerState::new(&config, VisualizerMode::Circular);
        let frame = AudioFrame::default();
        for _ in 0..4 {
            state.step(&frame, 160, 90);
        }
        assert!((state.hue() - 0.2).abs() < 1e-5);
    }

    #[test]
    fn paused_state_is_frozen() {
        let mut state = VisualizerState::new(&VisualizerConfig::default(), VisualizerMode::Particles);
        state.toggle_pause();
        state.step(&beat_frame(), 160, 90);
        assert_eq!(state.hue(), 0.0);
        assert!(!state.beat());
        assert_eq!(state.bass_energy(), 0.0);
        assert!(state.particles().is_empty());

        state.toggle_pause();
        state.step(&beat_frame(), 160, 90);
        assert!(state.beat());
        assert_eq!(state.bass_energy(), 270.0);
        assert_eq!(state.particles().len(), 32);
    }

    #[test]
    fn beats_only_spawn_in_particle_mode() {
        let mut state = VisualizerState::new(&VisualizerConfig::default(), VisualizerMode::Spectrum);
        state.step(&beat_frame(), 160, 90);
        assert!(state.particles().is_empty());
    }

    #[test]
    fn mode_switch_clears_particles() {
        let mut state = VisualizerState::new(&VisualizerConfig::default(), VisualizerMode::Particles);
        state.step(&beat_frame(), 160, 90);
        assert!(!state.particles().is_empty());

        state.set_mode(VisualizerMode::Particles);
        assert!(state.particles().is_empty());
        assert_eq!(state.mode(), VisualizerMode::Particles);
    }
}
