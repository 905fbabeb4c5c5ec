use std::collections::VecDeque;

use crate::config::BeatConfig;

/// Bass-energy beat detector.
///
/// A frame is a beat when the energy of the low bins exceeds the running
/// average (current frame included) by `threshold`. After a beat the
/// detector stays quiet for `cooldown_frames` frames.
pub struct BeatDetector {
    bass_bins: usize,
    history: VecDeque<f32>,
    capacity: usize,
    threshold: f32,
    cooldown_frames: u32,
    cooldown: u32,
    last_energy: f32,
}

impl BeatDetector {
    pub fn new(config: &BeatConfig, sample_rate: u32, fft_size: usize) -> Self {
        let bass_bins = (config.bass_cutoff_hz * fft_size as f32 / sample_rate as f32) as usize;
        let capacity = config.history.max(1);

        Self {
            bass_bins,
            history: VecDeque::with_capacity(capacity),
            capacity,
            threshold: config.threshold,
            cooldown_frames: config.cooldown_frames,
            cooldown: 0,
            last_energy: 0.0,
        }
    }

    pub fn bass_bins(&self) -> usize {
        self.bass_bins
    }

    /// Energy of the most recent frame passed to [`BeatDetector::detect`]
    pub fn last_energy(&self) -> f32 {
        self.last_energy
    }

    pub fn detect(&mut self, spectrum: &[f32]) -> bool {
        let end = self.bass_bins.min(spectrum.len());
        let energy: f32 = spectrum[..end].iter().sum();
        self.last_energy = energy;

        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(energy);
        let average = self.history.iter().sum::<f32>() / self.history.len() as f32;

        if self.cooldown > 0 {
            self.cooldown -= 1;
            return false;
        }

        if energy > average * self.threshold {
            self.cooldown = self.cooldown_frames;
            return true;
        }

        false
    }
}
