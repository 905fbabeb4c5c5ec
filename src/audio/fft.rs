use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::VecDeque;
use std::sync::Arc;

/// Windowed FFT with log scaling and a moving average over recent spectra
pub struct SpectrumAnalyzer {
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    window: Vec<f32>,
    history: VecDeque<Vec<f32>>,
    smoothing_frames: usize,
}

impl SpectrumAnalyzer {
    pub fn new(fft_size: usize, smoothing_frames: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        // Hamming window
        let denom = (fft_size.max(2) - 1) as f32;
        let window: Vec<f32> = (0..fft_size)
            .map(|i| 0.54 - 0.46 * (2.0 * std::f32::consts::PI * i as f32 / denom).cos())
            .collect();

        Self {
            fft_size,
            fft,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            window,
            history: VecDeque::with_capacity(smoothing_frames.max(1)),
            smoothing_frames: smoothing_frames.max(1),
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Analyze one chunk of samples. Returns `fft_size / 2` bins.
    pub fn process(&mut self, samples: &[i16]) -> Vec<f32> {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = samples.get(i).copied().unwrap_or(0) as f32;
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.buffer);

        let half = self.fft_size / 2;
        let norm = half.max(1) as f32;
        let magnitudes: Vec<f32> = self.buffer[..half]
            .iter()
            .map(|c| 20.0 * (c.norm() / norm + 1.0).log10())
            .collect();

        if self.history.len() == self.smoothing_frames {
            self.history.pop_front();
        }
        self.history.push_back(magnitudes);

        let count = self.history.len() as f32;
        let mut smoothed = vec![0.0; half];
        for spectrum in &self.history {
            for (acc, &m) in smoothed.iter_mut().zip(spectrum) {
                *acc += m;
            }
        }
        for value in &mut smoothed {
            *value /= count;
        }
        smoothed
    }
}

/// Split a spectrum into `num_bands` equal-width bands and average each.
///
/// Trailing bins that don't fill a whole band are ignored. When there are
/// fewer bins than bands every band is zero.
pub fn frequency_bands(spectrum: &[f32], num_bands: usize) -> Vec<f32> {
    if num_bands == 0 {
        return Vec::new();
    }
    let band_size = spectrum.len() / num_bands;
    if band_size == 0 {
        return vec![0.0; num_bands];
    }

    spectrum
        .chunks_exact(band_size)
        .take(num_bands)
        .map(|band| band.iter().sum::<f32>() / band_size as f32)
        .collect()
}
