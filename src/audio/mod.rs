mod beat;
mod capture;
mod fft;
mod tone;

pub use beat::BeatDetector;
pub use capture::{list_sources, AudioCapture, PulseSource};
pub use fft::{frequency_bands, SpectrumAnalyzer};
pub use tone::ToneSource;

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::config::Config;

/// One analyzed chunk of microphone input, shared between capture and rendering
#[derive(Debug, Clone, Default)]
pub struct AudioFrame {
    /// Monotonic counter, starts at 1 for the first captured chunk
    pub sequence: u64,
    /// Raw mono samples
    pub samples: Vec<i16>,
    /// Smoothed log-magnitude spectrum, `chunk_size / 2` bins
    pub spectrum: Vec<f32>,
    pub beat: bool,
    /// Summed magnitude of the bass bins
    pub bass_energy: f32,
}

/// Create an audio processing pipeline.
///
/// With `demo` set the microphone is replaced by a synthetic signal.
pub fn create_audio_pipeline(
    config: &Config,
    demo: bool,
) -> anyhow::Result<(AudioCapture, watch::Receiver<Arc<AudioFrame>>)> {
    let (tx, rx) = watch::channel(Arc::new(AudioFrame::default()));

    let analyzer = SpectrumAnalyzer::new(config.audio.chunk_size, config.audio.smoothing_frames);
    let detector = BeatDetector::new(
        &config.beat,
        config.audio.sample_rate,
        config.audio.chunk_size,
    );
    debug!("Beat detection over {} bass bins", detector.bass_bins());

    let capture = if demo {
        let source = ToneSource::new(config.audio.sample_rate);
        AudioCapture::start(source, analyzer, detector, tx)?
    } else {
        let source = PulseSource::open(config.audio.device.as_deref(), config.audio.sample_rate)?;
        AudioCapture::start(source, analyzer, detector, tx)?
    };

    Ok((capture, rx))
}
