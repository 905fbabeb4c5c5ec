use libpulse_binding as pulse;
use libpulse_simple_binding as psimple;
use pulse::sample::{Format, Spec};
use pulse::stream::Direction;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::beat::BeatDetector;
use super::fft::SpectrumAnalyzer;
use super::AudioFrame;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("invalid PulseAudio sample spec")]
    InvalidSpec,
    #[error("failed to connect to PulseAudio: {0}")]
    Connect(String),
    #[error("PulseAudio read error: {0}")]
    Read(String),
    #[error("failed to query sources: {0}")]
    Pactl(String),
    #[error("failed to spawn capture thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Anything that can hand out fixed-size chunks of mono 16-bit PCM
pub trait SampleSource: Send + 'static {
    /// Fill all of `buf`, blocking until enough samples are available.
    fn read_chunk(&mut self, buf: &mut [i16]) -> Result<(), CaptureError>;

    fn describe(&self) -> String;
}

/// Microphone input through a PulseAudio/PipeWire record stream
pub struct PulseSource {
    stream: psimple::Simple,
    device: Option<String>,
    bytes: Vec<u8>,
}

impl PulseSource {
    /// Open a mono S16LE record stream. `device = None` uses the server's
    /// default source, which is normally the microphone.
    pub fn open(device: Option<&str>, sample_rate: u32) -> Result<Self, CaptureError> {
        let spec = Spec {
            format: Format::S16le,
            channels: 1,
            rate: sample_rate,
        };

        if !spec.is_valid() {
            return Err(CaptureError::InvalidSpec);
        }

        info!("Using audio source: {}", device.unwrap_or("default"));

        let stream = psimple::Simple::new(
            None,               // Use default server
            "micviz",           // Application name
            Direction::Record,  // Recording stream
            device,             // Source name (None = default)
            "microphone-input", // Stream description
            &spec,              // Sample format
            None,               // Default channel map
            None,               // Default buffering attributes
        )
        .map_err(|e| CaptureError::Connect(format!("{:?}", e)))?;

        info!("Connected to PulseAudio at {} Hz", sample_rate);

        Ok(Self {
            stream,
            device: device.map(str::to_string),
            bytes: Vec::new(),
        })
    }
}

impl SampleSource for PulseSource {
    fn read_chunk(&mut self, buf: &mut [i16]) -> Result<(), CaptureError> {
        self.bytes.resize(buf.len() * 2, 0);
        self.stream
            .read(&mut self.bytes)
            .map_err(|e| CaptureError::Read(format!("{:?}", e)))?;

        for (sample, pair) in buf.iter_mut().zip(self.bytes.chunks_exact(2)) {
            *sample = i16::from_le_bytes([pair[0], pair[1]]);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("pulse:{}", self.device.as_deref().unwrap_or("default"))
    }
}

/// List available PulseAudio/PipeWire sources.
///
/// Returns a list of `(name, state)` tuples parsed from `pactl list short sources`.
pub fn list_sources() -> Result<Vec<(String, String)>, CaptureError> {
    let output = std::process::Command::new("pactl")
        .args(["list", "short", "sources"])
        .output()
        .map_err(|e| CaptureError::Pactl(e.to_string()))?;

    if !output.status.success() {
        return Err(CaptureError::Pactl("pactl list short sources failed".to_string()));
    }

    Ok(parse_sources(&String::from_utf8_lossy(&output.stdout)))
}

fn parse_sources(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            // Format: <id>\t<name>\t<module>\t<sample_spec>\t<state>
            let cols: Vec<&str> = line.split('\t').collect();
            (cols.len() >= 5).then(|| (cols[1].to_string(), cols[4].to_string()))
        })
        .collect()
}

pub struct AudioCapture {
    // Keep the thread handle to ensure it stays alive
    _capture_thread: thread::JoinHandle<()>,
    stop_flag: Arc<AtomicBool>,
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }
}

impl AudioCapture {
    /// Spawn the capture thread: read, analyze and publish one frame per chunk.
    pub fn start<S: SampleSource>(
        source: S,
        analyzer: SpectrumAnalyzer,
        detector: BeatDetector,
        sender: watch::Sender<Arc<AudioFrame>>,
    ) -> Result<Self, CaptureError> {
        let chunk_size = analyzer.fft_size();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_flag_clone = stop_flag.clone();

        info!("Starting capture from {} ({} samples/frame)", source.describe(), chunk_size);

        let capture_thread = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || {
                Self::capture_loop(source, chunk_size, analyzer, detector, sender, stop_flag_clone);
            })?;

        Ok(Self {
            _capture_thread: capture_thread,
            stop_flag,
        })
    }

    fn capture_loop<S: SampleSource>(
        mut source: S,
        chunk_size: usize,
        mut analyzer: SpectrumAnalyzer,
        mut detector: BeatDetector,
        sender: watch::Sender<Arc<AudioFrame>>,
        stop_flag: Arc<AtomicBool>,
    ) {
        let mut samples = vec![0i16; chunk_size];
        let mut sequence = 0u64;

        loop {
            if stop_flag.load(Ordering::Relaxed) {
                debug!("Stop flag set, ending capture loop");
                break;
            }

            // A failed read becomes a silent frame so the display keeps moving
            if let Err(e) = source.read_chunk(&mut samples) {
                warn!("{}", e);
                samples.fill(0);
            }

            let spectrum = analyzer.process(&samples);
            let beat = detector.detect(&spectrum);
            sequence += 1;

            let frame = AudioFrame {
                sequence,
                samples: samples.clone(),
                spectrum,
                beat,
                bass_energy: detector.last_energy(),
            };

            // Send to visualizer (ignore errors if receiver is dropped)
            if sender.send(Arc::new(frame)).is_err() {
                debug!("Audio receiver dropped, stopping capture");
                break;
            }
        }
    }
}
