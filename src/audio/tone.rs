use std::f64::consts::TAU;
use std::time::{Duration, Instant};

use super::capture::{CaptureError, SampleSource};

/// Synthetic stand-in for a microphone.
///
/// Mixes a slowly sweeping mid tone with a decaying 60 Hz kick every
/// `beat_interval`, and paces reads to real time so frames arrive at the
/// same rate a live device would deliver them.
pub struct ToneSource {
    sample_rate: u32,
    position: u64,
    beat_interval: Duration,
    realtime: bool,
    next_deadline: Option<Instant>,
}

impl ToneSource {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            position: 0,
            beat_interval: Duration::from_millis(500),
            realtime: true,
            next_deadline: None,
        }
    }

    /// Generate samples as fast as they are requested
    pub fn unpaced(mut self) -> Self {
        self.realtime = false;
        self
    }

    fn sample_at(&self, index: u64) -> i16 {
        let rate = self.sample_rate as f64;
        let t = index as f64 / rate;

        // Sweep 440-880 Hz over 8 seconds
        let sweep = 440.0 * (1.0 + (t / 8.0).fract());
        let tone = (TAU * sweep * t).sin() * 0.25;

        let beat_samples = (self.beat_interval.as_secs_f64() * rate).max(1.0) as u64;
        let since_beat = (index % beat_samples) as f64 / rate;
        let kick = (TAU * 60.0 * since_beat).sin() * (-since_beat * 25.0).exp() * 0.7;

        ((tone + kick).clamp(-1.0, 1.0) * i16::MAX as f64) as i16
    }
}

impl SampleSource for ToneSource {
    fn read_chunk(&mut self, buf: &mut [i16]) -> Result<(), CaptureError> {
        for (offset, slot) in buf.iter_mut().enumerate() {
            *slot = self.sample_at(self.position + offset as u64);
        }
        self.position += buf.len() as u64;

        if self.realtime {
            let chunk = Duration::from_secs_f64(buf.len() as f64 / self.sample_rate as f64);
            let deadline = self.next_deadline.unwrap_or_else(Instant::now) + chunk;
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            }
            self.next_deadline = Some(deadline);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("demo tone ({} Hz)", self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{BeatDetector, SpectrumAnalyzer};
    use crate::config::BeatConfig;

    #[test]
    fn chunks_are_continuous() {
        let mut whole = ToneSource::new(44100).unpaced();
        let mut split = ToneSource::new(44100).unpaced();

        let mut a = vec![0i16; 512];
        whole.read_chunk(&mut a).unwrap();

        let mut b = vec![0i16; 256];
        let mut c = vec![0i16; 256];
        split.read_chunk(&mut b).unwrap();
        split.read_chunk(&mut c).unwrap();

        assert_eq!(&a[..256], &b[..]);
        assert_eq!(&a[256..], &c[..]);
    }

    #[test]
    fn kicks_trigger_beats() {
        let mut source = ToneSource::new(44100).unpaced();
        let mut analyzer = SpectrumAnalyzer::new(2048, 3);
        let mut detector = BeatDetector::new(&BeatConfig::default(), 44100, 2048);

        let mut chunk = vec![0i16; 2048];
        let mut beats = 0;
        // About 4.6 seconds of audio, nine kicks
        for _ in 0..100 {
            source.read_chunk(&mut chunk).unwrap();
            let spectrum = analyzer.process(&chunk);
            if detector.detect(&spectrum) {
                beats += 1;
            }
        }
        assert!(beats >= 3, "only {} beats detected", beats);
    }

    #[test]
    fn paced_reads_take_real_time() {
        let mut source = ToneSource::new(8000);
        let mut chunk = vec![0i16; 400];
        let start = Instant::now();
        for _ in 0..3 {
            source.read_chunk(&mut chunk).unwrap();
        }
        // 3 * 50ms
        assert!(start.elapsed() >= Duration::from_millis(140));
    }
}
