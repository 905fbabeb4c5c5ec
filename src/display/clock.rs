use std::collections::VecDeque;
use std::time::{Duration, Instant};

const FPS_SAMPLES: usize = 10;

/// Frame pacing and a rolling frames-per-second estimate
pub struct FrameClock {
    target: Duration,
    last_tick: Instant,
    intervals: VecDeque<Duration>,
}

impl FrameClock {
    pub fn new(fps: u32) -> Self {
        Self {
            target: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
            last_tick: Instant::now(),
            intervals: VecDeque::with_capacity(FPS_SAMPLES),
        }
    }

    pub fn target(&self) -> Duration {
        self.target
    }

    /// Time left in the current frame budget
    pub fn remaining(&self) -> Duration {
        self.target.saturating_sub(self.last_tick.elapsed())
    }

    /// Mark the end of a frame
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.record(now.duration_since(self.last_tick));
        self.last_tick = now;
    }

    fn record(&mut self, interval: Duration) {
        if self.intervals.len() == FPS_SAMPLES {
            self.intervals.pop_front();
        }
        self.intervals.push_back(interval);
    }

    /// Average rate over the last ten frames, 0 before the first tick
    pub fn fps(&self) -> f32 {
        let total: Duration = self.intervals.iter().sum();
        if total.is_zero() {
            return 0.0;
        }
        self.intervals.len() as f32 / total.as_secs_f32()
    }
}
