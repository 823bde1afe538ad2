use std::collections::VecDeque;
use std::time::Duration;

/// One composed frame: time spent building it and the refresh interval it
/// covered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSample {
    pub work: Duration,
    pub interval: Duration,
}

/// Rolling window of frame samples for instrumentation.
#[derive(Debug, Clone)]
pub struct FrameStats {
    window: VecDeque<FrameSample>,
    capacity: usize,
    frames: u64,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new(120)
    }
}

impl FrameStats {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            frames: 0,
        }
    }

    /// Record the measured work of a frame and the delta (seconds) it ran for.
    pub fn record(&mut self, work: Duration, interval_s: f32) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(FrameSample {
            work,
            interval: Duration::try_from_secs_f32(interval_s).unwrap_or(Duration::ZERO),
        });
        self.frames += 1;
    }

    pub fn last(&self) -> Option<&FrameSample> {
        self.window.back()
    }

    pub fn average_work(&self) -> Duration {
        mean(self.window.iter().map(|s| s.work), self.window.len())
    }

    pub fn max_work(&self) -> Duration {
        self.window.iter().map(|s| s.work).max().unwrap_or(Duration::ZERO)
    }

    pub fn min_work(&self) -> Duration {
        self.window.iter().map(|s| s.work).min().unwrap_or(Duration::ZERO)
    }

    pub fn average_interval(&self) -> Duration {
        mean(self.window.iter().map(|s| s.interval), self.window.len())
    }

    /// Refresh rate over the window, 0 when nothing was recorded.
    pub fn fps(&self) -> f64 {
        let avg = self.average_interval().as_secs_f64();
        if avg > 0.0 { 1.0 / avg } else { 0.0 }
    }

    /// Share of the refresh interval spent composing, averaged over the window.
    pub fn load(&self) -> f64 {
        let interval = self.average_interval().as_secs_f64();
        if interval > 0.0 {
            self.average_work().as_secs_f64() / interval
        } else {
            0.0
        }
    }

    /// Samples currently in the window.
    pub fn count(&self) -> usize {
        self.window.len()
    }

    /// Frames recorded since creation.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

fn mean(values: impl Iterator<Item = Duration>, count: usize) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    values.sum::<Duration>() / count as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats() {
        let stats = FrameStats::new(4);
        assert_eq!(stats.average_work(), Duration::ZERO);
        assert_eq!(stats.max_work(), Duration::ZERO);
        assert_eq!(stats.fps(), 0.0);
        assert_eq!(stats.load(), 0.0);
        assert!(stats.last().is_none());
    }

    #[test]
    fn window_keeps_latest_samples() {
        let mut stats = FrameStats::new(3);
        for ms in [10, 20, 30, 40] {
            stats.record(Duration::from_millis(ms), 0.05);
        }
        assert_eq!(stats.count(), 3);
        assert_eq!(stats.frames(), 4);
        assert_eq!(stats.min_work(), Duration::from_millis(20));
        assert_eq!(stats.max_work(), Duration::from_millis(40));
        assert_eq!(stats.average_work(), Duration::from_millis(30));
    }

    #[test]
    fn work_and_interval_are_tracked_apart() {
        let mut stats = FrameStats::new(8);
        stats.record(Duration::from_millis(4), 0.016);
        stats.record(Duration::from_millis(6), 0.016);
        assert!((stats.fps() - 62.5).abs() < 0.1);
        assert_eq!(stats.average_work(), Duration::from_millis(5));
        assert!((stats.load() - 5.0 / 16.0).abs() < 1e-3);
    }

    #[test]
    fn zero_capacity_is_usable() {
        let mut stats = FrameStats::new(0);
        stats.record(Duration::from_millis(1), 0.02);
        assert_eq!(stats.count(), 1);
        assert!((stats.fps() - 50.0).abs() < 0.01);
    }
}
