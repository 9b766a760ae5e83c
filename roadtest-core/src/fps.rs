//! Throughput measurement over a sliding window of step durations.
use std::{collections::VecDeque, time::Duration};

/// Default number of step durations kept by [`FpsTracker`].
pub const DEFAULT_FPS_WINDOW: usize = 60;

/// Bounded sliding window of recent step durations.
///
/// Pushing past the capacity evicts the oldest entry, so the memory use is
/// fixed no matter how long the process runs.
#[derive(Debug, Clone)]
pub struct FpsTracker {
    window: VecDeque<Duration>,
    capacity: usize,
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self::new(DEFAULT_FPS_WINDOW)
    }
}

impl FpsTracker {
    /// Constructs a tracker keeping at most `capacity` durations.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "FpsTracker needs a non-zero capacity");
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends the duration of a step, evicting the oldest one if full.
    pub fn push(&mut self, d: Duration) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(d);
    }

    /// Returns the number of steps per second over the window.
    ///
    /// Returns `0.0` while the window is empty or sums to zero.
    pub fn fps(&self) -> f32 {
        let total: f64 = self.window.iter().map(Duration::as_secs_f64).sum();
        if total <= 0.0 {
            return 0.0;
        }
        (self.window.len() as f64 / total) as f32
    }

    /// Returns the number of durations in the window.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Returns `true` if no duration has been pushed.
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Returns the capacity of the window.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Removes all durations.
    pub fn clear(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_reports_zero() {
        let fps = FpsTracker::default();
        assert!(fps.is_empty());
        assert_eq!(fps.fps(), 0.0);
    }

    #[test]
    fn zero_durations_do_not_report_infinite_throughput() {
        let mut fps = FpsTracker::new(4);
        fps.push(Duration::ZERO);
        fps.push(Duration::ZERO);
        assert!(fps.fps().is_finite());
        assert_eq!(fps.fps(), 0.0);
    }

    #[test]
    fn window_is_bounded_by_capacity() {
        let mut fps = FpsTracker::new(5);
        for _ in 0..12 {
            fps.push(Duration::from_millis(10));
        }
        assert_eq!(fps.len(), 5);
        assert_eq!(fps.capacity(), 5);
    }

    #[test]
    fn evicted_entries_do_not_affect_fps() {
        let mut fps = FpsTracker::default();

        // The first ten steps are slow and must be evicted by the next sixty.
        for _ in 0..10 {
            fps.push(Duration::from_secs(1));
        }
        for _ in 0..60 {
            fps.push(Duration::from_secs_f64(1.0 / 30.0));
        }

        assert_eq!(fps.len(), 60);
        assert!((fps.fps() - 30.0).abs() < 1e-3, "fps = {}", fps.fps());
    }

    #[test]
    fn seventy_steps_at_thirty_hertz() {
        let mut fps = FpsTracker::new(60);
        for _ in 0..70 {
            fps.push(Duration::from_secs_f64(1.0 / 30.0));
        }
        assert_eq!(fps.len(), 60);
        assert!((fps.fps() - 30.0).abs() < 1e-3);
    }

    #[test]
    #[should_panic]
    fn zero_capacity_is_rejected() {
        let _ = FpsTracker::new(0);
    }
}
