//! Per-frame time source.
//!
//! The engine reads the caller's timestamp once per frame through
//! [`FrameClock::tick`], which never lets time run backwards and keeps a
//! rolling window of frame intervals for rate reporting.

use std::collections::VecDeque;

use tracing::warn;

/// Clamped frame clock with rolling interval statistics.
#[derive(Debug)]
pub struct FrameClock {
    /// Last accepted timestamp (seconds).
    last: Option<f64>,
    /// Recent frame intervals (seconds).
    intervals: VecDeque<f64>,
    /// Maximum number of intervals to keep.
    pub window_size: usize,
    /// Frames ticked.
    pub total_frames: u64,
    /// Ticks whose raw timestamp was behind the previous frame.
    pub backwards_count: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(120)
    }
}

impl FrameClock {
    pub fn new(window_size: usize) -> Self {
        Self {
            last: None,
            intervals: VecDeque::with_capacity(window_size),
            window_size: window_size.max(1),
            total_frames: 0,
            backwards_count: 0,
        }
    }

    /// Accept the caller's timestamp for this frame and return the time the
    /// frame is evaluated at.  A timestamp earlier than the previous frame
    /// (or non-finite) is held at the previous value.
    pub fn tick(&mut self, raw_s: f64) -> f64 {
        self.total_frames += 1;
        let now = match self.last {
            None if raw_s.is_finite() => raw_s,
            None => 0.0,
            Some(prev) if raw_s.is_finite() && raw_s >= prev => {
                self.push_interval(raw_s - prev);
                raw_s
            }
            Some(prev) => {
                self.backwards_count += 1;
                warn!(
                    "clock moved backwards: {:.4}s -> {:.4}s, holding at previous frame",
                    prev, raw_s
                );
                self.push_interval(0.0);
                prev
            }
        };
        self.last = Some(now);
        now
    }

    /// Time of the most recent frame, if any.
    pub fn now(&self) -> Option<f64> {
        self.last
    }

    fn push_interval(&mut self, dt: f64) {
        self.intervals.push_back(dt);
        if self.intervals.len() > self.window_size {
            self.intervals.pop_front();
        }
    }

    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }
        let idx = ((sorted.len() as f64 - 1.0) * p / 100.0).round() as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    /// Median frame interval in seconds (0 before two frames).
    pub fn interval_p50(&self) -> f64 {
        let mut sorted: Vec<f64> = self.intervals.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Self::percentile(&sorted, 50.0)
    }

    /// Frames per second from the median interval.
    pub fn fps(&self) -> f64 {
        let p50 = self.interval_p50();
        if p50 > 0.0 {
            1.0 / p50
        } else {
            0.0
        }
    }

    /// Forget the previous timestamp and intervals. Counters are kept.
    pub fn reset(&mut self) {
        self.last = None;
        self.intervals.clear();
    }

    pub fn stats_sexp(&self) -> String {
        format!(
            "(:fps {:.1} :interval-p50 {:.4} :frames {} :backwards {})",
            self.fps(),
            self.interval_p50(),
            self.total_frames,
            self.backwards_count,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_passes_through() {
        let mut c = FrameClock::new(10);
        assert_eq!(c.tick(3.5), 3.5);
        assert_eq!(c.now(), Some(3.5));
        assert_eq!(c.fps(), 0.0);
    }

    #[test]
    fn test_backwards_is_clamped() {
        let mut c = FrameClock::new(10);
        c.tick(1.0);
        assert_eq!(c.tick(0.5), 1.0);
        assert_eq!(c.backwards_count, 1);
        assert_eq!(c.tick(1.1), 1.1);
    }

    #[test]
    fn test_nan_is_clamped() {
        let mut c = FrameClock::new(10);
        c.tick(2.0);
        assert_eq!(c.tick(f64::NAN), 2.0);
        assert_eq!(c.backwards_count, 1);
    }

    #[test]
    fn test_fps_from_intervals() {
        let mut c = FrameClock::new(10);
        for i in 0..31 {
            c.tick(i as f64 / 30.0);
        }
        assert!((c.fps() - 30.0).abs() < 0.5);
        assert_eq!(c.total_frames, 31);
    }

    #[test]
    fn test_window_trim() {
        let mut c = FrameClock::new(4);
        for i in 0..20 {
            c.tick(i as f64 * 0.1);
        }
        assert_eq!(c.intervals.len(), 4);
    }

    #[test]
    fn test_stats_sexp() {
        let mut c = FrameClock::new(4);
        c.tick(0.0);
        c.tick(0.5);
        let s = c.stats_sexp();
        assert!(s.starts_with("(:fps 2.0"));
        assert!(s.contains(":backwards 0"));
    }
}
