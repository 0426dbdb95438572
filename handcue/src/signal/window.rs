//! Sliding-window consistency buffer.
//!
//! Each monitored signal pushes one confidence sample per frame.  The window
//! keeps the last N samples and reports the fraction that exceed the
//! activation threshold; the signal is considered "currently true" once that
//! fraction reaches the consistency threshold.

use std::collections::VecDeque;

/// Largest window a signal may keep.
pub const MAX_WINDOW_SIZE: usize = 1024;

/// Window sizing and thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowConfig {
    /// Number of samples kept (N).
    pub size: usize,
    /// A sample counts as positive when its confidence exceeds this.
    pub activation_threshold: f32,
    /// Minimum positive fraction for the signal to be active.
    pub consistency_threshold: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            size: 5,
            activation_threshold: 0.6,
            consistency_threshold: 0.6,
        }
    }
}

impl WindowConfig {
    /// Defaults for the binary open/closed gesture.
    pub fn gesture() -> Self {
        Self {
            activation_threshold: 0.5,
            ..Self::default()
        }
    }
}

/// Fixed-capacity ring of recent confidence samples.
#[derive(Debug, Clone)]
pub struct SignalWindow {
    samples: VecDeque<f32>,
    positives: usize,
    ratio: f32,
    config: WindowConfig,
}

impl SignalWindow {
    pub fn new(config: WindowConfig) -> Self {
        let config = WindowConfig {
            size: config.size.clamp(1, MAX_WINDOW_SIZE),
            ..config
        };
        Self {
            samples: VecDeque::with_capacity(config.size),
            positives: 0,
            ratio: 0.0,
            config,
        }
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Append a confidence sample, evicting the oldest at capacity.
    /// Non-finite samples count as zero.
    pub fn push(&mut self, confidence: f32) {
        let sample = if confidence.is_finite() { confidence } else { 0.0 };
        if self.samples.len() == self.config.size {
            if let Some(old) = self.samples.pop_front() {
                if self.is_positive(old) {
                    self.positives -= 1;
                }
            }
        }
        if self.is_positive(sample) {
            self.positives += 1;
        }
        self.samples.push_back(sample);
        self.ratio = self.positives as f32 / self.samples.len() as f32;
    }

    /// Convenience for boolean samples.
    pub fn push_bool(&mut self, value: bool) {
        self.push(if value { 1.0 } else { 0.0 });
    }

    fn is_positive(&self, sample: f32) -> bool {
        sample > self.config.activation_threshold
    }

    /// Fraction of buffered samples above the activation threshold.
    /// 0 when empty.
    pub fn consistency_ratio(&self) -> f32 {
        self.ratio
    }

    /// Whether the signal is currently considered true.
    pub fn is_active(&self) -> bool {
        !self.samples.is_empty() && self.ratio + 1e-6 >= self.config.consistency_threshold
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.positives = 0;
        self.ratio = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_from(samples: &[bool]) -> SignalWindow {
        let mut w = SignalWindow::new(WindowConfig::default());
        for &s in samples {
            w.push_bool(s);
        }
        w
    }

    #[test]
    fn test_empty_window_ratio_zero() {
        let w = SignalWindow::new(WindowConfig::default());
        assert_eq!(w.consistency_ratio(), 0.0);
        assert!(!w.is_active());
    }

    #[test]
    fn test_three_of_five_is_active() {
        let w = window_from(&[true, true, false, true, false]);
        assert!((w.consistency_ratio() - 0.6).abs() < 1e-6);
        assert!(w.is_active());
    }

    #[test]
    fn test_two_of_five_is_inactive() {
        let w = window_from(&[true, false, true, false, false]);
        assert!((w.consistency_ratio() - 0.4).abs() < 1e-6);
        assert!(!w.is_active());
    }

    #[test]
    fn test_oldest_sample_evicted() {
        let mut w = window_from(&[true, true, true, true, true]);
        assert_eq!(w.len(), 5);
        for _ in 0..3 {
            w.push_bool(false);
        }
        assert_eq!(w.len(), 5);
        assert!((w.consistency_ratio() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_partial_window_ratio() {
        let w = window_from(&[true, false]);
        assert!((w.consistency_ratio() - 0.5).abs() < 1e-6);
        assert!(!w.is_active());
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut w = SignalWindow::new(WindowConfig {
            size: 1,
            activation_threshold: 0.6,
            consistency_threshold: 0.6,
        });
        w.push(0.6);
        assert!(!w.is_active());
        w.push(0.61);
        assert!(w.is_active());
    }

    #[test]
    fn test_nan_counts_as_zero() {
        let mut w = SignalWindow::new(WindowConfig::default());
        w.push(f32::NAN);
        assert_eq!(w.len(), 1);
        assert_eq!(w.consistency_ratio(), 0.0);
    }

    #[test]
    fn test_clear() {
        let mut w = window_from(&[true, true, true]);
        w.clear();
        assert!(w.is_empty());
        assert_eq!(w.consistency_ratio(), 0.0);
    }

    #[test]
    fn test_size_clamped() {
        let huge = SignalWindow::new(WindowConfig {
            size: 100_000_000_000,
            ..WindowConfig::default()
        });
        assert_eq!(huge.config().size, MAX_WINDOW_SIZE);
        let zero = SignalWindow::new(WindowConfig {
            size: 0,
            ..WindowConfig::default()
        });
        assert_eq!(zero.config().size, 1);
    }
}
