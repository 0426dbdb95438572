//! Multi-hand identity tracking.

pub mod matcher;
pub mod primary;
pub mod track;

pub use matcher::{HandMatcher, MatchOutcome};
pub use primary::{select_primary, PrimarySelector};
pub use track::{Track, TrackSnapshot, TrackStore};

/// Association and lifetime thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingConfig {
    /// Maximum center distance (normalized) for a detection to match a track.
    pub position_threshold: f32,
    /// Seconds an unmatched track survives before eviction.
    pub disappear_timeout_s: f64,
    /// Weight of the previous center when smoothing (0 = raw detections).
    pub center_smoothing: f32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            position_threshold: 0.15,
            disappear_timeout_s: 0.5,
            center_smoothing: 0.3,
        }
    }
}
