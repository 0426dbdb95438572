//! Frame-to-frame hand association.
//!
//! Greedy nearest-first assignment of this frame's detections to existing
//! tracks, spawning tracks for leftovers and evicting tracks that have been
//! gone too long.

use std::cmp::Ordering;

use tracing::{debug, warn};

use super::track::TrackStore;
use super::TrackingConfig;
use crate::landmarks::{distance, HandDetection, Point2};

/// Result of associating one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    /// (detection index, track id) for every accepted match.
    pub matched: Vec<(usize, u64)>,
    /// (detection index, new track id) for every spawned track.
    pub spawned: Vec<(usize, u64)>,
    pub evicted: Vec<u64>,
    /// Detections ignored because no center could be derived.
    pub malformed: usize,
}

impl MatchOutcome {
    /// Track id assigned to detection `index` this frame, if any.
    pub fn track_for(&self, index: usize) -> Option<u64> {
        self.matched
            .iter()
            .chain(self.spawned.iter())
            .find(|(d, _)| *d == index)
            .map(|(_, id)| *id)
    }
}

#[derive(Debug, Clone)]
pub struct HandMatcher {
    pub config: TrackingConfig,
}

impl HandMatcher {
    pub fn new(config: TrackingConfig) -> Self {
        Self { config }
    }

    /// Associate `detections` with the tracks in `store` at time `now`.
    pub fn update(
        &self,
        store: &mut TrackStore,
        detections: &[HandDetection],
        now: f64,
    ) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();

        let centers: Vec<Option<Point2>> = detections
            .iter()
            .enumerate()
            .map(|(i, det)| {
                let c = det.center();
                if c.is_none() {
                    warn!(
                        "detection {} ignored: cannot derive center from {} landmarks",
                        i,
                        det.landmarks.len()
                    );
                }
                c
            })
            .collect();
        outcome.malformed = centers.iter().filter(|c| c.is_none()).count();

        // Candidate pairs under the threshold, nearest first; ties go to the
        // lower track id, then the lower detection index.
        let mut pairs: Vec<(f32, u64, usize)> = Vec::new();
        for track in store.tracks() {
            for (di, c) in centers.iter().enumerate() {
                let Some(c) = c else { continue };
                let d = distance(track.center, *c);
                if d < self.config.position_threshold {
                    pairs.push((d, track.id, di));
                }
            }
        }
        pairs.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });

        let mut det_used = vec![false; detections.len()];
        let mut track_used: Vec<u64> = Vec::new();
        for (d, track_id, di) in pairs {
            if det_used[di] || track_used.contains(&track_id) {
                continue;
            }
            det_used[di] = true;
            track_used.push(track_id);
            debug!(track = track_id, "matched detection {} at distance {:.4}", di, d);
            outcome.matched.push((di, track_id));
        }

        let smoothing = self.config.center_smoothing;
        for track in store.tracks_mut() {
            match outcome.matched.iter().find(|(_, id)| *id == track.id) {
                Some(&(di, _)) => {
                    let det = &detections[di];
                    if let Some(c) = centers[di] {
                        track.apply_match(c, det.landmarks.clone(), det.handedness, now, smoothing);
                    }
                }
                None => track.mark_missing(now),
            }
        }

        outcome.evicted = store.evict_stale(now, self.config.disappear_timeout_s);

        for (di, c) in centers.iter().enumerate() {
            if det_used[di] {
                continue;
            }
            if let Some(c) = c {
                let det = &detections[di];
                let id = store.spawn(*c, det.landmarks.clone(), det.handedness, now);
                outcome.spawned.push((di, id));
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{Handedness, Point3};
    use crate::synth::{self, HandPose};

    fn test_hand(x: f32, y: f32) -> HandDetection {
        synth::hand([x, y], HandPose::Open, Handedness::Right)
    }

    fn matcher() -> HandMatcher {
        HandMatcher::new(TrackingConfig::default())
    }

    #[test]
    fn test_two_distant_detections_spawn_two_tracks() {
        let mut store = TrackStore::new();
        let out = matcher().update(&mut store, &[test_hand(0.2, 0.2), test_hand(0.8, 0.8)], 0.0);
        assert_eq!(store.len(), 2);
        assert_eq!(out.spawned, vec![(0, 1), (1, 2)]);
        assert!(out.matched.is_empty());
    }

    #[test]
    fn test_identity_stable_under_small_motion() {
        let mut store = TrackStore::new();
        let m = matcher();
        m.update(&mut store, &[test_hand(0.5, 0.5)], 0.0);
        for i in 1..30 {
            let x = 0.5 + 0.01 * (i % 3) as f32;
            let out = m.update(&mut store, &[test_hand(x, 0.5)], i as f64 / 30.0);
            assert_eq!(out.track_for(0), Some(1));
        }
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_far_jump_spawns_new_track() {
        let mut store = TrackStore::new();
        let m = matcher();
        m.update(&mut store, &[test_hand(0.2, 0.5)], 0.0);
        let out = m.update(&mut store, &[test_hand(0.7, 0.5)], 0.033);
        assert_eq!(out.spawned, vec![(0, 2)]);
        assert!(!store.get(1).unwrap().is_matched());
    }

    #[test]
    fn test_eviction_after_timeout() {
        let mut store = TrackStore::new();
        let m = matcher();
        m.update(&mut store, &[test_hand(0.5, 0.5)], 0.0);
        assert!(m.update(&mut store, &[], 0.4).evicted.is_empty());
        assert_eq!(store.len(), 1);
        assert!(m.update(&mut store, &[], 0.5).evicted.is_empty());
        let out = m.update(&mut store, &[], 0.51);
        assert_eq!(out.evicted, vec![1]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_reappearing_within_timeout_keeps_id() {
        let mut store = TrackStore::new();
        let m = matcher();
        m.update(&mut store, &[test_hand(0.5, 0.5)], 0.0);
        m.update(&mut store, &[], 0.2);
        let out = m.update(&mut store, &[test_hand(0.52, 0.5)], 0.4);
        assert_eq!(out.track_for(0), Some(1));
        assert!(store.get(1).unwrap().is_matched());
    }

    #[test]
    fn test_nearest_pair_wins() {
        let mut store = TrackStore::new();
        let m = matcher();
        m.update(&mut store, &[test_hand(0.45, 0.5), test_hand(0.55, 0.5)], 0.0);
        // Both detections are within range of both tracks; each should keep
        // its nearest identity regardless of order.
        let out = m.update(&mut store, &[test_hand(0.54, 0.5), test_hand(0.46, 0.5)], 0.033);
        assert_eq!(out.track_for(0), Some(2));
        assert_eq!(out.track_for(1), Some(1));
    }

    #[test]
    fn test_equal_distance_prefers_lower_track_id() {
        let mut store = TrackStore::new();
        let m = matcher();
        m.update(&mut store, &[test_hand(0.375, 0.5), test_hand(0.625, 0.5)], 0.0);
        let out = m.update(&mut store, &[test_hand(0.5, 0.5)], 0.033);
        assert_eq!(out.track_for(0), Some(1));
        assert!(!store.get(2).unwrap().is_matched());
    }

    #[test]
    fn test_surplus_tracks_left_unmatched() {
        let mut store = TrackStore::new();
        let m = matcher();
        m.update(&mut store, &[test_hand(0.2, 0.5), test_hand(0.8, 0.5)], 0.0);
        let out = m.update(&mut store, &[test_hand(0.2, 0.5)], 0.033);
        assert_eq!(out.matched, vec![(0, 1)]);
        assert_eq!(store.get(2).unwrap().missing_since, Some(0.033));
    }

    #[test]
    fn test_malformed_detection_is_absent() {
        let mut store = TrackStore::new();
        let bad = HandDetection::new(vec![Point3::default(); 5], Handedness::Left, 0.9);
        let out = matcher().update(&mut store, &[bad, test_hand(0.5, 0.5)], 0.0);
        assert_eq!(out.malformed, 1);
        assert_eq!(out.spawned, vec![(1, 1)]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_center_is_smoothed() {
        let mut store = TrackStore::new();
        let m = matcher();
        m.update(&mut store, &[test_hand(0.50, 0.5)], 0.0);
        m.update(&mut store, &[test_hand(0.60, 0.5)], 0.033);
        let c = store.get(1).unwrap().center;
        // 30% of the old center is kept.
        assert!((c[0] - 0.57).abs() < 1e-4);
    }
}
