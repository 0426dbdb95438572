//! Persistent hand identities and the store that owns them.

use tracing::info;

use crate::landmarks::{Handedness, Point2, Point3};

/// One persistent hand identity.
#[derive(Debug, Clone)]
pub struct Track {
    /// Unique for the session, never reused.
    pub id: u64,
    /// Exponentially smoothed normalized center.
    pub center: Point2,
    /// Creation time (seconds). Immutable.
    pub first_seen: f64,
    /// Time of the most recent successful match (seconds).
    pub last_seen: f64,
    /// Latest raw landmark set, passed through from the detector.
    pub landmarks: Vec<Point3>,
    /// Latest handedness label.
    pub handedness: Handedness,
    /// Time the track first went unmatched, or None if matched this frame.
    pub missing_since: Option<f64>,
    /// Number of frames this track has been matched (including creation).
    pub hits: u64,
}

impl Track {
    fn new(
        id: u64,
        center: Point2,
        landmarks: Vec<Point3>,
        handedness: Handedness,
        now_s: f64,
    ) -> Self {
        Self {
            id,
            center,
            first_seen: now_s,
            last_seen: now_s,
            landmarks,
            handedness,
            missing_since: None,
            hits: 1,
        }
    }

    /// Whether the track was matched in the most recent frame.
    pub fn is_matched(&self) -> bool {
        self.missing_since.is_none()
    }

    /// Apply a matched detection.  `smoothing` is the weight kept from the
    /// previous center (0.0 = follow raw detections exactly).
    pub fn apply_match(
        &mut self,
        raw_center: Point2,
        landmarks: Vec<Point3>,
        handedness: Handedness,
        now_s: f64,
        smoothing: f32,
    ) {
        let t = 1.0 - smoothing.clamp(0.0, 1.0);
        self.center = [
            lerp(self.center[0], raw_center[0], t),
            lerp(self.center[1], raw_center[1], t),
        ];
        self.landmarks = landmarks;
        self.handedness = handedness;
        // Clock regressions never move last_seen before first_seen.
        self.last_seen = now_s.max(self.last_seen);
        self.missing_since = None;
        self.hits += 1;
    }

    /// Mark the track as unmatched this frame, keeping the first miss time.
    pub fn mark_missing(&mut self, now_s: f64) {
        if self.missing_since.is_none() {
            self.missing_since = Some(now_s);
        }
    }

    /// Seconds since the last match, clamped at zero.
    pub fn time_since_seen(&self, now_s: f64) -> f64 {
        (now_s - self.last_seen).max(0.0)
    }
}

/// Point-in-time view of one track for frame output.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSnapshot {
    pub id: u64,
    pub center: Point2,
    pub first_seen: f64,
    pub last_seen: f64,
    pub handedness: Handedness,
    pub matched: bool,
    pub is_primary: bool,
}

impl TrackSnapshot {
    pub fn to_sexp(&self) -> String {
        format!(
            "(:id {} :x {:.3} :y {:.3} :first-seen {:.3} :last-seen {:.3} :hand :{} :matched {} :primary {})",
            self.id,
            self.center[0],
            self.center[1],
            self.first_seen,
            self.last_seen,
            self.handedness.as_str(),
            if self.matched { "t" } else { "nil" },
            if self.is_primary { "t" } else { "nil" },
        )
    }
}

/// Set of currently known hand identities, ordered by id.
#[derive(Debug)]
pub struct TrackStore {
    tracks: Vec<Track>,
    next_id: u64,
    /// Total tracks evicted this session.
    pub evicted_total: u64,
}

impl Default for TrackStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackStore {
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            evicted_total: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn get(&self, id: u64) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub(crate) fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.tracks
    }

    /// Create a new track with a freshly allocated id.
    pub fn spawn(
        &mut self,
        center: Point2,
        landmarks: Vec<Point3>,
        handedness: Handedness,
        now_s: f64,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        info!(
            track = id,
            "hand track spawned at ({:.3}, {:.3}) [{}]",
            center[0],
            center[1],
            handedness.as_str()
        );
        // Ids are monotonic, so pushing keeps the store ordered by id.
        self.tracks
            .push(Track::new(id, center, landmarks, handedness, now_s));
        id
    }

    /// Drop unmatched tracks not seen for longer than `timeout_s`.
    /// Returns the evicted ids.
    pub fn evict_stale(&mut self, now_s: f64, timeout_s: f64) -> Vec<u64> {
        let mut evicted = Vec::new();
        self.tracks.retain(|t| {
            let stale = !t.is_matched() && t.time_since_seen(now_s) > timeout_s;
            if stale {
                info!(
                    track = t.id,
                    "hand track evicted after {:.3}s unseen",
                    t.time_since_seen(now_s)
                );
                evicted.push(t.id);
            }
            !stale
        });
        self.evicted_total += evicted.len() as u64;
        evicted
    }

    /// Remove every track. Id allocation keeps counting.
    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    /// Snapshot every track, flagging `primary` if given.
    pub fn snapshot(&self, primary: Option<u64>) -> Vec<TrackSnapshot> {
        self.tracks
            .iter()
            .map(|t| TrackSnapshot {
                id: t.id,
                center: t.center,
                first_seen: t.first_seen,
                last_seen: t.last_seen,
                handedness: t.handedness,
                matched: t.is_matched(),
                is_primary: Some(t.id) == primary,
            })
            .collect()
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_at(store: &mut TrackStore, x: f32, y: f32, now: f64) -> u64 {
        store.spawn([x, y], Vec::new(), Handedness::Right, now)
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut store = TrackStore::new();
        let a = spawn_at(&mut store, 0.1, 0.1, 0.0);
        let b = spawn_at(&mut store, 0.9, 0.9, 0.0);
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_ids_not_reused_after_clear() {
        let mut store = TrackStore::new();
        spawn_at(&mut store, 0.1, 0.1, 0.0);
        store.clear();
        assert!(store.is_empty());
        let id = spawn_at(&mut store, 0.1, 0.1, 1.0);
        assert_eq!(id, 2);
    }

    #[test]
    fn test_smoothing_blends_center() {
        let mut store = TrackStore::new();
        let id = spawn_at(&mut store, 0.0, 0.0, 0.0);
        let t = &mut store.tracks_mut()[0];
        t.apply_match([1.0, 1.0], Vec::new(), Handedness::Right, 0.1, 0.5);
        assert!((t.center[0] - 0.5).abs() < 1e-6);
        assert_eq!(t.hits, 2);
        assert_eq!(store.get(id).unwrap().last_seen, 0.1);
    }

    #[test]
    fn test_zero_smoothing_follows_raw() {
        let mut store = TrackStore::new();
        spawn_at(&mut store, 0.0, 0.0, 0.0);
        let t = &mut store.tracks_mut()[0];
        t.apply_match([0.4, 0.2], Vec::new(), Handedness::Right, 0.1, 0.0);
        assert!((t.center[0] - 0.4).abs() < 1e-6);
        assert!((t.center[1] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_missing_since_keeps_first_miss() {
        let mut store = TrackStore::new();
        spawn_at(&mut store, 0.5, 0.5, 0.0);
        let t = &mut store.tracks_mut()[0];
        t.mark_missing(0.1);
        t.mark_missing(0.2);
        assert_eq!(t.missing_since, Some(0.1));
        t.apply_match([0.5, 0.5], Vec::new(), Handedness::Right, 0.3, 0.3);
        assert!(t.is_matched());
    }

    #[test]
    fn test_evict_only_unmatched_and_stale() {
        let mut store = TrackStore::new();
        spawn_at(&mut store, 0.2, 0.2, 0.0);
        spawn_at(&mut store, 0.8, 0.8, 0.0);
        store.tracks_mut()[0].mark_missing(0.1);
        assert!(store.evict_stale(0.4, 0.5).is_empty());
        let evicted = store.evict_stale(0.6, 0.5);
        assert_eq!(evicted, vec![1]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.evicted_total, 1);
    }

    #[test]
    fn test_last_seen_never_before_first_seen() {
        let mut store = TrackStore::new();
        spawn_at(&mut store, 0.5, 0.5, 5.0);
        let t = &mut store.tracks_mut()[0];
        t.apply_match([0.5, 0.5], Vec::new(), Handedness::Right, 4.0, 0.3);
        assert!(t.first_seen <= t.last_seen);
    }

    #[test]
    fn test_snapshot_flags_primary() {
        let mut store = TrackStore::new();
        spawn_at(&mut store, 0.2, 0.2, 0.0);
        spawn_at(&mut store, 0.8, 0.8, 0.0);
        let snap = store.snapshot(Some(2));
        assert!(!snap[0].is_primary);
        assert!(snap[1].is_primary);
        assert!(snap[1].to_sexp().contains(":primary t"));
    }
}
