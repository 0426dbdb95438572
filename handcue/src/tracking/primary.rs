//! Primary hand selection.
//!
//! The primary hand owns cursor control: the live track seen first, ties
//! broken by lowest id.  Recomputed every frame, so when the primary is
//! evicted the next-oldest survivor takes over.

use std::cmp::Ordering;

use tracing::info;

use super::track::Track;

/// Oldest live track, or `None` for an empty store.
pub fn select_primary(tracks: &[Track]) -> Option<u64> {
    tracks
        .iter()
        .min_by(|a, b| {
            a.first_seen
                .partial_cmp(&b.first_seen)
                .unwrap_or(Ordering::Equal)
                .then(a.id.cmp(&b.id))
        })
        .map(|t| t.id)
}

/// Remembers the previous primary so hand-offs can be reported.
#[derive(Debug, Default)]
pub struct PrimarySelector {
    current: Option<u64>,
    /// Number of primary changes, including gaining or losing one.
    pub handoffs: u64,
}

impl PrimarySelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<u64> {
        self.current
    }

    pub fn update(&mut self, tracks: &[Track]) -> Option<u64> {
        let next = select_primary(tracks);
        if next != self.current {
            match (self.current, next) {
                (Some(old), Some(new)) => info!("primary hand: {} -> {}", old, new),
                (None, Some(new)) => info!("primary hand: {}", new),
                (Some(old), None) => info!("primary hand {} lost", old),
                (None, None) => {}
            }
            self.handoffs += 1;
            self.current = next;
        }
        next
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}
