//! Open/closed gesture edges.
//!
//! The gesture signal runs through the same window and hold machine as the
//! emotes, configured as an edge detector: firing is the closing edge, and
//! the machine re-arming after release is the opening edge.

use tracing::debug;

use super::definition::{PoseContext, SignalDef};
use super::{GestureTransition, SignalState, SignalStatus, TriggerEvent};

#[derive(Debug)]
pub struct GestureTracker {
    signal: SignalState,
    /// Time of the last closing edge while the hand is still closed.
    closed_since: Option<f64>,
}

impl GestureTracker {
    pub fn new(def: SignalDef) -> Self {
        Self {
            signal: SignalState::new(def),
            closed_since: None,
        }
    }

    pub fn signal(&self) -> &SignalState {
        &self.signal
    }

    pub fn is_closed(&self) -> bool {
        self.closed_since.is_some()
    }

    /// Seconds the hand has been closed, 0 when open.
    pub fn closed_for(&self, now: f64) -> f64 {
        self.closed_since.map_or(0.0, |t| (now - t).max(0.0))
    }

    /// Sample the gesture and return this frame's edge, if any.
    pub fn update(&mut self, ctx: &PoseContext, now: f64) -> Option<TriggerEvent> {
        let active = self.signal.sample(ctx);
        let fired = self.signal.hold.update(active, now);
        let name = self.signal.def.name.as_str();

        if fired {
            debug!("gesture {} closed at {:.3}s", name, now);
            self.closed_since = Some(now);
            return Some(TriggerEvent::gesture(
                name,
                GestureTransition::Closed,
                0.0,
                now,
            ));
        }

        if self.closed_since.is_some() && self.signal.hold.phase().is_idle() {
            let held = self.closed_for(now);
            self.closed_since = None;
            debug!("gesture {} opened after {:.3}s", name, held);
            return Some(TriggerEvent::gesture(
                name,
                GestureTransition::Opened,
                held,
                now,
            ));
        }
        None
    }

    /// Drop back to the open state without emitting an edge.
    pub fn release(&mut self) {
        self.signal.reset();
        self.closed_since = None;
    }

    pub fn status(&self, now: f64) -> SignalStatus {
        self.signal.status(now)
    }

    pub fn reset(&mut self) {
        self.release();
    }
}
