//! Hold-to-trigger state machine.
//!
//! Converts a debounced boolean into a single edge-triggered fire after the
//! signal has been held for `hold_time_s`, then ignores the signal for
//! `cooldown_s`.  With `hold_time_s = 0` it degenerates into an edge
//! detector, which is how the open/closed gesture is driven.

use tracing::debug;

/// Slack for comparing elapsed time against hold/cooldown durations, so that
/// frame timestamps like `i / 30.0` fire on the intended frame.
const TIME_EPSILON: f64 = 1e-9;

/// Hold and cooldown durations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldConfig {
    /// Seconds the signal must stay active before firing.
    pub hold_time_s: f64,
    /// Seconds after firing during which the signal is ignored.
    pub cooldown_s: f64,
    /// Stay in cooldown until the signal is released, even after
    /// `cooldown_s` has elapsed.
    pub rearm_on_release: bool,
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            hold_time_s: 1.5,
            cooldown_s: 2.0,
            rearm_on_release: false,
        }
    }
}

impl HoldConfig {
    /// Edge-detector settings for the open/closed gesture.
    pub fn gesture() -> Self {
        Self {
            hold_time_s: 0.0,
            cooldown_s: 0.0,
            rearm_on_release: true,
        }
    }
}

/// Phase of a hold-trigger machine.  Timestamps exist only in the phase
/// that uses them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoldPhase {
    Idle,
    Holding { started_at: f64 },
    Cooldown { until: f64 },
}

impl HoldPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Holding { .. } => "holding",
            Self::Cooldown { .. } => "cooldown",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_holding(&self) -> bool {
        matches!(self, Self::Holding { .. })
    }

    pub fn is_cooldown(&self) -> bool {
        matches!(self, Self::Cooldown { .. })
    }
}

/// One hold-trigger machine.
#[derive(Debug, Clone)]
pub struct HoldTrigger {
    phase: HoldPhase,
    config: HoldConfig,
    /// Total fires since creation.
    pub fire_count: u64,
}

impl HoldTrigger {
    pub fn new(config: HoldConfig) -> Self {
        Self {
            phase: HoldPhase::Idle,
            config,
            fire_count: 0,
        }
    }

    pub fn phase(&self) -> HoldPhase {
        self.phase
    }

    pub fn config(&self) -> &HoldConfig {
        &self.config
    }

    fn hold_reached(&self, started_at: f64, now: f64) -> bool {
        (now - started_at).max(0.0) + TIME_EPSILON >= self.config.hold_time_s
    }

    /// Whether `update(active, now)` would fire.  Does not change state.
    pub fn ready(&self, active: bool, now: f64) -> bool {
        if !active {
            return false;
        }
        match self.phase {
            // A zero hold fires on the frame the signal goes active.
            HoldPhase::Idle => self.hold_reached(now, now),
            HoldPhase::Holding { started_at } => self.hold_reached(started_at, now),
            HoldPhase::Cooldown { .. } => false,
        }
    }

    /// Advance one frame.  Returns true exactly when the machine fires.
    pub fn update(&mut self, active: bool, now: f64) -> bool {
        // Cooldown expiry lands in IDLE this frame; an active signal is only
        // picked up from IDLE on the following frame.
        if let HoldPhase::Cooldown { until } = self.phase {
            let expired = now + TIME_EPSILON >= until;
            let released = !self.config.rearm_on_release || !active;
            if expired && released {
                self.phase = HoldPhase::Idle;
            }
            return false;
        }

        match self.phase {
            HoldPhase::Idle if active => {
                self.phase = HoldPhase::Holding { started_at: now };
                debug!("hold started at {:.3}s", now);
                if self.hold_reached(now, now) {
                    return self.fire(now);
                }
                false
            }
            HoldPhase::Idle => false,
            HoldPhase::Holding { started_at } if active => {
                if self.hold_reached(started_at, now) {
                    self.fire(now)
                } else {
                    false
                }
            }
            HoldPhase::Holding { started_at } => {
                debug!(
                    "hold broken after {:.3}s",
                    (now - started_at).max(0.0)
                );
                self.phase = HoldPhase::Idle;
                false
            }
            HoldPhase::Cooldown { .. } => false,
        }
    }

    fn fire(&mut self, now: f64) -> bool {
        self.phase = HoldPhase::Cooldown {
            until: now + self.config.cooldown_s,
        };
        self.fire_count += 1;
        true
    }

    /// Drop back to IDLE, losing hold progress.  Used by arbitration.
    pub fn force_idle(&mut self) {
        self.phase = HoldPhase::Idle;
    }

    /// Hold progress in [0, 1]; 0 outside HOLDING.
    pub fn progress(&self, now: f64) -> f32 {
        match self.phase {
            HoldPhase::Holding { started_at } => {
                if self.config.hold_time_s <= 0.0 {
                    return 1.0;
                }
                let elapsed = (now - started_at).max(0.0);
                (elapsed / self.config.hold_time_s).clamp(0.0, 1.0) as f32
            }
            _ => 0.0,
        }
    }

    /// Seconds spent holding so far (0 outside HOLDING).
    pub fn held_for(&self, now: f64) -> f64 {
        match self.phase {
            HoldPhase::Holding { started_at } => (now - started_at).max(0.0),
            _ => 0.0,
        }
    }

    /// Seconds of cooldown left (0 outside COOLDOWN).
    pub fn cooldown_remaining(&self, now: f64) -> f64 {
        match self.phase {
            HoldPhase::Cooldown { until } => (until - now).max(0.0),
            _ => 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.phase = HoldPhase::Idle;
    }
}
