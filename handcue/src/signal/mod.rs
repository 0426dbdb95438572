//! Temporal signal engine.
//!
//! Every monitored signal is a [`SignalDef`] sampled once per frame into its
//! own [`SignalWindow`], whose debounced result drives its own
//! [`HoldTrigger`].  Emote signals are arbitrated so at most one fires per
//! frame; the open/closed gesture is tracked as a pair of edges.

pub mod arbiter;
pub mod definition;
pub mod gesture;
pub mod hold;
pub mod rules;
pub mod window;

pub use arbiter::EmoteArbiter;
pub use definition::{Activation, HandView, PoseContext, SignalDef};
pub use gesture::GestureTracker;
pub use hold::{HoldConfig, HoldPhase, HoldTrigger};
pub use window::{SignalWindow, WindowConfig};

use crate::sexp::{bool_sexp, format_event, quote};

// ── Signal runtime state ───────────────────────────────────

/// A definition together with its window and hold machine.
#[derive(Debug)]
pub struct SignalState {
    pub def: SignalDef,
    pub window: SignalWindow,
    pub hold: HoldTrigger,
    /// Confidence sampled on the most recent frame.
    pub last_confidence: f32,
}

impl SignalState {
    pub fn new(def: SignalDef) -> Self {
        let window = SignalWindow::new(def.window);
        let hold = HoldTrigger::new(def.hold);
        Self {
            def,
            window,
            hold,
            last_confidence: 0.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Evaluate the definition and push the sample.  Returns the window's
    /// debounced state.
    pub fn sample(&mut self, ctx: &PoseContext) -> bool {
        self.last_confidence = self.def.evaluate(ctx);
        self.window.push(self.last_confidence);
        self.window.is_active()
    }

    pub fn status(&self, now: f64) -> SignalStatus {
        SignalStatus {
            name: self.def.name.clone(),
            confidence: self.last_confidence,
            active: self.window.is_active(),
            ratio: self.window.consistency_ratio(),
            phase: self.hold.phase(),
            progress: self.hold.progress(now),
            cooldown_s: self.hold.cooldown_remaining(now),
        }
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.hold.reset();
        self.last_confidence = 0.0;
    }
}

/// Per-signal state reported in each frame snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalStatus {
    pub name: String,
    pub confidence: f32,
    pub active: bool,
    pub ratio: f32,
    pub phase: HoldPhase,
    /// Hold progress in [0, 1], for display only.
    pub progress: f32,
    /// Seconds until the signal may fire again.
    pub cooldown_s: f64,
}

impl SignalStatus {
    pub fn to_sexp(&self) -> String {
        format!(
            "(:name {} :active {} :ratio {:.2} :confidence {:.2} :phase :{} :progress {:.2} :cooldown {:.2})",
            quote(&self.name),
            bool_sexp(self.active),
            self.ratio,
            self.confidence,
            self.phase.as_str(),
            self.progress,
            self.cooldown_s,
        )
    }
}

// ── Trigger events ─────────────────────────────────────────

/// Direction of a gesture edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureTransition {
    /// Hand went from open to closed.
    Closed,
    /// Hand went from closed to open.
    Opened,
}

impl GestureTransition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Opened => "opened",
        }
    }
}

/// Signal-specific event data.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerPayload {
    Emote {
        display: String,
    },
    Gesture {
        transition: GestureTransition,
        /// Seconds the hand had been closed; 0 on the closing edge.
        closed_for_s: f64,
    },
}

/// One fired signal.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerEvent {
    pub signal: String,
    pub payload: TriggerPayload,
    pub timestamp_s: f64,
}

impl TriggerEvent {
    pub fn emote(signal: &str, display: &str, timestamp_s: f64) -> Self {
        Self {
            signal: signal.to_string(),
            payload: TriggerPayload::Emote {
                display: display.to_string(),
            },
            timestamp_s,
        }
    }

    pub fn gesture(
        signal: &str,
        transition: GestureTransition,
        closed_for_s: f64,
        timestamp_s: f64,
    ) -> Self {
        Self {
            signal: signal.to_string(),
            payload: TriggerPayload::Gesture {
                transition,
                closed_for_s,
            },
            timestamp_s,
        }
    }

    pub fn is_emote(&self) -> bool {
        matches!(self.payload, TriggerPayload::Emote { .. })
    }

    pub fn to_sexp(&self) -> String {
        let name = quote(&self.signal);
        let t = format!("{:.3}", self.timestamp_s);
        match &self.payload {
            TriggerPayload::Emote { display } => {
                let display = quote(display);
                format_event(
                    "emote",
                    &[("name", &name), ("display", &display), ("t", &t)],
                )
            }
            TriggerPayload::Gesture {
                transition,
                closed_for_s,
            } => {
                let transition = format!(":{}", transition.as_str());
                let closed_for = format!("{:.3}", closed_for_s);
                format_event(
                    "gesture",
                    &[
                        ("name", &name),
                        ("transition", &transition),
                        ("closed-for", &closed_for),
                        ("t", &t),
                    ],
                )
            }
        }
    }
}
