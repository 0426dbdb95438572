//! handcue - hand identity tracking and hold-to-trigger signals.
//!
//! Feed [`Engine::update`] one frame of hand (and optional face) landmarks
//! at a time.  Each frame yields a [`FrameSnapshot`] with stable track ids,
//! the primary hand for cursor control, per-signal state, and at most one
//! emote trigger.  Sinks in [`sink`] and [`cursor`] consume the snapshots.

pub mod clock;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod landmarks;
pub mod scenario;
pub mod sexp;
pub mod signal;
pub mod sink;
pub mod synth;
pub mod tracking;

pub use config::{EngineConfig, Preset};
pub use engine::{ControlMode, Engine, FrameInput, FrameSnapshot};
pub use landmarks::{FaceLandmarks, HandDetection, Handedness, Point3};
pub use signal::{SignalDef, TriggerEvent, TriggerPayload};
pub use sink::{dispatch, EventSink};
