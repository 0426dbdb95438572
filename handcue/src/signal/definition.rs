//! Signal definitions and the per-frame context they are evaluated in.

use std::collections::HashMap;
use std::fmt;

use crate::landmarks::{hand_center, FaceLandmarks, Handedness, Point2, Point3};

use super::hold::HoldConfig;
use super::window::WindowConfig;

// ── Pose context ───────────────────────────────────────────

/// One hand matched this frame, as seen by signal rules.
#[derive(Debug, Clone, Copy)]
pub struct HandView<'a> {
    pub track_id: u64,
    /// Raw (unsmoothed) center of this frame's landmarks.
    pub center: Point2,
    pub landmarks: &'a [Point3],
    pub handedness: Handedness,
    pub is_primary: bool,
}

/// Everything a signal rule may look at for one frame.
#[derive(Debug, Clone, Default)]
pub struct PoseContext<'a> {
    /// Hands matched this frame, primary first, then by creation order.
    pub hands: Vec<HandView<'a>>,
    pub face: Option<&'a FaceLandmarks>,
    /// Confidences supplied by an outside classifier, keyed by signal name.
    pub external: Option<&'a HashMap<String, f32>>,
}

impl<'a> PoseContext<'a> {
    pub fn primary(&self) -> Option<&HandView<'a>> {
        self.hands.iter().find(|h| h.is_primary)
    }

    /// Externally supplied confidence for `name`, if any.
    pub fn external_confidence(&self, name: &str) -> Option<f32> {
        self.external.and_then(|m| m.get(name)).copied()
    }
}

impl<'a> HandView<'a> {
    /// Build a view from raw landmarks. `None` if no center can be derived.
    pub fn new(
        track_id: u64,
        landmarks: &'a [Point3],
        handedness: Handedness,
        is_primary: bool,
    ) -> Option<Self> {
        let center = hand_center(landmarks)?;
        Some(Self {
            track_id,
            center,
            landmarks,
            handedness,
            is_primary,
        })
    }
}

// ── Definitions ────────────────────────────────────────────

pub type PoseRule = Box<dyn Fn(&PoseContext) -> f32 + Send>;
pub type FaceRule = Box<dyn Fn(&PoseContext, &FaceLandmarks) -> f32 + Send>;

/// How a signal derives its per-frame confidence.
pub enum Activation {
    /// From hand landmarks only.
    Pose(PoseRule),
    /// From hand and face landmarks. Inactive when no face is present.
    PoseFace(FaceRule),
    /// Read from the caller's per-frame confidences under the signal name.
    External,
}

impl Activation {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pose(_) => "pose",
            Self::PoseFace(_) => "pose-face",
            Self::External => "external",
        }
    }
}

impl fmt::Debug for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// One monitored signal: how to sample it, and how to debounce it.
#[derive(Debug)]
pub struct SignalDef {
    pub name: String,
    /// Human-readable label carried in trigger payloads.
    pub display: String,
    pub activation: Activation,
    pub window: WindowConfig,
    pub hold: HoldConfig,
}

impl SignalDef {
    fn with_activation(name: &str, display: &str, activation: Activation) -> Self {
        Self {
            name: name.to_string(),
            display: display.to_string(),
            activation,
            window: WindowConfig::default(),
            hold: HoldConfig::default(),
        }
    }

    pub fn pose<F>(name: &str, display: &str, rule: F) -> Self
    where
        F: Fn(&PoseContext) -> f32 + Send + 'static,
    {
        Self::with_activation(name, display, Activation::Pose(Box::new(rule)))
    }

    pub fn pose_face<F>(name: &str, display: &str, rule: F) -> Self
    where
        F: Fn(&PoseContext, &FaceLandmarks) -> f32 + Send + 'static,
    {
        Self::with_activation(name, display, Activation::PoseFace(Box::new(rule)))
    }

    pub fn external(name: &str, display: &str) -> Self {
        Self::with_activation(name, display, Activation::External)
    }

    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    pub fn with_hold(mut self, hold: HoldConfig) -> Self {
        self.hold = hold;
        self
    }

    /// This frame's confidence in [0, 1].
    ///
    /// A caller-supplied confidence under the signal's name is combined with
    /// the rule output by taking the larger of the two.
    pub fn evaluate(&self, ctx: &PoseContext) -> f32 {
        let rule = match &self.activation {
            Activation::Pose(rule) => rule(ctx),
            Activation::PoseFace(rule) => match ctx.face {
                Some(face) => rule(ctx, face),
                None => 0.0,
            },
            Activation::External => 0.0,
        };
        let external = ctx.external_confidence(&self.name).unwrap_or(0.0);
        sanitize(rule).max(sanitize(external))
    }
}

fn sanitize(c: f32) -> f32 {
    if c.is_finite() {
        c.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
