//! Built-in pose rules and the default signal set.

use crate::landmarks::{distance, FaceLandmarks, HandLandmark, Point3, HAND_LANDMARK_COUNT};

use super::definition::{HandView, PoseContext, SignalDef};
use super::hold::HoldConfig;
use super::window::WindowConfig;

pub const GOBLIN_CRYING: &str = "goblin_crying";
pub const WIZARD_67: &str = "wizard_67";
pub const PRINCESS_YAWNING: &str = "princess_yawning";
pub const GESTURE_CLOSED: &str = "gesture=closed";

/// Fingertip/PIP tolerance in normalized units.
const CURL_TOLERANCE: f32 = 0.02;

/// Radius around the mouth, in face sizes, that counts as "near".
const MOUTH_RADIUS_FACES: f32 = 0.6;

// ── Hand shape predicates ──────────────────────────────────

/// Fist: at least 3 of the 4 non-thumb fingertips curled at or below their PIP.
pub fn is_hand_closed(landmarks: &[Point3]) -> bool {
    if landmarks.len() < HAND_LANDMARK_COUNT {
        return false;
    }
    let curled = HandLandmark::finger_tip_pip_pairs()
        .iter()
        .filter(|(tip, pip)| {
            landmarks[tip.index()].y > landmarks[pip.index()].y - CURL_TOLERANCE
        })
        .count();
    curled >= 3
}

/// Open palm facing up: at least 3 fingers extended and the wrist not far
/// above the middle fingertip.
pub fn is_open_palm_up(landmarks: &[Point3]) -> bool {
    if landmarks.len() < HAND_LANDMARK_COUNT {
        return false;
    }
    let extended = HandLandmark::finger_tip_pip_pairs()
        .iter()
        .filter(|(tip, pip)| {
            landmarks[tip.index()].y < landmarks[pip.index()].y + CURL_TOLERANCE
        })
        .count();
    let wrist = landmarks[HandLandmark::Wrist.index()];
    let middle_tip = landmarks[HandLandmark::MiddleTip.index()];
    extended >= 3 && wrist.y > middle_tip.y - 0.1
}

fn two_hands<'c, 'a>(ctx: &'c PoseContext<'a>) -> Option<(&'c HandView<'a>, &'c HandView<'a>)> {
    match ctx.hands.as_slice() {
        [a, b, ..] => Some((a, b)),
        _ => None,
    }
}

// ── Emote rules ────────────────────────────────────────────

/// Both fists raised to eye height, a plausible distance apart.
pub fn goblin_crying(ctx: &PoseContext) -> f32 {
    let Some((a, b)) = two_hands(ctx) else {
        return 0.0;
    };
    if !is_hand_closed(a.landmarks) || !is_hand_closed(b.landmarks) {
        return 0.0;
    }
    if a.center[1] >= 0.45 || b.center[1] >= 0.45 {
        return 0.0;
    }
    let dx = (a.center[0] - b.center[0]).abs();
    if !(dx > 0.1 && dx < 0.7) {
        return 0.0;
    }
    let mut confidence = 0.8;
    if (a.center[1] + b.center[1]) / 2.0 < 0.35 {
        confidence += 0.2;
    }
    f32::min(confidence, 1.0)
}

/// Both palms open and up, spread apart (shrug).
pub fn wizard_67(ctx: &PoseContext) -> f32 {
    let Some((a, b)) = two_hands(ctx) else {
        return 0.0;
    };
    if !is_open_palm_up(a.landmarks) || !is_open_palm_up(b.landmarks) {
        return 0.0;
    }
    if (a.center[0] - b.center[0]).abs() <= 0.3 {
        return 0.0;
    }
    let mut confidence = 0.7;
    if (a.center[1] - b.center[1]).abs() < 0.15 {
        confidence += 0.2;
    }
    if (a.center[1] + b.center[1]) / 2.0 > 0.4 {
        confidence += 0.1;
    }
    f32::min(confidence, 1.0)
}

/// An open hand covering the mouth.  Strongest at the mouth center, falling
/// to 0.75 at the edge of the radius.
pub fn princess_yawning(ctx: &PoseContext, face: &FaceLandmarks) -> f32 {
    let (Some(mouth), Some(size)) = (face.mouth_center(), face.size()) else {
        return 0.0;
    };
    let radius = size * MOUTH_RADIUS_FACES;
    if radius <= 0.0 {
        return 0.0;
    }
    ctx.hands
        .iter()
        .filter(|h| is_open_palm_up(h.landmarks) || !is_hand_closed(h.landmarks))
        .map(|h| distance(h.center, mouth))
        .filter(|d| *d < radius)
        .map(|d| 0.75 + 0.25 * (1.0 - d / radius))
        .fold(0.0, f32::max)
}

/// Binary sample for the open/closed gesture on the primary hand.
pub fn gesture_closed(ctx: &PoseContext) -> f32 {
    match ctx.primary() {
        Some(h) if is_hand_closed(h.landmarks) => 1.0,
        _ => 0.0,
    }
}

// ── Default signal set ─────────────────────────────────────

/// The built-in emote signals, in arbitration tie-break order.
pub fn builtin_emotes(window: WindowConfig, hold: HoldConfig) -> Vec<SignalDef> {
    vec![
        SignalDef::pose(GOBLIN_CRYING, "Goblin Crying 😢", goblin_crying),
        SignalDef::pose(WIZARD_67, "Wizard 67 🤷", wizard_67),
        SignalDef::pose_face(PRINCESS_YAWNING, "Princess Yawning 🥱", princess_yawning),
    ]
    .into_iter()
    .map(|def| def.with_window(window).with_hold(hold))
    .collect()
}

/// The open/closed gesture signal driving click and drag.
pub fn builtin_gesture(window: WindowConfig, hold: HoldConfig) -> SignalDef {
    SignalDef::pose(GESTURE_CLOSED, "Closed Hand", gesture_closed)
        .with_window(window)
        .with_hold(hold)
}
