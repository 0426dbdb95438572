//! Hand and face landmark data structures.
//!
//! Models the 21-point hand layout and 468-point face mesh produced by the
//! external landmark detector.  The engine treats landmarks as opaque except
//! for the handful of points needed to derive a hand center and the mouth
//! position.  No detector dependency.

use tracing::debug;

// ── Hand landmark definitions ──────────────────────────────

/// The 21 hand landmarks emitted by the detector, in detector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandLandmark {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Total number of landmarks per hand.
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Number of points in a full face mesh.
pub const FACE_LANDMARK_COUNT: usize = 468;

impl HandLandmark {
    /// Convert landmark enum to array index (0-20).
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wrist => "wrist",
            Self::ThumbCmc => "thumb-cmc",
            Self::ThumbMcp => "thumb-mcp",
            Self::ThumbIp => "thumb-ip",
            Self::ThumbTip => "thumb-tip",
            Self::IndexMcp => "index-mcp",
            Self::IndexPip => "index-pip",
            Self::IndexDip => "index-dip",
            Self::IndexTip => "index-tip",
            Self::MiddleMcp => "middle-mcp",
            Self::MiddlePip => "middle-pip",
            Self::MiddleDip => "middle-dip",
            Self::MiddleTip => "middle-tip",
            Self::RingMcp => "ring-mcp",
            Self::RingPip => "ring-pip",
            Self::RingDip => "ring-dip",
            Self::RingTip => "ring-tip",
            Self::PinkyMcp => "pinky-mcp",
            Self::PinkyPip => "pinky-pip",
            Self::PinkyDip => "pinky-dip",
            Self::PinkyTip => "pinky-tip",
        }
    }

    /// (tip, pip) pairs for the four non-thumb fingers.
    pub fn finger_tip_pip_pairs() -> [(HandLandmark, HandLandmark); 4] {
        [
            (Self::IndexTip, Self::IndexPip),
            (Self::MiddleTip, Self::MiddlePip),
            (Self::RingTip, Self::RingPip),
            (Self::PinkyTip, Self::PinkyPip),
        ]
    }
}

// ── Handedness ─────────────────────────────────────────────

/// Handedness label reported by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Handedness {
    Left,
    Right,
    #[default]
    Unknown,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a detector label ("Left", "right", ...). Anything else is Unknown.
    pub fn from_label(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "left" => Self::Left,
            "right" => Self::Right,
            _ => Self::Unknown,
        }
    }
}

// ── Points ─────────────────────────────────────────────────

/// Normalized landmark coordinate. `x`/`y` in 0–1 image space, `z` relative depth.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// 2-D normalized position.
pub type Point2 = [f32; 2];

/// Euclidean distance between two 2-D points.
pub fn distance(a: Point2, b: Point2) -> f32 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    (dx * dx + dy * dy).sqrt()
}

// ── Hand detection ─────────────────────────────────────────

/// One raw hand detection for a single frame.
#[derive(Debug, Clone)]
pub struct HandDetection {
    /// Landmarks in detector order. Expected length is 21.
    pub landmarks: Vec<Point3>,
    pub handedness: Handedness,
    /// Detector confidence (0.0-1.0).
    pub confidence: f32,
}

impl HandDetection {
    pub fn new(landmarks: Vec<Point3>, handedness: Handedness, confidence: f32) -> Self {
        Self {
            landmarks,
            handedness,
            confidence,
        }
    }

    /// Whether the landmark set has the full 21 points.
    pub fn is_complete(&self) -> bool {
        self.landmarks.len() >= HAND_LANDMARK_COUNT
    }

    /// Raw hand center: midpoint of the wrist and the middle-finger MCP.
    ///
    /// Returns `None` for an incomplete or non-finite landmark set; the
    /// matcher treats such a detection as absent.
    pub fn center(&self) -> Option<Point2> {
        hand_center(&self.landmarks)
    }
}

/// Midpoint of wrist and middle-finger MCP for a 21-point landmark set.
pub fn hand_center(landmarks: &[Point3]) -> Option<Point2> {
    if landmarks.len() < HAND_LANDMARK_COUNT {
        debug!(
            "hand landmarks: expected {} points, got {}",
            HAND_LANDMARK_COUNT,
            landmarks.len()
        );
        return None;
    }
    let wrist = landmarks[HandLandmark::Wrist.index()];
    let mcp = landmarks[HandLandmark::MiddleMcp.index()];
    if !wrist.is_finite() || !mcp.is_finite() {
        return None;
    }
    Some([(wrist.x + mcp.x) / 2.0, (wrist.y + mcp.y) / 2.0])
}

// ── Face landmarks ─────────────────────────────────────────

/// Face mesh indices used for mouth geometry.
const UPPER_LIP: usize = 13;
const LOWER_LIP: usize = 14;
const MOUTH_LEFT: usize = 61;
const MOUTH_RIGHT: usize = 291;

/// Face mesh for a single frame.
#[derive(Debug, Clone)]
pub struct FaceLandmarks {
    pub points: Vec<Point3>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Point3>) -> Self {
        Self { points }
    }

    /// Mouth center: mean of both lips and both mouth corners.
    pub fn mouth_center(&self) -> Option<Point2> {
        let idx = [UPPER_LIP, LOWER_LIP, MOUTH_LEFT, MOUTH_RIGHT];
        let mut sum = [0.0f32; 2];
        for i in idx {
            let p = self.points.get(i)?;
            if !p.is_finite() {
                return None;
            }
            sum[0] += p.x;
            sum[1] += p.y;
        }
        Some([sum[0] / idx.len() as f32, sum[1] / idx.len() as f32])
    }

    /// Face size: mean of bounding-box width and height.
    pub fn size(&self) -> Option<f32> {
        let (mut min_x, mut max_x) = (f32::MAX, f32::MIN);
        let (mut min_y, mut max_y) = (f32::MAX, f32::MIN);
        let mut any = false;
        for p in self.points.iter().filter(|p| p.is_finite()) {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
            any = true;
        }
        if !any {
            return None;
        }
        Some(((max_x - min_x) + (max_y - min_y)) / 2.0)
    }
}

// ── Tests ──────────────────────────────────────────────────
