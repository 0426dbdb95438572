//! Synthetic landmark sets.
//!
//! Builds plausible 21-point hands and 468-point faces around a given
//! center, so scenarios and tests can drive the engine without a detector.

use crate::landmarks::{
    FaceLandmarks, HandDetection, HandLandmark, Handedness, Point2, Point3,
    FACE_LANDMARK_COUNT, HAND_LANDMARK_COUNT,
};

/// Coarse hand shape for synthetic landmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandPose {
    /// All fingers extended, fingertips above the knuckles.
    Open,
    /// Fingers curled into a fist.
    Closed,
}

impl HandPose {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" | "palm" => Some(Self::Open),
            "closed" | "fist" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// Half the wrist-to-middle-MCP span.
const PALM_HALF: f32 = 0.05;

/// Build a hand whose wrist/middle-MCP midpoint sits exactly at `center`.
pub fn hand(center: Point2, pose: HandPose, handedness: Handedness) -> HandDetection {
    let [cx, cy] = center;
    let mut lm = vec![Point3::default(); HAND_LANDMARK_COUNT];
    let mcp_y = cy - PALM_HALF;

    lm[HandLandmark::Wrist.index()] = Point3::new(cx, cy + PALM_HALF, 0.0);

    let fingers = [
        (HandLandmark::IndexMcp, -0.030),
        (HandLandmark::MiddleMcp, 0.0),
        (HandLandmark::RingMcp, 0.030),
        (HandLandmark::PinkyMcp, 0.055),
    ];
    for (mcp, dx) in fingers {
        let x = cx + dx;
        // MCP, PIP, DIP, TIP are consecutive indices.
        let base = mcp.index();
        let (pip, dip, tip) = match pose {
            HandPose::Open => (mcp_y - 0.04, mcp_y - 0.07, mcp_y - 0.10),
            HandPose::Closed => (mcp_y - 0.03, mcp_y - 0.01, mcp_y + 0.005),
        };
        lm[base] = Point3::new(x, mcp_y, 0.0);
        lm[base + 1] = Point3::new(x, pip, -0.01);
        lm[base + 2] = Point3::new(x, dip, -0.02);
        lm[base + 3] = Point3::new(x, tip, -0.03);
    }

    let thumb_tip = match pose {
        HandPose::Open => Point3::new(cx - 0.08, cy - 0.04, -0.02),
        HandPose::Closed => Point3::new(cx - 0.02, cy - 0.02, -0.02),
    };
    lm[HandLandmark::ThumbCmc.index()] = Point3::new(cx - 0.04, cy + 0.03, 0.0);
    lm[HandLandmark::ThumbMcp.index()] = Point3::new(cx - 0.06, cy, -0.01);
    lm[HandLandmark::ThumbIp.index()] = Point3::new(cx - 0.07, cy - 0.02, -0.015);
    lm[HandLandmark::ThumbTip.index()] = thumb_tip;

    HandDetection::new(lm, handedness, 0.95)
}

/// Build a face mesh with bounding-box size `size` centered at `center`.
/// The mouth sits a quarter face-size below the center.
pub fn face(center: Point2, size: f32) -> FaceLandmarks {
    let [cx, cy] = center;
    let half = size / 2.0;
    let mut pts = vec![Point3::new(cx, cy, 0.0); FACE_LANDMARK_COUNT];
    pts[10] = Point3::new(cx, cy - half, 0.0); // forehead
    pts[152] = Point3::new(cx, cy + half, 0.0); // chin
    pts[234] = Point3::new(cx - half, cy, 0.0);
    pts[454] = Point3::new(cx + half, cy, 0.0);
    pts[13] = Point3::new(cx, cy + 0.22 * size, 0.0);
    pts[14] = Point3::new(cx, cy + 0.28 * size, 0.0);
    pts[61] = Point3::new(cx - 0.1 * size, cy + 0.25 * size, 0.0);
    pts[291] = Point3::new(cx + 0.1 * size, cy + 0.25 * size, 0.0);
    FaceLandmarks::new(pts)
}
