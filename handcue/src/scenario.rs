//! Scripted frame sequences for replay.
//!
//! A scenario file holds one frame per line as a property list:
//!
//! ```text
//! ; two seconds of a shrug
//! (:t 0.033 :hands ((:x 0.2 :y 0.6 :pose open :handedness right)
//!                   (:x 0.8 :y 0.6 :pose open :handedness left)))
//! (:t 0.066 :hands ((:x 0.5 :y 0.35)) :face (:x 0.5 :y 0.3 :size 0.2))
//! (:t 0.100 :signals ((:name "wizard_67" :confidence 0.9)))
//! ```
//!
//! Hands and faces are expanded into synthetic landmark sets.  Blank lines
//! and `;` comments are skipped.

use std::path::Path;

use anyhow::{anyhow, bail, Context};
use lexpr::Value;

use crate::engine::FrameInput;
use crate::landmarks::{FaceLandmarks, HandDetection, Handedness, Point2};
use crate::sexp::{atom_string, get_float, get_string, get_value, list_items, plist_keys};
use crate::synth::{self, HandPose};

/// Face size used when a scenario face omits `:size`.
const DEFAULT_FACE_SIZE: f32 = 0.2;

/// One scripted frame: the caller's timestamp and the detector output.
#[derive(Debug, Clone)]
pub struct ScenarioFrame {
    pub t: f64,
    pub input: FrameInput,
}

#[derive(Debug, Clone, Default)]
pub struct Scenario {
    pub frames: Vec<ScenarioFrame>,
}

impl Scenario {
    /// Parse scenario text.  Errors name the 1-based line.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let mut frames = Vec::new();
        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            let frame = parse_frame(line).with_context(|| format!("line {}", n + 1))?;
            frames.push(frame);
        }
        Ok(Self { frames })
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("in scenario {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Built-in session at 30 fps: one hand moves, clicks and drags; a
    /// second hand enters; the first leaves and the second takes over,
    /// yawns behind a face, and finally shrugs with a new partner hand.
    pub fn demo() -> Self {
        use HandPose::{Closed, Open};

        let mut s = Script::new(30.0);
        let right = |p: Point2, pose| synth::hand(p, pose, Handedness::Right);
        let left = |p: Point2, pose| synth::hand(p, pose, Handedness::Left);
        let face = || synth::face([0.5, 0.3], DEFAULT_FACE_SIZE);

        // Glide in from the left.
        for i in 0..30 {
            let p = lerp([0.3, 0.5], [0.5, 0.5], i, 30);
            s.push(vec![right(p, Open)], None);
        }
        // Click: a short close.
        s.repeat(5, || vec![right([0.5, 0.5], Closed)], None);
        s.repeat(10, || vec![right([0.5, 0.5], Open)], None);
        // Drag: stay closed while moving.
        for i in 0..30 {
            let p = lerp([0.5, 0.5], [0.6, 0.5], i, 30);
            s.push(vec![right(p, Closed)], None);
        }
        s.repeat(10, || vec![right([0.6, 0.5], Open)], None);
        // A second hand joins; the first stays primary.
        s.repeat(
            20,
            || vec![right([0.6, 0.5], Open), left([0.35, 0.55], Open)],
            None,
        );
        // The first hand leaves; the second takes over once it is evicted.
        s.repeat(20, || vec![left([0.35, 0.55], Open)], None);
        // Hand over the mouth.
        for i in 0..20 {
            let p = lerp([0.35, 0.55], [0.5, 0.35], i, 20);
            s.push(vec![left(p, Open)], Some(face()));
        }
        s.repeat(60, || vec![left([0.5, 0.35], Open)], Some(face()));
        // Shrug with a fresh partner hand.
        for i in 0..20 {
            let p = lerp([0.5, 0.35], [0.2, 0.6], i, 20);
            s.push(vec![left(p, Open)], None);
        }
        s.repeat(
            60,
            || vec![left([0.2, 0.6], Open), right([0.8, 0.6], Open)],
            None,
        );
        s.repeat(20, Vec::new, None);
        s.into_scenario()
    }
}

// ── Line parsing ───────────────────────────────────────────

/// Parse one frame line.
pub fn parse_frame(line: &str) -> anyhow::Result<ScenarioFrame> {
    let value = lexpr::from_str(line).context("frame is not a valid s-expression")?;
    let keys = plist_keys(&value)
        .map_err(|i| anyhow!("frame: expected a keyword at position {}", i))?;
    for key in &keys {
        match key.as_str() {
            "t" | "hands" | "face" | "signals" => {}
            other => bail!("unknown frame key :{}", other),
        }
    }

    let t = get_float(&value, "t").ok_or_else(|| anyhow!("frame needs a numeric :t"))?;
    let mut input = FrameInput::default();

    if let Some(hands) = get_value(&value, "hands") {
        for (i, item) in list_items(hands).into_iter().enumerate() {
            let hand = parse_hand(item).with_context(|| format!("hand {}", i))?;
            input.hands.push(hand);
        }
    }
    if let Some(face) = get_value(&value, "face") {
        if atom_string(face) != "nil" {
            input.face = Some(parse_face(face).context("face")?);
        }
    }
    if let Some(signals) = get_value(&value, "signals") {
        for item in list_items(signals) {
            let name = get_string(item, "name").ok_or_else(|| anyhow!("signal needs :name"))?;
            let confidence = get_float(item, "confidence")
                .ok_or_else(|| anyhow!("signal {} needs a numeric :confidence", name))?;
            input.confidences.insert(name, confidence as f32);
        }
    }
    Ok(ScenarioFrame { t, input })
}

fn parse_point(value: &Value) -> anyhow::Result<Point2> {
    let x = get_float(value, "x").ok_or_else(|| anyhow!("missing numeric :x"))?;
    let y = get_float(value, "y").ok_or_else(|| anyhow!("missing numeric :y"))?;
    Ok([x as f32, y as f32])
}

fn parse_hand(value: &Value) -> anyhow::Result<HandDetection> {
    let center = parse_point(value)?;
    let pose = match get_string(value, "pose") {
        Some(name) => HandPose::from_str(&name).ok_or_else(|| anyhow!("unknown pose: {}", name))?,
        None => HandPose::Open,
    };
    let handedness = get_string(value, "handedness")
        .map(|s| Handedness::from_label(&s))
        .unwrap_or_default();
    Ok(synth::hand(center, pose, handedness))
}

fn parse_face(value: &Value) -> anyhow::Result<FaceLandmarks> {
    let center = parse_point(value)?;
    let size = get_float(value, "size").map_or(DEFAULT_FACE_SIZE, |s| s as f32);
    if size.is_nan() || size <= 0.0 {
        bail!("face :size must be positive");
    }
    Ok(synth::face(center, size))
}

// ── Demo builder ───────────────────────────────────────────

struct Script {
    frames: Vec<ScenarioFrame>,
    dt: f64,
}

impl Script {
    fn new(fps: f64) -> Self {
        Self {
            frames: Vec::new(),
            dt: 1.0 / fps,
        }
    }

    fn push(&mut self, hands: Vec<HandDetection>, face: Option<FaceLandmarks>) {
        let t = self.frames.len() as f64 * self.dt;
        let mut input = FrameInput::new(hands);
        input.face = face;
        self.frames.push(ScenarioFrame { t, input });
    }

    fn repeat<F>(&mut self, n: usize, hands: F, face: Option<FaceLandmarks>)
    where
        F: Fn() -> Vec<HandDetection>,
    {
        for _ in 0..n {
            self.push(hands(), face.clone());
        }
    }

    fn into_scenario(self) -> Scenario {
        Scenario {
            frames: self.frames,
        }
    }
}

fn lerp(from: Point2, to: Point2, step: usize, steps: usize) -> Point2 {
    let f = step as f32 / steps as f32;
    [
        from[0] + (to[0] - from[0]) * f,
        from[1] + (to[1] - from[1]) * f,
    ]
}
