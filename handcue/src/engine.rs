//! The frame-synchronous engine.
//!
//! One [`Engine::update`] call per frame runs, in order: clock, hand
//! matcher, primary selection, emote arbitration, gesture edges, control
//! mode.  The engine owns all state, does no I/O, and never fails on a
//! frame; degenerate input only ever produces an empty or quiet snapshot.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, info};

use crate::clock::FrameClock;
use crate::config::EngineConfig;
use crate::landmarks::{FaceLandmarks, HandDetection};
use crate::sexp::bool_sexp;
use crate::signal::rules::{builtin_emotes, builtin_gesture};
use crate::signal::{
    EmoteArbiter, GestureTracker, HandView, PoseContext, SignalDef, SignalStatus, TriggerEvent,
};
use crate::tracking::{HandMatcher, PrimarySelector, Track, TrackSnapshot, TrackStore};

// ── Frame input ────────────────────────────────────────────

/// Everything the detector produced for one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    /// Hand detections in detector order.
    pub hands: Vec<HandDetection>,
    pub face: Option<FaceLandmarks>,
    /// Confidences from an outside classifier, keyed by signal name.
    pub confidences: HashMap<String, f32>,
}

impl FrameInput {
    pub fn new(hands: Vec<HandDetection>) -> Self {
        Self {
            hands,
            ..Default::default()
        }
    }

    pub fn with_face(mut self, face: FaceLandmarks) -> Self {
        self.face = Some(face);
        self
    }

    pub fn with_confidence(mut self, signal: &str, confidence: f32) -> Self {
        self.confidences.insert(signal.to_string(), confidence);
        self
    }
}

// ── Control mode ───────────────────────────────────────────

/// Who owns the hands this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ControlMode {
    /// The primary hand drives the cursor.
    #[default]
    Cursor,
    /// An emote hold is in progress; the cursor stays put.
    Emote,
}

impl ControlMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cursor => "cursor",
            Self::Emote => "emote",
        }
    }
}

// ── Frame output ───────────────────────────────────────────

/// Engine output for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    pub frame: u64,
    /// Time the frame was evaluated at, after clamping.
    pub timestamp_s: f64,
    pub tracks: Vec<TrackSnapshot>,
    pub primary: Option<u64>,
    /// Emote signals in declaration order, then the gesture signal.
    pub signals: Vec<SignalStatus>,
    /// The single event delivered this frame.  An emote takes the slot
    /// ahead of a gesture edge; the edge follows on a later frame.
    pub trigger: Option<TriggerEvent>,
    pub mode: ControlMode,
}

impl FrameSnapshot {
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn primary_track(&self) -> Option<&TrackSnapshot> {
        self.tracks.iter().find(|t| t.is_primary)
    }

    pub fn signal(&self, name: &str) -> Option<&SignalStatus> {
        self.signals.iter().find(|s| s.name == name)
    }

    /// This frame's event if it is an emote.
    pub fn emote(&self) -> Option<&TriggerEvent> {
        self.trigger.as_ref().filter(|e| e.is_emote())
    }

    /// This frame's event if it is a gesture edge.
    pub fn gesture_edge(&self) -> Option<&TriggerEvent> {
        self.trigger.as_ref().filter(|e| !e.is_emote())
    }

    pub fn to_sexp(&self) -> String {
        let tracks: Vec<String> = self.tracks.iter().map(|t| t.to_sexp()).collect();
        let signals: Vec<String> = self.signals.iter().map(|s| s.to_sexp()).collect();
        format!(
            "(:frame {} :t {:.3} :mode :{} :primary {} :tracks ({}) :signals ({}) :trigger {})",
            self.frame,
            self.timestamp_s,
            self.mode.as_str(),
            self.primary.map_or("nil".to_string(), |id| id.to_string()),
            tracks.join(" "),
            signals.join(" "),
            self.trigger.as_ref().map_or("nil".to_string(), |e| e.to_sexp()),
        )
    }
}

// ── Engine ─────────────────────────────────────────────────

pub struct Engine {
    config: EngineConfig,
    clock: FrameClock,
    store: TrackStore,
    matcher: HandMatcher,
    primary: PrimarySelector,
    emotes: EmoteArbiter,
    gesture: Option<GestureTracker>,
    /// Gesture edges waiting behind an emote, oldest first.
    pending_edges: VecDeque<TriggerEvent>,
    mode: ControlMode,
    frame: u64,
    /// Emote triggers fired since creation.
    pub triggers_total: u64,
}

impl Engine {
    /// Engine with the built-in emote and gesture signals.
    pub fn new(config: EngineConfig) -> Self {
        let emotes = builtin_emotes(config.emote_window, config.emote_hold);
        let gesture = builtin_gesture(config.gesture_window, config.gesture_hold);
        Self::with_signals(config, emotes, Some(gesture))
    }

    /// Engine with caller-supplied signals.  Emote order is the arbitration
    /// tie-break order.
    pub fn with_signals(
        config: EngineConfig,
        emotes: Vec<SignalDef>,
        gesture: Option<SignalDef>,
    ) -> Self {
        info!(
            "engine: {} emote signal(s), gesture {}",
            emotes.len(),
            gesture.as_ref().map_or("off", |g| g.name.as_str())
        );
        Self {
            matcher: HandMatcher::new(config.tracking),
            config,
            clock: FrameClock::default(),
            store: TrackStore::new(),
            primary: PrimarySelector::new(),
            emotes: EmoteArbiter::new(emotes),
            gesture: gesture.map(GestureTracker::new),
            pending_edges: VecDeque::new(),
            mode: ControlMode::Cursor,
            frame: 0,
            triggers_total: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tracks(&self) -> &TrackStore {
        &self.store
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Advance one frame.  `now_s` is read once and held for the whole frame.
    pub fn update(&mut self, input: &FrameInput, now_s: f64) -> FrameSnapshot {
        self.frame += 1;
        let now = self.clock.tick(now_s);

        let outcome = self.matcher.update(&mut self.store, &input.hands, now);
        if !outcome.spawned.is_empty() || !outcome.evicted.is_empty() {
            debug!(
                "frame {}: {} track(s), spawned {:?}, evicted {:?}",
                self.frame,
                self.store.len(),
                outcome.spawned,
                outcome.evicted
            );
        }

        let previous_primary = self.primary.current();
        let primary = self.primary.update(self.store.tracks());

        let ctx = pose_context(self.store.tracks(), primary, input);
        let emote = self.emotes.update(&ctx, now);

        if let Some(g) = self.gesture.as_mut() {
            // A press belongs to the hand that made it.
            if primary != previous_primary {
                if g.is_closed() || !self.pending_edges.is_empty() {
                    debug!("gesture released on primary hand change");
                }
                g.release();
                self.pending_edges.clear();
            }
            if let Some(edge) = g.update(&ctx, now) {
                self.pending_edges.push_back(edge);
            }
        }

        // One event per frame: an emote first, otherwise the oldest edge.
        let trigger = match emote {
            Some(e) => {
                self.triggers_total += 1;
                if !self.pending_edges.is_empty() {
                    debug!(
                        "{} gesture edge(s) deferred behind emote {}",
                        self.pending_edges.len(),
                        e.signal
                    );
                }
                Some(e)
            }
            None => self.pending_edges.pop_front(),
        };

        let mode = if self.emotes.any_holding() {
            ControlMode::Emote
        } else {
            ControlMode::Cursor
        };
        if mode != self.mode {
            info!("control mode: {}", mode.as_str());
            self.mode = mode;
        }

        let mut signals = self.emotes.statuses(now);
        if let Some(g) = &self.gesture {
            signals.push(g.status(now));
        }

        FrameSnapshot {
            frame: self.frame,
            timestamp_s: now,
            tracks: self.store.snapshot(primary),
            primary,
            signals,
            trigger,
            mode,
        }
    }

    /// Drop all tracks and signal state.  Track ids keep counting up.
    pub fn reset(&mut self) {
        info!("engine reset after {} frame(s)", self.frame);
        self.store.clear();
        self.primary.reset();
        self.emotes.reset();
        if let Some(g) = self.gesture.as_mut() {
            g.reset();
        }
        self.pending_edges.clear();
        self.clock.reset();
        self.mode = ControlMode::Cursor;
    }

    /// Live engine state for status output.
    pub fn status_sexp(&self) -> String {
        let now = self.clock.now().unwrap_or(0.0);
        let mut signals: Vec<String> = self
            .emotes
            .statuses(now)
            .iter()
            .map(|s| s.to_sexp())
            .collect();
        if let Some(g) = &self.gesture {
            signals.push(g.status(now).to_sexp());
        }
        format!(
            "(:frame {} :tracks {} :primary {} :mode :{} :gesture-closed {} :triggers {} :evicted {} :clock {} :signals ({}))",
            self.frame,
            self.store.len(),
            self.primary
                .current()
                .map_or("nil".to_string(), |id| id.to_string()),
            self.mode.as_str(),
            bool_sexp(self.gesture.as_ref().map_or(false, |g| g.is_closed())),
            self.triggers_total,
            self.store.evicted_total,
            self.clock.stats_sexp(),
            signals.join(" "),
        )
    }

    pub fn config_sexp(&self) -> String {
        self.config.config_sexp()
    }
}

/// Hands matched this frame, primary first, then oldest first.
fn pose_context<'a>(
    tracks: &'a [Track],
    primary: Option<u64>,
    input: &'a FrameInput,
) -> PoseContext<'a> {
    let mut live: Vec<&Track> = tracks.iter().filter(|t| t.is_matched()).collect();
    live.sort_by(|a, b| {
        let pa = Some(a.id) == primary;
        let pb = Some(b.id) == primary;
        pb.cmp(&pa)
            .then(
                a.first_seen
                    .partial_cmp(&b.first_seen)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(a.id.cmp(&b.id))
    });
    PoseContext {
        hands: live
            .into_iter()
            .filter_map(|t| {
                HandView::new(t.id, &t.landmarks, t.handedness, Some(t.id) == primary)
            })
            .collect(),
        face: input.face.as_ref(),
        external: Some(&input.confidences),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::Handedness;
    use crate::signal::hold::HoldPhase;
    use crate::signal::rules::{GESTURE_CLOSED, PRINCESS_YAWNING, WIZARD_67};
    use crate::signal::{GestureTransition, TriggerPayload};
    use crate::synth::{self, HandPose};

    fn frame_at(i: u32) -> f64 {
        i as f64 / 30.0
    }

    fn test_hand(x: f32, y: f32, pose: HandPose) -> HandDetection {
        synth::hand([x, y], pose, Handedness::Right)
    }

    fn shrug() -> FrameInput {
        FrameInput::new(vec![
            test_hand(0.2, 0.6, HandPose::Open),
            test_hand(0.8, 0.6, HandPose::Open),
        ])
    }

    #[test]
    fn test_empty_input_is_steady() {
        let mut e = Engine::new(EngineConfig::default());
        for i in 0..10 {
            let snap = e.update(&FrameInput::default(), frame_at(i));
            assert_eq!(snap.track_count(), 0);
            assert_eq!(snap.primary, None);
            assert!(snap.trigger.is_none());
            assert!(snap.gesture_edge().is_none());
            assert_eq!(snap.mode, ControlMode::Cursor);
        }
    }

    #[test]
    fn test_two_hands_two_tracks() {
        let mut e = Engine::new(EngineConfig::default());
        let snap = e.update(
            &FrameInput::new(vec![
                test_hand(0.2, 0.2, HandPose::Open),
                test_hand(0.8, 0.8, HandPose::Open),
            ]),
            0.0,
        );
        assert_eq!(snap.track_count(), 2);
        assert_eq!(snap.primary, Some(1));
        assert!(snap.primary_track().unwrap().is_primary);
    }

    #[test]
    fn test_primary_independent_of_detection_order() {
        let mut e = Engine::new(EngineConfig::default());
        e.update(&FrameInput::new(vec![test_hand(0.2, 0.5, HandPose::Open)]), 0.0);
        e.update(
            &FrameInput::new(vec![
                test_hand(0.2, 0.5, HandPose::Open),
                test_hand(0.8, 0.5, HandPose::Open),
            ]),
            0.033,
        );
        let snap = e.update(
            &FrameInput::new(vec![
                test_hand(0.8, 0.5, HandPose::Open),
                test_hand(0.2, 0.5, HandPose::Open),
            ]),
            0.066,
        );
        assert_eq!(snap.primary, Some(1));
        let p = snap.primary_track().unwrap();
        assert!((p.center[0] - 0.2).abs() < 1e-3);
    }

    #[test]
    fn test_primary_handoff_on_eviction() {
        let mut e = Engine::new(EngineConfig::default());
        e.update(&FrameInput::new(vec![test_hand(0.2, 0.5, HandPose::Open)]), 0.0);
        e.update(
            &FrameInput::new(vec![
                test_hand(0.2, 0.5, HandPose::Open),
                test_hand(0.8, 0.5, HandPose::Open),
            ]),
            0.1,
        );
        let only_second = FrameInput::new(vec![test_hand(0.8, 0.5, HandPose::Open)]);
        let snap = e.update(&only_second, 0.5);
        assert_eq!(snap.primary, Some(1));
        let snap = e.update(&only_second, 0.7);
        assert_eq!(snap.track_count(), 1);
        assert_eq!(snap.primary, Some(2));
    }

    #[test]
    fn test_wizard_fires_once_at_hold_time() {
        let mut e = Engine::new(EngineConfig::default());
        let mut fired = Vec::new();
        for i in 0..=90 {
            let snap = e.update(&shrug(), frame_at(i));
            if let Some(t) = snap.trigger {
                fired.push((i, t));
            }
        }
        assert_eq!(fired.len(), 1);
        let (i, t) = &fired[0];
        assert_eq!(*i, 45);
        assert_eq!(t.signal, WIZARD_67);
        assert_eq!(
            t.payload,
            TriggerPayload::Emote {
                display: "Wizard 67 🤷".to_string()
            }
        );
        assert_eq!(e.triggers_total, 1);
    }

    #[test]
    fn test_emote_mode_while_holding() {
        let mut e = Engine::new(EngineConfig::default());
        let snap = e.update(&shrug(), 0.0);
        assert_eq!(snap.mode, ControlMode::Emote);
        let st = snap.signal(WIZARD_67).unwrap();
        assert!(matches!(st.phase, HoldPhase::Holding { .. }));
        let snap = e.update(&shrug(), 1.5);
        assert!(snap.emote().is_some());
        assert_eq!(snap.mode, ControlMode::Cursor);
    }

    #[test]
    fn test_interrupted_hold_restarts() {
        let mut e = Engine::new(EngineConfig::default());
        for i in 0..30 {
            assert!(e.update(&shrug(), frame_at(i)).emote().is_none());
        }
        // Drop the pose long enough for the window to go inactive.
        let single = FrameInput::new(vec![test_hand(0.2, 0.6, HandPose::Open)]);
        for i in 30..35 {
            e.update(&single, frame_at(i));
        }
        let snap = e.update(&single, frame_at(35));
        assert_eq!(snap.signal(WIZARD_67).unwrap().phase, HoldPhase::Idle);
        let mut fired = None;
        for i in 36..=120 {
            if e.update(&shrug(), frame_at(i)).emote().is_some() {
                fired = Some(i);
                break;
            }
        }
        // Window needs three of five positives again before the hold restarts.
        let fired = fired.unwrap();
        assert!(fired >= 36 + 45, "fired at {}", fired);
    }

    #[test]
    fn test_face_absent_reads_inactive() {
        let mut e = Engine::new(EngineConfig::default());
        let hand = FrameInput::new(vec![test_hand(0.5, 0.35, HandPose::Open)]);
        for i in 0..10 {
            let snap = e.update(&hand, frame_at(i));
            let st = snap.signal(PRINCESS_YAWNING).unwrap();
            assert!(!st.active);
            assert_eq!(st.confidence, 0.0);
        }
        let with_face = hand.clone().with_face(synth::face([0.5, 0.3], 0.2));
        let snap = e.update(&with_face, frame_at(10));
        assert!(snap.signal(PRINCESS_YAWNING).unwrap().confidence > 0.9);
    }

    #[test]
    fn test_external_confidence_drives_signal() {
        let mut e = Engine::new(EngineConfig::default());
        let input = FrameInput::default().with_confidence(WIZARD_67, 0.95);
        let mut fired = 0;
        for i in 0..=60 {
            if e.update(&input, frame_at(i)).emote().is_some() {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_gesture_edges_for_primary() {
        let mut e = Engine::new(EngineConfig::default());
        let open = FrameInput::new(vec![test_hand(0.5, 0.5, HandPose::Open)]);
        let fist = FrameInput::new(vec![test_hand(0.5, 0.5, HandPose::Closed)]);
        let mut edges = Vec::new();
        let script = [
            &open, &open, &open, &fist, &fist, &fist, &fist, &fist, &open, &open, &open, &open,
        ];
        for (i, input) in script.iter().enumerate() {
            if let Some(edge) = e.update(input, frame_at(i as u32)).gesture_edge() {
                edges.push((i, edge.clone()));
            }
        }
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].1.signal, GESTURE_CLOSED);
        match (&edges[0].1.payload, &edges[1].1.payload) {
            (
                TriggerPayload::Gesture { transition: a, .. },
                TriggerPayload::Gesture {
                    transition: b,
                    closed_for_s,
                },
            ) => {
                assert_eq!(*a, GestureTransition::Closed);
                assert_eq!(*b, GestureTransition::Opened);
                assert!(*closed_for_s > 0.0);
            }
            _ => panic!("expected gesture payloads"),
        }
        assert!(edges[0].0 < edges[1].0);
    }

    #[test]
    fn test_emote_and_gesture_edge_share_no_frame() {
        let mut e = Engine::new(EngineConfig::default());
        let frame = |pose| {
            FrameInput::new(vec![test_hand(0.5, 0.5, pose)]).with_confidence(WIZARD_67, 0.95)
        };
        let mut emotes = Vec::new();
        let mut edges = Vec::new();
        for i in 0..=60 {
            let pose = if i < 43 { HandPose::Open } else { HandPose::Closed };
            let snap = e.update(&frame(pose), frame_at(i));
            if let Some(t) = snap.emote() {
                emotes.push((i, t.signal.clone()));
            }
            if let Some(edge) = snap.gesture_edge() {
                edges.push((i, edge.clone()));
            }
        }
        // The fist is consistent on frame 45, the same frame the emote fires.
        assert_eq!(emotes, vec![(45, WIZARD_67.to_string())]);
        assert_eq!(edges.len(), 1);
        let (i, edge) = &edges[0];
        assert_eq!(*i, 46);
        assert!((edge.timestamp_s - frame_at(45)).abs() < 1e-9);
        assert!(matches!(
            edge.payload,
            TriggerPayload::Gesture {
                transition: GestureTransition::Closed,
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_detection_ignored() {
        let mut e = Engine::new(EngineConfig::default());
        let bad = HandDetection::new(Vec::new(), Handedness::Left, 0.9);
        let snap = e.update(&FrameInput::new(vec![bad]), 0.0);
        assert_eq!(snap.track_count(), 0);
    }

    #[test]
    fn test_clock_backwards_never_fires_early() {
        let mut e = Engine::new(EngineConfig::default());
        e.update(&shrug(), 10.0);
        let snap = e.update(&shrug(), 2.0);
        assert_eq!(snap.timestamp_s, 10.0);
        assert!(snap.trigger.is_none());
        let t = &snap.tracks[0];
        assert!(t.first_seen <= t.last_seen);
        assert_eq!(e.clock().backwards_count, 1);
    }

    #[test]
    fn test_reset_keeps_ids_monotonic() {
        let mut e = Engine::new(EngineConfig::default());
        e.update(&FrameInput::new(vec![test_hand(0.5, 0.5, HandPose::Open)]), 0.0);
        e.reset();
        let snap = e.update(&FrameInput::new(vec![test_hand(0.5, 0.5, HandPose::Open)]), 0.1);
        assert_eq!(snap.tracks[0].id, 2);
        assert!(snap.signals.iter().all(|s| s.phase == HoldPhase::Idle));
    }

    #[test]
    fn test_status_and_snapshot_sexp() {
        let mut e = Engine::new(EngineConfig::default());
        let snap = e.update(&shrug(), 0.0);
        let s = snap.to_sexp();
        assert!(s.starts_with("(:frame 1"));
        assert!(s.contains(":mode :emote"));
        let status = e.status_sexp();
        assert!(status.contains(":tracks 2"));
        assert!(status.contains(":primary 1"));
        assert!(e.config_sexp().contains(":position-threshold 0.150"));
    }
}
