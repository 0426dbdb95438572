//! Cursor collaborator.
//!
//! Turns the primary track and gesture edges into cursor actions for an OS
//! driver: position mapping with a tracking zone and jitter suppression,
//! and click/drag classification from closed/open edges.  Actions are queued
//! and drained by the caller; nothing here touches a real cursor.

use tracing::{debug, info};

use crate::engine::{ControlMode, FrameSnapshot};
use crate::landmarks::Point2;
use crate::signal::{GestureTransition, TriggerEvent, TriggerPayload};
use crate::sink::EventSink;

// ── Config ─────────────────────────────────────────────────

/// Screen mapping settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorConfig {
    pub screen_width: u32,
    pub screen_height: u32,
    /// Normalized hand range mapped onto the full screen.
    pub zone_min: f32,
    pub zone_max: f32,
    /// Flip horizontally (for an unmirrored camera image).
    pub mirror: bool,
    /// Weight given to each new position (lower = smoother, slower).
    pub smoothing: f32,
    /// Pixels kept clear at each screen edge.
    pub margin_px: u32,
    /// Moves shorter than this (pixels) are not issued.
    pub movement_threshold_px: f32,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            screen_width: 1920,
            screen_height: 1080,
            zone_min: 0.10,
            zone_max: 0.90,
            mirror: false,
            smoothing: 0.3,
            margin_px: 0,
            movement_threshold_px: 2.0,
        }
    }
}

/// Click/drag timing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickConfig {
    /// A hand still closed after this long starts a drag.
    pub drag_after_s: f64,
    /// Minimum seconds between clicks.
    pub click_cooldown_s: f64,
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self {
            drag_after_s: 0.35,
            click_cooldown_s: 0.3,
        }
    }
}

// ── Actions ────────────────────────────────────────────────

/// An action for the OS cursor driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorAction {
    Move { x: i32, y: i32 },
    Click,
    DragStart,
    DragEnd,
}

impl CursorAction {
    pub fn to_sexp(&self) -> String {
        match self {
            Self::Move { x, y } => format!("(:action :move :x {} :y {})", x, y),
            Self::Click => "(:action :click)".to_string(),
            Self::DragStart => "(:action :drag-start)".to_string(),
            Self::DragEnd => "(:action :drag-end)".to_string(),
        }
    }
}

// ── Position mapping ───────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CursorMapper {
    pub config: CursorConfig,
    smoothed: Option<[f64; 2]>,
    last_issued: Option<(i32, i32)>,
}

impl CursorMapper {
    pub fn new(config: CursorConfig) -> Self {
        Self {
            config,
            smoothed: None,
            last_issued: None,
        }
    }

    /// Map a normalized hand center to unsmoothed screen pixels.
    pub fn map(&self, center: Point2) -> [f64; 2] {
        let c = &self.config;
        let span = (c.zone_max - c.zone_min).max(f32::EPSILON);
        let remap = |v: f32| ((v - c.zone_min) / span).clamp(0.0, 1.0) as f64;
        let mut nx = remap(center[0]);
        let ny = remap(center[1]);
        if c.mirror {
            nx = 1.0 - nx;
        }
        let clamp = |v: f64, size: u32| {
            let lo = c.margin_px as f64;
            let hi = (size as f64 - c.margin_px as f64).max(lo);
            v.clamp(lo, hi)
        };
        [
            clamp(nx * c.screen_width as f64, c.screen_width),
            clamp(ny * c.screen_height as f64, c.screen_height),
        ]
    }

    /// Feed the primary hand center; returns a new cursor position when the
    /// smoothed position moved past the movement threshold.
    pub fn update(&mut self, center: Point2) -> Option<(i32, i32)> {
        let target = self.map(center);
        let alpha = self.config.smoothing.clamp(0.0, 1.0) as f64;
        let s = match self.smoothed {
            Some(prev) => [
                alpha * target[0] + (1.0 - alpha) * prev[0],
                alpha * target[1] + (1.0 - alpha) * prev[1],
            ],
            None => target,
        };
        self.smoothed = Some(s);
        let pos = (s[0].round() as i32, s[1].round() as i32);
        let moved = match self.last_issued {
            Some((lx, ly)) => {
                let dx = (pos.0 - lx) as f32;
                let dy = (pos.1 - ly) as f32;
                (dx * dx + dy * dy).sqrt() > self.config.movement_threshold_px
            }
            None => true,
        };
        if !moved {
            return None;
        }
        self.last_issued = Some(pos);
        Some(pos)
    }

    pub fn reset(&mut self) {
        self.smoothed = None;
        self.last_issued = None;
    }
}

// ── Click / drag ───────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ClickClassifier {
    pub config: ClickConfig,
    closed_at: Option<f64>,
    dragging: bool,
    last_click: Option<f64>,
}

impl ClickClassifier {
    pub fn new(config: ClickConfig) -> Self {
        Self {
            config,
            closed_at: None,
            dragging: false,
            last_click: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Consume one gesture edge.
    pub fn on_edge(&mut self, transition: GestureTransition, now: f64) -> Option<CursorAction> {
        match transition {
            GestureTransition::Closed => {
                self.closed_at = Some(now);
                None
            }
            GestureTransition::Opened => {
                let Some(closed_at) = self.closed_at.take() else {
                    return None;
                };
                if self.dragging {
                    self.dragging = false;
                    return Some(CursorAction::DragEnd);
                }
                if (now - closed_at).max(0.0) >= self.config.drag_after_s {
                    return None;
                }
                let cooled = match self.last_click {
                    Some(t) => now - t > self.config.click_cooldown_s,
                    None => true,
                };
                if !cooled {
                    debug!("click suppressed by cooldown");
                    return None;
                }
                self.last_click = Some(now);
                Some(CursorAction::Click)
            }
        }
    }

    /// Advance time; starts a drag once the hand has stayed closed long enough.
    pub fn tick(&mut self, now: f64) -> Option<CursorAction> {
        let closed_at = self.closed_at?;
        if self.dragging || (now - closed_at).max(0.0) < self.config.drag_after_s {
            return None;
        }
        self.dragging = true;
        Some(CursorAction::DragStart)
    }

    /// Abandon any press in progress, releasing a drag if one is active.
    pub fn cancel(&mut self) -> Option<CursorAction> {
        self.closed_at = None;
        if self.dragging {
            self.dragging = false;
            return Some(CursorAction::DragEnd);
        }
        None
    }
}

// ── Controller ─────────────────────────────────────────────

/// Event sink that drives the mapper and classifier from engine output.
#[derive(Debug)]
pub struct CursorController {
    pub mapper: CursorMapper,
    pub clicks: ClickClassifier,
    mode: ControlMode,
    primary: Option<u64>,
    actions: Vec<CursorAction>,
}

impl CursorController {
    pub fn new(cursor: CursorConfig, click: ClickConfig) -> Self {
        Self {
            mapper: CursorMapper::new(cursor),
            clicks: ClickClassifier::new(click),
            mode: ControlMode::Cursor,
            primary: None,
            actions: Vec::new(),
        }
    }

    /// Take every action queued since the last drain.
    pub fn drain_actions(&mut self) -> Vec<CursorAction> {
        std::mem::take(&mut self.actions)
    }

    pub fn reset(&mut self) {
        self.mapper.reset();
        self.clicks.cancel();
        self.mode = ControlMode::Cursor;
        self.primary = None;
        self.actions.clear();
    }
}

impl EventSink for CursorController {
    fn on_event(&mut self, event: &TriggerEvent) {
        if self.mode == ControlMode::Emote {
            return;
        }
        if let TriggerPayload::Gesture { transition, .. } = event.payload {
            if let Some(action) = self.clicks.on_edge(transition, event.timestamp_s) {
                info!("cursor {}", action.to_sexp());
                self.actions.push(action);
            }
        }
    }

    fn on_frame(&mut self, frame: &FrameSnapshot) {
        // A press belongs to the hand that made it.
        if frame.primary != self.primary {
            self.primary = frame.primary;
            if let Some(action) = self.clicks.cancel() {
                info!("cursor {} (primary hand changed)", action.to_sexp());
                self.actions.push(action);
            }
        }
        if frame.mode != self.mode {
            debug!("control mode: {} -> {}", self.mode.as_str(), frame.mode.as_str());
            self.mode = frame.mode;
            if self.mode == ControlMode::Emote {
                if let Some(action) = self.clicks.cancel() {
                    info!("cursor {} (emote hold)", action.to_sexp());
                    self.actions.push(action);
                }
            }
        }
        if self.mode == ControlMode::Emote {
            return;
        }
        if let Some(track) = frame.primary_track() {
            if let Some((x, y)) = self.mapper.update(track.center) {
                self.actions.push(CursorAction::Move { x, y });
            }
        }
        if let Some(action) = self.clicks.tick(frame.timestamp_s) {
            info!("cursor {}", action.to_sexp());
            self.actions.push(action);
        }
    }
}
