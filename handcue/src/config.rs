//! Engine configuration, presets, and s-expression overrides.
//!
//! Every tunable lives here.  A config file is a single property list, e.g.
//!
//! ```text
//! (:preset responsive :position-threshold 0.12 :emote-hold-time 1.0)
//! ```
//!
//! applied on top of a base configuration.  Unknown keys are rejected.

use anyhow::{anyhow, bail, Context};
use lexpr::Value;
use tracing::info;

use crate::cursor::{ClickConfig, CursorConfig};
use crate::sexp::{bool_sexp, get_bool, get_float, get_int, get_string, plist_keys};
use crate::signal::window::MAX_WINDOW_SIZE;
use crate::signal::{HoldConfig, WindowConfig};
use crate::tracking::TrackingConfig;

// ── Presets ────────────────────────────────────────────────

/// Named tuning presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Preset {
    #[default]
    Default,
    /// Shorter gesture window.
    HighPerformance,
    /// Longer gesture window, smoother cursor.
    HighAccuracy,
    /// Short window, fast cursor, quicker repeat clicks.
    Responsive,
    /// Long window, heavy cursor smoothing, finer movement.
    Smooth,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::HighPerformance => "high-performance",
            Self::HighAccuracy => "high-accuracy",
            Self::Responsive => "responsive",
            Self::Smooth => "smooth",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "default" => Some(Self::Default),
            "high-performance" => Some(Self::HighPerformance),
            "high-accuracy" => Some(Self::HighAccuracy),
            "responsive" => Some(Self::Responsive),
            "smooth" => Some(Self::Smooth),
            _ => None,
        }
    }

    pub fn all() -> [Preset; 5] {
        [
            Self::Default,
            Self::HighPerformance,
            Self::HighAccuracy,
            Self::Responsive,
            Self::Smooth,
        ]
    }

    /// Apply this preset's overrides to `base`.
    pub fn apply(self, mut base: EngineConfig) -> EngineConfig {
        match self {
            Self::Default => {}
            Self::HighPerformance => {
                base.gesture_window.size = 3;
            }
            Self::HighAccuracy => {
                base.gesture_window.size = 7;
                base.cursor.smoothing = 0.2;
            }
            Self::Responsive => {
                base.gesture_window.size = 3;
                base.cursor.smoothing = 0.5;
                base.click.click_cooldown_s = 0.2;
            }
            Self::Smooth => {
                base.gesture_window.size = 7;
                base.cursor.smoothing = 0.2;
                base.cursor.movement_threshold_px = 1.0;
            }
        }
        base
    }
}

// ── Engine config ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub tracking: TrackingConfig,
    pub emote_window: WindowConfig,
    pub emote_hold: HoldConfig,
    pub gesture_window: WindowConfig,
    pub gesture_hold: HoldConfig,
    pub cursor: CursorConfig,
    pub click: ClickConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tracking: TrackingConfig::default(),
            emote_window: WindowConfig::default(),
            emote_hold: HoldConfig::default(),
            gesture_window: WindowConfig::gesture(),
            gesture_hold: HoldConfig::gesture(),
            cursor: CursorConfig::default(),
            click: ClickConfig::default(),
        }
    }
}

fn number(value: &Value, key: &str) -> anyhow::Result<f64> {
    get_float(value, key).ok_or_else(|| anyhow!(":{} expects a number", key))
}

fn count<T: TryFrom<i64>>(value: &Value, key: &str) -> anyhow::Result<T> {
    let n = get_int(value, key).ok_or_else(|| anyhow!(":{} expects an integer", key))?;
    T::try_from(n)
        .ok()
        .with_context(|| format!(":{} out of range: {}", key, n))
}

fn check(ok: bool, what: &str) -> anyhow::Result<()> {
    if ok {
        Ok(())
    } else {
        bail!("invalid config: {}", what)
    }
}

fn unit(v: f32) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}

fn seconds(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

impl EngineConfig {
    pub fn preset(preset: Preset) -> Self {
        preset.apply(Self::default())
    }

    /// Parse a plist override and apply it to `base`.  A `:preset` key is
    /// applied first, then the remaining keys in order.
    pub fn from_sexp(text: &str, base: EngineConfig) -> anyhow::Result<Self> {
        let value = lexpr::from_str(text).context("config is not a valid s-expression")?;
        if matches!(value, Value::Null | Value::Nil) {
            return Ok(base);
        }
        let keys = plist_keys(&value)
            .map_err(|i| anyhow!("config: expected a keyword at position {}", i))?;

        let mut cfg = match get_string(&value, "preset") {
            Some(name) => {
                let preset = Preset::from_str(&name)
                    .ok_or_else(|| anyhow!("unknown preset: {}", name))?;
                info!("config preset: {}", preset.as_str());
                preset.apply(base)
            }
            None => base,
        };

        for key in &keys {
            let k = key.as_str();
            match k {
                "preset" => {}
                "position-threshold" => cfg.tracking.position_threshold = number(&value, k)? as f32,
                "disappear-timeout" => cfg.tracking.disappear_timeout_s = number(&value, k)?,
                "center-smoothing" => cfg.tracking.center_smoothing = number(&value, k)? as f32,
                "emote-window-size" => cfg.emote_window.size = count(&value, k)?,
                "emote-activation-threshold" => {
                    cfg.emote_window.activation_threshold = number(&value, k)? as f32
                }
                "emote-consistency-threshold" => {
                    cfg.emote_window.consistency_threshold = number(&value, k)? as f32
                }
                "emote-hold-time" => cfg.emote_hold.hold_time_s = number(&value, k)?,
                "emote-cooldown" => cfg.emote_hold.cooldown_s = number(&value, k)?,
                "gesture-window-size" => cfg.gesture_window.size = count(&value, k)?,
                "gesture-activation-threshold" => {
                    cfg.gesture_window.activation_threshold = number(&value, k)? as f32
                }
                "gesture-consistency-threshold" => {
                    cfg.gesture_window.consistency_threshold = number(&value, k)? as f32
                }
                "screen-width" => cfg.cursor.screen_width = count(&value, k)?,
                "screen-height" => cfg.cursor.screen_height = count(&value, k)?,
                "tracking-zone-min" => cfg.cursor.zone_min = number(&value, k)? as f32,
                "tracking-zone-max" => cfg.cursor.zone_max = number(&value, k)? as f32,
                "mirror" => {
                    cfg.cursor.mirror = get_bool(&value, k)
                        .ok_or_else(|| anyhow!(":mirror expects t or nil"))?
                }
                "cursor-smoothing" => cfg.cursor.smoothing = number(&value, k)? as f32,
                "screen-margin" => cfg.cursor.margin_px = count(&value, k)?,
                "movement-threshold" => {
                    cfg.cursor.movement_threshold_px = number(&value, k)? as f32
                }
                "drag-after" => cfg.click.drag_after_s = number(&value, k)?,
                "click-cooldown" => cfg.click.click_cooldown_s = number(&value, k)?,
                other => bail!("unknown config key :{}", other),
            }
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and apply an override file.
    pub fn from_file(path: &std::path::Path, base: EngineConfig) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_sexp(&text, base).with_context(|| format!("in config {}", path.display()))
    }

    /// Reject out-of-range values.
    pub fn validate(&self) -> anyhow::Result<()> {
        let t = &self.tracking;
        check(
            t.position_threshold.is_finite() && t.position_threshold > 0.0,
            "position-threshold must be positive",
        )?;
        check(seconds(t.disappear_timeout_s), "disappear-timeout must be >= 0")?;
        check(
            unit(t.center_smoothing) && t.center_smoothing < 1.0,
            "center-smoothing must be in [0, 1)",
        )?;

        for (family, w) in [("emote", &self.emote_window), ("gesture", &self.gesture_window)] {
            check(
                (1..=MAX_WINDOW_SIZE).contains(&w.size),
                &format!("{}-window-size must be in [1, {}]", family, MAX_WINDOW_SIZE),
            )?;
            check(
                unit(w.activation_threshold),
                &format!("{}-activation-threshold must be in [0, 1]", family),
            )?;
            check(
                unit(w.consistency_threshold),
                &format!("{}-consistency-threshold must be in [0, 1]", family),
            )?;
        }
        for (family, h) in [("emote", &self.emote_hold), ("gesture", &self.gesture_hold)] {
            check(seconds(h.hold_time_s), &format!("{}-hold-time must be >= 0", family))?;
            check(seconds(h.cooldown_s), &format!("{}-cooldown must be >= 0", family))?;
        }

        let c = &self.cursor;
        check(c.screen_width > 0 && c.screen_height > 0, "screen size must be non-zero")?;
        check(
            unit(c.zone_min) && unit(c.zone_max) && c.zone_min < c.zone_max,
            "tracking zone must satisfy 0 <= min < max <= 1",
        )?;
        check(
            unit(c.smoothing) && c.smoothing > 0.0,
            "cursor-smoothing must be in (0, 1]",
        )?;
        check(
            c.margin_px.saturating_mul(2) < c.screen_width.min(c.screen_height),
            "screen-margin leaves no usable screen",
        )?;
        check(
            c.movement_threshold_px.is_finite() && c.movement_threshold_px >= 0.0,
            "movement-threshold must be >= 0",
        )?;

        check(
            self.click.drag_after_s.is_finite() && self.click.drag_after_s > 0.0,
            "drag-after must be positive",
        )?;
        check(seconds(self.click.click_cooldown_s), "click-cooldown must be >= 0")?;
        Ok(())
    }

    /// Render the effective configuration in override-file form.
    pub fn config_sexp(&self) -> String {
        format!(
            "(:position-threshold {:.3} :disappear-timeout {:.3} :center-smoothing {:.3} \
             :emote-window-size {} :emote-activation-threshold {:.3} :emote-consistency-threshold {:.3} \
             :emote-hold-time {:.3} :emote-cooldown {:.3} \
             :gesture-window-size {} :gesture-activation-threshold {:.3} :gesture-consistency-threshold {:.3} \
             :screen-width {} :screen-height {} :tracking-zone-min {:.3} :tracking-zone-max {:.3} \
             :mirror {} :cursor-smoothing {:.3} :screen-margin {} :movement-threshold {:.1} \
             :drag-after {:.3} :click-cooldown {:.3})",
            self.tracking.position_threshold,
            self.tracking.disappear_timeout_s,
            self.tracking.center_smoothing,
            self.emote_window.size,
            self.emote_window.activation_threshold,
            self.emote_window.consistency_threshold,
            self.emote_hold.hold_time_s,
            self.emote_hold.cooldown_s,
            self.gesture_window.size,
            self.gesture_window.activation_threshold,
            self.gesture_window.consistency_threshold,
            self.cursor.screen_width,
            self.cursor.screen_height,
            self.cursor.zone_min,
            self.cursor.zone_max,
            bool_sexp(self.cursor.mirror),
            self.cursor.smoothing,
            self.cursor.margin_px,
            self.cursor.movement_threshold_px,
            self.click.drag_after_s,
            self.click.click_cooldown_s,
        )
    }
}
