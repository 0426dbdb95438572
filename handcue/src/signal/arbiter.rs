//! Emote arbitration: at most one emote trigger per frame.

use tracing::{debug, info};

use super::definition::{PoseContext, SignalDef};
use super::{SignalState, SignalStatus, TriggerEvent};

/// Runs every emote signal and picks at most one winner per frame.
#[derive(Debug)]
pub struct EmoteArbiter {
    signals: Vec<SignalState>,
}

impl EmoteArbiter {
    /// Declaration order is the tie-break order.
    pub fn new(defs: Vec<SignalDef>) -> Self {
        Self {
            signals: defs.into_iter().map(SignalState::new).collect(),
        }
    }

    pub fn signals(&self) -> &[SignalState] {
        &self.signals
    }

    pub fn get(&self, name: &str) -> Option<&SignalState> {
        self.signals.iter().find(|s| s.name() == name)
    }

    /// Whether any emote is mid-hold.
    pub fn any_holding(&self) -> bool {
        self.signals.iter().any(|s| s.hold.phase().is_holding())
    }

    /// Sample every signal and advance its hold machine.
    ///
    /// When one or more signals would fire this frame, the one with the
    /// highest consistency ratio fires (earliest declared on ties) and every
    /// other signal left holding is dropped back to IDLE.  Signals in
    /// cooldown are unaffected.
    pub fn update(&mut self, ctx: &PoseContext, now: f64) -> Option<TriggerEvent> {
        let active: Vec<bool> = self.signals.iter_mut().map(|s| s.sample(ctx)).collect();

        let mut winner: Option<usize> = None;
        for (i, s) in self.signals.iter().enumerate() {
            if !s.hold.ready(active[i], now) {
                continue;
            }
            let ratio = s.window.consistency_ratio();
            match winner {
                Some(w) if self.signals[w].window.consistency_ratio() >= ratio => {}
                _ => winner = Some(i),
            }
        }

        let Some(w) = winner else {
            for (s, &a) in self.signals.iter_mut().zip(&active) {
                s.hold.update(a, now);
            }
            return None;
        };

        let winner_name = self.signals[w].def.name.clone();
        for (i, s) in self.signals.iter_mut().enumerate() {
            if i == w {
                continue;
            }
            if s.hold.ready(active[i], now) {
                debug!("emote {} preempted by {}", s.def.name, winner_name);
                s.hold.force_idle();
                continue;
            }
            s.hold.update(active[i], now);
            if s.hold.phase().is_holding() {
                debug!("emote {} hold cancelled by arbitration", s.def.name);
                s.hold.force_idle();
            }
        }

        let s = &mut self.signals[w];
        if !s.hold.update(active[w], now) {
            return None;
        }
        info!(
            "emote fired: {} (ratio {:.2})",
            s.def.display,
            s.window.consistency_ratio()
        );
        Some(TriggerEvent::emote(&s.def.name, &s.def.display, now))
    }

    pub fn statuses(&self, now: f64) -> Vec<SignalStatus> {
        self.signals.iter().map(|s| s.status(now)).collect()
    }

    pub fn reset(&mut self) {
        for s in &mut self.signals {
            s.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::signal::hold::{HoldConfig, HoldPhase};

    fn frame_at(i: u32) -> f64 {
        i as f64 / 30.0
    }

    fn arbiter(names: &[&str]) -> EmoteArbiter {
        EmoteArbiter::new(names.iter().map(|n| SignalDef::external(n, n)).collect())
    }

    fn run(arb: &mut EmoteArbiter, conf: &HashMap<String, f32>, i: u32) -> Option<TriggerEvent> {
        let ctx = PoseContext {
            external: Some(conf),
            ..Default::default()
        };
        arb.update(&ctx, frame_at(i))
    }

    #[test]
    fn test_single_signal_fires_once() {
        let mut arb = arbiter(&["a"]);
        let conf = HashMap::from([("a".to_string(), 0.9)]);
        let fired: Vec<u32> = (0..=90).filter(|&i| run(&mut arb, &conf, i).is_some()).collect();
        // A partial window of positives is already consistent, so the hold
        // starts on frame 0.
        assert_eq!(fired, vec![45]);
    }

    #[test]
    fn test_two_ready_signals_one_winner() {
        let mut arb = arbiter(&["a", "b"]);
        let conf = HashMap::from([("a".to_string(), 0.9), ("b".to_string(), 0.9)]);
        let mut events = Vec::new();
        for i in 0..=60 {
            if let Some(e) = run(&mut arb, &conf, i) {
                events.push((i, e));
            }
        }
        assert_eq!(events.len(), 1);
        // Equal ratios: first declared wins.
        assert_eq!(events[0].1.signal, "a");
        let loser = arb.get("b").unwrap();
        assert!(!loser.hold.phase().is_cooldown());
    }

    #[test]
    fn test_higher_ratio_wins() {
        // Both hold from frame 0; "a" is declared first but dips every fifth
        // frame, so its ratio is 0.8 against 1.0 when both are ready.
        let mut arb = arbiter(&["a", "b"]);
        let mut fired = None;
        for i in 0..=60 {
            let a = if i % 5 == 4 { 0.0 } else { 0.9 };
            let conf = HashMap::from([("a".to_string(), a), ("b".to_string(), 0.9)]);
            if i == 44 {
                assert!(arb.get("a").unwrap().hold.phase().is_holding());
                assert!(arb.get("b").unwrap().hold.phase().is_holding());
            }
            if let Some(e) = run(&mut arb, &conf, i) {
                fired = Some((i, e.signal));
                break;
            }
        }
        assert_eq!(fired, Some((45, "b".to_string())));
        let a = arb.get("a").unwrap();
        assert!((a.window.consistency_ratio() - 0.8).abs() < 1e-6);
        assert_eq!(a.hold.phase(), HoldPhase::Idle);
        assert!(arb.get("b").unwrap().hold.phase().is_cooldown());
    }

    #[test]
    fn test_losers_forced_idle_not_cooldown() {
        let mut arb = EmoteArbiter::new(vec![
            SignalDef::external("fast", "Fast").with_hold(HoldConfig {
                hold_time_s: 0.5,
                ..HoldConfig::default()
            }),
            SignalDef::external("slow", "Slow"),
        ]);
        let conf = HashMap::from([("fast".to_string(), 0.9), ("slow".to_string(), 0.9)]);
        let mut fired_at = None;
        for i in 0..=30 {
            if run(&mut arb, &conf, i).is_some() {
                fired_at = Some(i);
                break;
            }
        }
        assert!(fired_at.is_some());
        assert!(arb.get("fast").unwrap().hold.phase().is_cooldown());
        assert_eq!(arb.get("slow").unwrap().hold.phase(), HoldPhase::Idle);
        assert!(!arb.any_holding());
    }

    #[test]
    fn test_inactive_signals_stay_idle() {
        let mut arb = arbiter(&["a", "b"]);
        let conf = HashMap::new();
        for i in 0..60 {
            assert!(run(&mut arb, &conf, i).is_none());
        }
        for st in arb.statuses(2.0) {
            assert_eq!(st.phase, HoldPhase::Idle);
            assert_eq!(st.ratio, 0.0);
        }
    }

    #[test]
    fn test_reset_clears_hold() {
        let mut arb = arbiter(&["a"]);
        let conf = HashMap::from([("a".to_string(), 0.9)]);
        for i in 0..10 {
            run(&mut arb, &conf, i);
        }
        assert!(arb.any_holding());
        arb.reset();
        assert!(!arb.any_holding());
        assert_eq!(arb.signals()[0].window.len(), 0);
    }
}
