//! Event sinks: where triggered events go once the engine has produced them.

use std::io::Write;

use tracing::warn;

use crate::engine::FrameSnapshot;
use crate::signal::{TriggerEvent, TriggerPayload};

/// Consumer of engine output.
pub trait EventSink {
    fn on_event(&mut self, event: &TriggerEvent);

    /// Called once per frame, before that frame's events.
    fn on_frame(&mut self, _frame: &FrameSnapshot) {}
}

/// Deliver one frame's output to a sink: the frame first, then its event.
pub fn dispatch<S: EventSink + ?Sized>(sink: &mut S, frame: &FrameSnapshot) {
    sink.on_frame(frame);
    if let Some(trigger) = &frame.trigger {
        sink.on_event(trigger);
    }
}

// ── Terminal ───────────────────────────────────────────────

/// Prints one line per emote trigger.  Write failures are logged, never
/// propagated.
#[derive(Debug)]
pub struct TerminalEmoteSink<W: Write> {
    out: W,
    pub printed: u64,
}

impl<W: Write> TerminalEmoteSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, printed: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl TerminalEmoteSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> EventSink for TerminalEmoteSink<W> {
    fn on_event(&mut self, event: &TriggerEvent) {
        let TriggerPayload::Emote { display } = &event.payload else {
            return;
        };
        let result = writeln!(
            self.out,
            "[{:>8.3}s] EMOTE {} ({})",
            event.timestamp_s, display, event.signal
        )
        .and_then(|_| self.out.flush());
        match result {
            Ok(()) => self.printed += 1,
            Err(e) => warn!("emote sink write failed: {}", e),
        }
    }
}

// ── Recording ──────────────────────────────────────────────

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<TriggerEvent>,
    pub frames: u64,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emotes(&self) -> impl Iterator<Item = &TriggerEvent> {
        self.events.iter().filter(|e| e.is_emote())
    }
}

impl EventSink for RecordingSink {
    fn on_event(&mut self, event: &TriggerEvent) {
        self.events.push(event.clone());
    }

    fn on_frame(&mut self, _frame: &FrameSnapshot) {
        self.frames += 1;
    }
}

// ── Router ─────────────────────────────────────────────────

/// Routes gesture events to `cursor` and emote events to `emote`.  Both
/// see every frame.
#[derive(Debug)]
pub struct EventRouter<C, E> {
    pub cursor: C,
    pub emote: E,
}

impl<C: EventSink, E: EventSink> EventRouter<C, E> {
    pub fn new(cursor: C, emote: E) -> Self {
        Self { cursor, emote }
    }
}

impl<C: EventSink, E: EventSink> EventSink for EventRouter<C, E> {
    fn on_event(&mut self, event: &TriggerEvent) {
        if event.is_emote() {
            self.emote.on_event(event);
        } else {
            self.cursor.on_event(event);
        }
    }

    fn on_frame(&mut self, frame: &FrameSnapshot) {
        self.cursor.on_frame(frame);
        self.emote.on_frame(frame);
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::signal::GestureTransition;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_terminal_prints_emotes_only() {
        let mut sink = TerminalEmoteSink::new(Vec::new());
        sink.on_event(&TriggerEvent::emote("wizard_67", "Wizard 67 🤷", 2.0));
        sink.on_event(&TriggerEvent::gesture(
            "gesture=closed",
            GestureTransition::Closed,
            0.0,
            2.1,
        ));
        assert_eq!(sink.printed, 1);
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("EMOTE Wizard 67 🤷 (wizard_67)"));
    }

    #[test]
    fn test_terminal_write_failure_is_swallowed() {
        let mut sink = TerminalEmoteSink::new(BrokenPipe);
        sink.on_event(&TriggerEvent::emote("a", "A", 0.0));
        assert_eq!(sink.printed, 0);
    }

    #[test]
    fn test_router_splits_by_family() {
        let mut router = EventRouter::new(RecordingSink::new(), RecordingSink::new());
        router.on_event(&TriggerEvent::emote("a", "A", 0.0));
        router.on_event(&TriggerEvent::gesture("g", GestureTransition::Opened, 0.1, 0.2));
        assert_eq!(router.emote.events.len(), 1);
        assert_eq!(router.cursor.events.len(), 1);
        assert!(!router.cursor.events[0].is_emote());
        assert_eq!(router.emote.emotes().count(), 1);
    }
}
