//! Coarse-grained lifecycle notifications around playback sessions.
//!
//! The enclosing game listens for these to freeze player input for the
//! session's duration, switch camera rigs, and similar. Emission is
//! synchronous fan-out to a set of [`EventSink`]s. The playback loop is
//! single-threaded and frame-stepped, so there is no listener task; a sink
//! that needs to hand events to another thread uses [`ChannelSink`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Result as IoResult, Write};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// A session lifecycle notification.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// A session claimed the slot and is setting up.
    SessionStarted { session: Uuid, when: DateTime<Utc> },
    /// A session released the slot (natural end or forced teardown).
    SessionEnded { session: Uuid, when: DateTime<Utc> },
    /// Free-form diagnostic line.
    Diagnostic {
        scope: String,
        message: String,
        when: DateTime<Utc>,
    },
}

impl PlaybackEvent {
    pub fn session_started(session: Uuid) -> Self {
        Self::SessionStarted {
            session,
            when: Utc::now(),
        }
    }

    pub fn session_ended(session: Uuid) -> Self {
        Self::SessionEnded {
            session,
            when: Utc::now(),
        }
    }

    pub fn diagnostic(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Diagnostic {
            scope: scope.into(),
            message: message.into(),
            when: Utc::now(),
        }
    }
}

impl fmt::Display for PlaybackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionStarted { session, .. } => write!(f, "session {session} started"),
            Self::SessionEnded { session, .. } => write!(f, "session {session} ended"),
            Self::Diagnostic { scope, message, .. } => write!(f, "[{scope}] {message}"),
        }
    }
}

/// Abstraction over an output target that consumes lifecycle events.
pub trait EventSink: Send {
    fn handle(&mut self, event: &PlaybackEvent) -> IoResult<()>;
}

/// Synchronous fan-out to all registered sinks.
pub struct EventBus {
    sinks: Vec<Box<dyn EventSink>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_sink(StdOutSink::default())
    }
}

impl EventBus {
    pub fn with_sink<T>(sink: T) -> Self
    where
        T: EventSink + 'static,
    {
        Self {
            sinks: vec![Box::new(sink)],
        }
    }

    pub fn with_sinks(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    /// A bus with no sinks; events are dropped.
    #[must_use]
    pub fn disabled() -> Self {
        Self { sinks: vec![] }
    }

    pub fn add_sink<T: EventSink + 'static>(&mut self, sink: T) {
        self.sinks.push(Box::new(sink));
    }

    /// Hand one event to every sink. Sink failures are reported on the
    /// tracing channel and do not disturb playback.
    pub fn emit(&mut self, event: PlaybackEvent) {
        for sink in &mut self.sinks {
            if let Err(err) = sink.handle(&event) {
                tracing::debug!(%err, "event sink failed");
            }
        }
    }
}

/// Stdout sink, one line per event.
#[derive(Default)]
pub struct StdOutSink;

impl EventSink for StdOutSink {
    fn handle(&mut self, event: &PlaybackEvent) -> IoResult<()> {
        let mut handle = io::stdout();
        writeln!(handle, "{event}")?;
        handle.flush()
    }
}

/// In-memory sink for tests and snapshots. Clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<PlaybackEvent>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured events.
    #[must_use]
    pub fn snapshot(&self) -> Vec<PlaybackEvent> {
        self.entries.lock().expect("sink poisoned").clone()
    }

    pub fn clear(&self) {
        self.entries.lock().expect("sink poisoned").clear();
    }
}

impl EventSink for MemorySink {
    fn handle(&mut self, event: &PlaybackEvent) -> IoResult<()> {
        self.entries
            .lock()
            .expect("sink poisoned")
            .push(event.clone());
        Ok(())
    }
}

/// Channel sink for consumers on other threads (dashboards, input freezers).
pub struct ChannelSink {
    tx: flume::Sender<PlaybackEvent>,
}

impl ChannelSink {
    pub fn new(tx: flume::Sender<PlaybackEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn handle(&mut self, event: &PlaybackEvent) -> IoResult<()> {
        self.tx
            .send(event.clone())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "channel receiver dropped"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_captures_in_emission_order() {
        let sink = MemorySink::new();
        let mut bus = EventBus::with_sink(sink.clone());
        let id = Uuid::new_v4();
        bus.emit(PlaybackEvent::session_started(id));
        bus.emit(PlaybackEvent::session_ended(id));

        let events = sink.snapshot();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], PlaybackEvent::SessionStarted { .. }));
        assert!(matches!(events[1], PlaybackEvent::SessionEnded { .. }));
    }

    #[test]
    fn channel_sink_forwards_to_receiver() {
        let (tx, rx) = flume::unbounded();
        let mut bus = EventBus::with_sink(ChannelSink::new(tx));
        bus.emit(PlaybackEvent::diagnostic("setup", "input frozen"));
        let event = rx.try_recv().expect("event forwarded");
        assert!(matches!(event, PlaybackEvent::Diagnostic { .. }));
    }

    #[test]
    fn dropped_receiver_does_not_disturb_emission() {
        let (tx, rx) = flume::unbounded();
        drop(rx);
        let mut bus = EventBus::with_sink(ChannelSink::new(tx));
        bus.emit(PlaybackEvent::diagnostic("teardown", "input released"));
    }
}
