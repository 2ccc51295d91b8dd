//! Session lifecycle and the frame-stepped playback loop.
//!
//! A [`PlaybackController`] wraps one [`Engine`] per session and owns every
//! suspension point: the per-side first-appearance fade-in, the
//! character-by-character text reveal, the wait-for-continue gate, and the
//! parallel end-of-session fade-out. The external scheduler calls
//! [`PlaybackController::tick`] once per frame with the elapsed time;
//! everything in between is cooperative and single-threaded.
//!
//! Only one session may run at a time. The guard is a [`SessionSlot`]:
//! production code shares [`SessionSlot::global`] (process-wide, per the
//! single-active-session rule), tests construct private slots. A second
//! `start_session` while the slot is occupied fails fast with a warning and
//! touches nothing.
//!
//! Cleanup is idempotent and runs on both natural completion and forced
//! teardown (`Drop`); it releases the stage, vacates the slot, and emits the
//! session-ended notification exactly once.

pub mod config;
pub mod tasks;

pub use config::PlaybackConfig;
pub use tasks::{Fade, FixedWait, PlaybackTask, TextReveal};

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::{DialogueLine, Engine, EngineStep};
use crate::events::{EventBus, PlaybackEvent};
use crate::graph::SequenceGraph;
use crate::providers::ProviderRegistry;
use crate::stage::Stage;
use crate::triggers::TriggerRegistry;
use crate::types::ScreenSide;

/// The single-active-session guard.
///
/// Claiming stores the session id; release only vacates when the id matches,
/// so a stale double-release can never evict a newer session.
#[derive(Clone, Default)]
pub struct SessionSlot {
    inner: Arc<Mutex<Option<Uuid>>>,
}

impl SessionSlot {
    /// A fresh, private slot (used by tests and embedded tools).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide slot production sessions share.
    #[must_use]
    pub fn global() -> Self {
        static GLOBAL: OnceLock<SessionSlot> = OnceLock::new();
        GLOBAL.get_or_init(SessionSlot::new).clone()
    }

    /// Attempt to claim the slot for `session`. No side effects on failure.
    #[must_use]
    pub fn try_claim(&self, session: Uuid) -> bool {
        let mut slot = self.inner.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(session);
        true
    }

    /// Vacate the slot if `session` holds it.
    pub fn release(&self, session: Uuid) {
        let mut slot = self.inner.lock();
        if *slot == Some(session) {
            *slot = None;
        }
    }

    #[must_use]
    pub fn occupied(&self) -> bool {
        self.inner.lock().is_some()
    }
}

/// Where the active session currently is within its frame-stepped loop.
enum Phase {
    /// Ask the engine for the next suspension point.
    Advance,
    /// First appearance of a side: fade its widgets in, then reveal.
    FadeIn { fades: Vec<Fade>, line: DialogueLine },
    /// Character-by-character reveal, interruptible by the continue signal.
    Reveal(TextReveal),
    /// One-shot gate: wait until the continue signal is raised again.
    AwaitContinue,
    /// Graph finished: all ever-shown sides fade out in parallel.
    FadeOut { fades: Vec<Fade> },
    /// Fixed hold matching the fade duration, then teardown.
    Hold(FixedWait),
}

struct Session {
    id: Uuid,
    engine: Engine,
    phase: Phase,
    shown_sides: FxHashSet<ScreenSide>,
}

/// Owns session lifecycle and presentation sequencing over a [`Stage`].
pub struct PlaybackController<S: Stage> {
    stage: S,
    config: PlaybackConfig,
    triggers: Arc<TriggerRegistry>,
    providers: Arc<ProviderRegistry>,
    events: EventBus,
    slot: SessionSlot,
    session: Option<Session>,
    /// Id of the session currently holding resources; survives the Session
    /// struct so setup failures and teardown share one cleanup path.
    active: Option<Uuid>,
    stage_held: bool,
    continue_requested: bool,
}

impl<S: Stage> PlaybackController<S> {
    #[must_use]
    pub fn new(
        stage: S,
        triggers: Arc<TriggerRegistry>,
        providers: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            stage,
            config: PlaybackConfig::default(),
            triggers,
            providers,
            events: EventBus::disabled(),
            slot: SessionSlot::global(),
            session: None,
            active: None,
            stage_held: false,
            continue_requested: false,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Use a private guard instead of the process-wide one.
    #[must_use]
    pub fn with_slot(mut self, slot: SessionSlot) -> Self {
        self.slot = slot;
        self
    }

    /// Begin playback of `graph`.
    ///
    /// Returns `false`, with no side effects beyond a log line, when
    /// another session is active, and after running cleanup when stage setup
    /// fails. This boolean is the only failure surface callers see;
    /// mid-session problems self-terminate the session instead.
    pub fn start_session(&mut self, graph: Arc<SequenceGraph>) -> bool {
        let id = Uuid::new_v4();
        if !self.slot.try_claim(id) {
            warn!("playback session already active; start rejected");
            return false;
        }
        self.active = Some(id);
        self.events.emit(PlaybackEvent::session_started(id));
        info!(session = %id, "playback session started");

        if let Err(err) = self.stage.acquire() {
            error!(session = %id, %err, "stage setup failed; aborting session");
            return self.cleanup();
        }
        self.stage_held = true;

        self.session = Some(Session {
            id,
            engine: Engine::new(graph, self.triggers.clone(), self.providers.clone()),
            phase: Phase::Advance,
            shown_sides: FxHashSet::default(),
        });
        self.continue_requested = false;
        true
    }

    /// External input edge: advances the wait-for-continue gate and
    /// short-circuits an in-flight text reveal.
    pub fn signal_continue(&mut self, pressed: bool) {
        self.continue_requested = pressed;
    }

    /// `true` while a session is running (including its teardown fades).
    #[must_use]
    pub fn session_active(&self) -> bool {
        self.session.is_some()
    }

    /// The active session's engine, for inspection.
    #[must_use]
    pub fn engine(&self) -> Option<&Engine> {
        self.session.as_ref().map(|session| &session.engine)
    }

    /// Advance the active session by one frame of `dt`. A controller with no
    /// session ignores ticks.
    pub fn tick(&mut self, dt: Duration) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        let mut ended = false;
        session.phase = match std::mem::replace(&mut session.phase, Phase::Advance) {
            Phase::Advance => match session.engine.advance() {
                EngineStep::Line(line) => self.enter_line(&mut session, line),
                EngineStep::Finished => {
                    if session.shown_sides.is_empty() {
                        ended = true;
                        Phase::Advance
                    } else {
                        let fades = session
                            .shown_sides
                            .iter()
                            .map(|&side| Fade::fade_out(side, self.config.fade_duration))
                            .collect();
                        Phase::FadeOut { fades }
                    }
                }
            },
            Phase::FadeIn { mut fades, line } => {
                if step_all(&mut fades, dt, &mut self.stage) {
                    Phase::Reveal(TextReveal::new(
                        line.side,
                        &line.text,
                        self.config.reveal_interval,
                    ))
                } else {
                    Phase::FadeIn { fades, line }
                }
            }
            Phase::Reveal(mut reveal) => {
                if self.continue_requested {
                    // Interrupt: complete the line at once, consume the press.
                    reveal.finish(&mut self.stage);
                    self.continue_requested = false;
                    Phase::AwaitContinue
                } else if reveal.step(dt, &mut self.stage) {
                    // Gate entry resets the advance flag: a held button does
                    // not skip the wait.
                    self.continue_requested = false;
                    Phase::AwaitContinue
                } else {
                    Phase::Reveal(reveal)
                }
            }
            Phase::AwaitContinue => {
                if self.continue_requested {
                    self.continue_requested = false;
                    Phase::Advance
                } else {
                    Phase::AwaitContinue
                }
            }
            Phase::FadeOut { mut fades } => {
                if step_all(&mut fades, dt, &mut self.stage) {
                    Phase::Hold(FixedWait::new(self.config.fade_duration))
                } else {
                    Phase::FadeOut { fades }
                }
            }
            Phase::Hold(mut wait) => {
                if wait.step(dt, &mut self.stage) {
                    ended = true;
                }
                Phase::Hold(wait)
            }
        };

        if ended {
            self.cleanup();
        } else {
            self.session = Some(session);
        }
    }

    fn enter_line(&mut self, session: &mut Session, line: DialogueLine) -> Phase {
        let first_appearance = session.shown_sides.insert(line.side);
        self.stage.show_actor(line.side, &line.speaker, &line.pose);
        self.stage.set_text(line.side, "");
        if first_appearance {
            self.stage.set_side_alpha(line.side, 0.0);
            let fades = vec![Fade::fade_in(line.side, self.config.fade_duration)];
            Phase::FadeIn { fades, line }
        } else {
            Phase::Reveal(TextReveal::new(
                line.side,
                &line.text,
                self.config.reveal_interval,
            ))
        }
    }

    /// Release all session-owned resources and vacate the slot.
    ///
    /// Idempotent: safe to call from natural completion, setup failure, and
    /// `Drop` in any order. The `false` return is a sentinel that
    /// setup-failure paths hand upward; it never signals a cleanup problem.
    pub fn cleanup(&mut self) -> bool {
        if let Some(id) = self.active.take() {
            if self.stage_held {
                for side in ScreenSide::ALL {
                    self.stage.clear_side(side);
                }
                self.stage.release();
                self.stage_held = false;
            }
            self.slot.release(id);
            self.session = None;
            self.continue_requested = false;
            self.events.emit(PlaybackEvent::session_ended(id));
            info!(session = %id, "playback session ended");
        }
        false
    }
}

impl<S: Stage> Drop for PlaybackController<S> {
    fn drop(&mut self) {
        // Forced teardown routes through the same path as natural completion.
        self.cleanup();
    }
}

fn step_all(fades: &mut [Fade], dt: Duration, stage: &mut dyn Stage) -> bool {
    let mut all_done = true;
    for fade in fades.iter_mut() {
        if !fade.step(dt, stage) {
            all_done = false;
        }
    }
    all_done
}
