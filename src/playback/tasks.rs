//! Resumable presentation tasks.
//!
//! Every suspension point of the playback loop is an explicit task exposing
//! `step(dt) -> done?`, so the controller is schedulable from any loop
//! (engine tick, test harness, or headless runner) without depending on a
//! particular scheduler. Tasks launched together (the end-of-session fades)
//! are stepped together each tick and the owning phase completes when all of
//! them report done.

use std::time::Duration;

use crate::stage::Stage;
use crate::types::ScreenSide;

/// A suspended sub-sequence advanced once per tick.
pub trait PlaybackTask {
    /// Advance by `dt`. Returns `true` once the task has finished; stepping
    /// a finished task is a no-op.
    fn step(&mut self, dt: Duration, stage: &mut dyn Stage) -> bool;
}

/// Timed alpha interpolation over one side's combined fade channel.
#[derive(Debug)]
pub struct Fade {
    side: ScreenSide,
    from: f32,
    to: f32,
    duration: Duration,
    elapsed: Duration,
    done: bool,
}

impl Fade {
    #[must_use]
    pub fn new(side: ScreenSide, from: f32, to: f32, duration: Duration) -> Self {
        Self {
            side,
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
            done: false,
        }
    }

    #[must_use]
    pub fn fade_in(side: ScreenSide, duration: Duration) -> Self {
        Self::new(side, 0.0, 1.0, duration)
    }

    #[must_use]
    pub fn fade_out(side: ScreenSide, duration: Duration) -> Self {
        Self::new(side, 1.0, 0.0, duration)
    }
}

impl PlaybackTask for Fade {
    fn step(&mut self, dt: Duration, stage: &mut dyn Stage) -> bool {
        if self.done {
            return true;
        }
        self.elapsed += dt;
        let progress = if self.duration.is_zero() {
            1.0
        } else {
            (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
        };
        let alpha = self.from + (self.to - self.from) * progress;
        stage.set_side_alpha(self.side, alpha);
        self.done = progress >= 1.0;
        self.done
    }
}

/// Character-by-character text reveal with a fixed per-character delay.
#[derive(Debug)]
pub struct TextReveal {
    side: ScreenSide,
    chars: Vec<char>,
    shown: usize,
    interval: Duration,
    accumulated: Duration,
}

impl TextReveal {
    #[must_use]
    pub fn new(side: ScreenSide, text: &str, interval: Duration) -> Self {
        Self {
            side,
            chars: text.chars().collect(),
            shown: 0,
            interval,
            accumulated: Duration::ZERO,
        }
    }

    /// Complete the line immediately (continue pressed mid-reveal).
    pub fn finish(&mut self, stage: &mut dyn Stage) {
        self.shown = self.chars.len();
        stage.set_text(self.side, &self.prefix());
    }

    fn prefix(&self) -> String {
        self.chars[..self.shown].iter().collect()
    }
}

impl PlaybackTask for TextReveal {
    fn step(&mut self, dt: Duration, stage: &mut dyn Stage) -> bool {
        if self.shown >= self.chars.len() {
            return true;
        }
        self.accumulated += dt;
        let mut advanced = false;
        while self.accumulated >= self.interval && self.shown < self.chars.len() {
            self.accumulated -= self.interval;
            self.shown += 1;
            advanced = true;
        }
        if advanced {
            stage.set_text(self.side, &self.prefix());
        }
        self.shown >= self.chars.len()
    }
}

/// Fixed-length wait (the end-of-session hold after fade-out).
#[derive(Debug)]
pub struct FixedWait {
    remaining: Duration,
}

impl FixedWait {
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            remaining: duration,
        }
    }
}

impl PlaybackTask for FixedWait {
    fn step(&mut self, dt: Duration, _stage: &mut dyn Stage) -> bool {
        self.remaining = self.remaining.saturating_sub(dt);
        self.remaining.is_zero()
    }
}
