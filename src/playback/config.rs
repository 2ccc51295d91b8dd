//! Playback pacing configuration.

use std::time::Duration;

/// Timing knobs for text reveal and fades.
///
/// The end-of-session hold reuses `fade_duration`: after the parallel
/// fade-out, the session waits one more fade length before tearing down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Delay between revealed characters.
    pub reveal_interval: Duration,
    /// Length of every first-appearance fade-in and end-of-session fade-out.
    pub fade_duration: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            reveal_interval: Duration::from_millis(25),
            fade_duration: Duration::from_millis(300),
        }
    }
}

impl PlaybackConfig {
    /// Load defaults, overridden by `TALEFLOW_REVEAL_INTERVAL_MS` and
    /// `TALEFLOW_FADE_DURATION_MS` when set (a `.env` file is honored).
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Self {
            reveal_interval: env_millis("TALEFLOW_REVEAL_INTERVAL_MS")
                .unwrap_or(defaults.reveal_interval),
            fade_duration: env_millis("TALEFLOW_FADE_DURATION_MS")
                .unwrap_or(defaults.fade_duration),
        }
    }

    #[must_use]
    pub fn with_reveal_interval(mut self, interval: Duration) -> Self {
        self.reveal_interval = interval;
        self
    }

    #[must_use]
    pub fn with_fade_duration(mut self, duration: Duration) -> Self {
        self.fade_duration = duration;
        self
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}
