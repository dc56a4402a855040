//! Wall-clock [`Timer`] used for fixed-duration open-loop windows.

use std::time::{Duration, Instant};

/// A resettable stopwatch.
pub trait Timer: Send + Sync {
    /// Begin accumulating time.  No-op if already running.
    fn start(&mut self);

    /// Zero the accumulated time without changing the running state.
    fn reset(&mut self);

    /// Time accumulated since the last reset.
    fn elapsed(&self) -> Duration;
}

/// [`Timer`] backed by [`Instant`].
#[derive(Debug, Default)]
pub struct SystemTimer {
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl SystemTimer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Timer for SystemTimer {
    fn start(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        if self.running_since.is_some() {
            self.running_since = Some(Instant::now());
        }
    }

    fn elapsed(&self) -> Duration {
        self.accumulated
            + self
                .running_since
                .map(|since| since.elapsed())
                .unwrap_or_default()
    }
}
