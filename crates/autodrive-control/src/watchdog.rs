//! [`StageWatchdog`] – stall detector for the running stage.
//!
//! A controller that never settles inside its deadband would otherwise hold
//! the sequencer forever.  The watchdog accumulates the control periods spent
//! in the current stage and reports [`StageHealth::TimedOut`] once they exceed
//! the configured limit.
//!
//! Time is the sum of the `dt` values the sequencer is driven with, not
//! wall-clock time, so a run replayed at a different speed times out on the
//! same cycle.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use autodrive_control::watchdog::{StageHealth, StageWatchdog};
//!
//! let mut wd = StageWatchdog::new(Some(Duration::from_millis(50)));
//! assert_eq!(wd.feed(Duration::from_millis(20)), StageHealth::Healthy);
//! assert_eq!(wd.feed(Duration::from_millis(20)), StageHealth::Healthy);
//! assert_eq!(wd.feed(Duration::from_millis(20)), StageHealth::TimedOut);
//! ```

use std::time::Duration;

/// Health of the stage being watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageHealth {
    Healthy,
    /// More time than the limit has been spent in this stage.
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct StageWatchdog {
    limit: Option<Duration>,
    elapsed: Duration,
}

impl StageWatchdog {
    /// `None` disables the timeout.
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            limit,
            elapsed: Duration::ZERO,
        }
    }

    /// Start watching a fresh stage.
    pub fn arm(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    /// Record `dt` spent in the current stage.
    pub fn feed(&mut self, dt: Duration) -> StageHealth {
        self.elapsed += dt;
        self.health()
    }

    /// `TimedOut` once the time fed since `arm` exceeds the limit.
    pub fn health(&self) -> StageHealth {
        match self.limit {
            Some(limit) if self.elapsed > limit => StageHealth::TimedOut,
            _ => StageHealth::Healthy,
        }
    }

    /// Time fed since the last `arm`.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }
}
