//! PID primitive shared by the distance and heading controllers.
//!
//! Gains are not tuned per stage: they are derived from the stage's target
//! magnitude at construction time, so a longer drive gets proportionally
//! softer gains.
//!
//! | Gain | Distance | Heading |
//! |------|----------|---------|
//! | P | `0.7 / t` | `0.7 / t` |
//! | I | `6 / t²` | `0` |
//! | D | `1 / (5·t²)` | `1 / (4·t²)` |
//!
//! The loop is driven with the measured period of each cycle.  The integral
//! accumulates `error · dt · 10`, which at the nominal 20 ms period is the
//! `0.2`-per-cycle weighting the gains were tuned against; the derivative is a
//! backward difference over `dt`.
//!
//! # Example
//!
//! ```rust
//! use autodrive_control::pid::{PidGains, PidLoop};
//!
//! let mut pid = PidLoop::new(PidGains::for_heading(90.0).unwrap());
//! let output = pid.update(90.0, 0.02); // first sample: proportional only
//! assert!((output - 0.7).abs() < 1e-12);
//! ```

use std::time::Duration;

use autodrive_types::{AutoError, StageKind};

/// `|output|` below this releases a stage.
pub const DEADBAND: f64 = 0.1;

/// Control period the gains were tuned at.
pub const NOMINAL_PERIOD: Duration = Duration::from_millis(20);

/// Integral weighting per second of elapsed period.
pub const INTEGRAL_RATE_SCALE: f64 = 10.0;

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl PidGains {
    /// Gains for a straight drive of `target` ticks.
    ///
    /// # Errors
    ///
    /// [`AutoError::InvalidTarget`] when `target` is zero or not finite.
    pub fn for_distance(target: f64) -> Result<Self, AutoError> {
        check_target(StageKind::Distance, target)?;
        Ok(Self {
            kp: 0.7 / target,
            ki: 6.0 / (target * target),
            kd: 1.0 / (5.0 * target * target),
        })
    }

    /// Gains for an in-place turn to `target` degrees.  The integral gain is
    /// always zero.
    ///
    /// # Errors
    ///
    /// [`AutoError::InvalidTarget`] when `target` is zero or not finite.
    pub fn for_heading(target: f64) -> Result<Self, AutoError> {
        check_target(StageKind::Heading, target)?;
        Ok(Self {
            kp: 0.7 / target,
            ki: 0.0,
            kd: 1.0 / (4.0 * target * target),
        })
    }
}

fn check_target(kind: StageKind, target: f64) -> Result<(), AutoError> {
    if target == 0.0 || !target.is_finite() {
        return Err(AutoError::InvalidTarget { kind, target });
    }
    Ok(())
}

/// Integral/derivative memory plus the latest output of one loop.
#[derive(Debug, Clone)]
pub struct PidLoop {
    gains: PidGains,
    integral: f64,
    previous_error: Option<f64>,
    output: f64,
}

impl PidLoop {
    /// A loop with no history.
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral: 0.0,
            previous_error: None,
            output: 0.0,
        }
    }

    /// Feed one error sample taken `dt` seconds after the previous one and
    /// return the new output.
    ///
    /// The first sample after construction or [`reset`][Self::reset] has no
    /// interval behind it: it only seeds the previous error, so the output is
    /// purely proportional.  A non-positive `dt` leaves the state untouched
    /// and returns the previous output.
    pub fn update(&mut self, error: f64, dt: f64) -> f64 {
        if dt <= 0.0 {
            return self.output;
        }

        let derivative = match self.previous_error {
            Some(previous) => {
                self.integral += error * dt * INTEGRAL_RATE_SCALE;
                (error - previous) / dt
            }
            None => 0.0,
        };
        self.previous_error = Some(error);

        self.output =
            self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative;
        self.output
    }

    /// Zero the integral, forget the previous error and clear the output.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.previous_error = None;
        self.output = 0.0;
    }

    /// Gains fixed at construction.
    pub fn gains(&self) -> PidGains {
        self.gains
    }

    /// Accumulated `error · dt · 10` since the last reset.
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Previous error, `0.0` before the first sample.
    pub fn previous_error(&self) -> f64 {
        self.previous_error.unwrap_or(0.0)
    }

    /// Output of the most recent update.
    pub fn output(&self) -> f64 {
        self.output
    }
}
