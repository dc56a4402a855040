//! [`HeadingController`] – in-place turn held on the gyro angle.
//!
//! `error = target − angle`.  While locked the turn channel carries the output,
//! negated for negative targets: the proportional gain `0.7 / target` already
//! carries the target's sign, so the flip keeps the turn direction pointed at
//! the target either way.

use std::time::Duration;

use autodrive_hal::HardwareRig;
use autodrive_types::{AutoError, DriveCommand, LockState, RobotIntent, StageKind};
use tracing::debug;

use crate::pid::{DEADBAND, PidGains, PidLoop};
use crate::stage::Controller;

#[derive(Debug, Clone)]
pub struct HeadingController {
    target: f64,
    pid: PidLoop,
    lock: LockState,
}

impl HeadingController {
    /// Create a controller that turns to `target` degrees.
    ///
    /// # Errors
    ///
    /// [`AutoError::InvalidTarget`] when `target` is zero or not finite.
    pub fn new(target: f64) -> Result<Self, AutoError> {
        Ok(Self {
            target,
            pid: PidLoop::new(PidGains::for_heading(target)?),
            lock: LockState::Locked,
        })
    }

    /// Gains derived from the target; `ki` is always zero.
    pub fn gains(&self) -> PidGains {
        self.pid.gains()
    }

    pub fn previous_error(&self) -> f64 {
        self.pid.previous_error()
    }

    pub fn integral(&self) -> f64 {
        self.pid.integral()
    }
}

impl Controller for HeadingController {
    fn kind(&self) -> StageKind {
        StageKind::Heading
    }

    fn target(&self) -> f64 {
        self.target
    }

    fn lock(&self) -> LockState {
        self.lock
    }

    fn set_lock(&mut self, lock: LockState) {
        self.lock = lock;
    }

    fn output(&self) -> f64 {
        self.pid.output()
    }

    fn execute(&mut self, rig: &mut HardwareRig, dt: Duration) -> Result<LockState, AutoError> {
        if self.lock != LockState::Locked || dt.is_zero() {
            return Ok(self.lock);
        }

        let angle = rig.angle();
        let error = self.target - angle;
        let output = self.pid.update(error, dt.as_secs_f64());
        debug!(setpoint = self.target, angle, error, output, "heading loop");

        if output.abs() < DEADBAND {
            self.lock = LockState::Released;
            return Ok(self.lock);
        }

        let turn = if self.target > 0.0 { output } else { -output };
        rig.dispatch(RobotIntent::Drive(DriveCommand::new(0.0, turn)))?;
        Ok(self.lock)
    }

    fn reset(&mut self) {
        self.pid.reset();
        self.lock = LockState::Locked;
    }
}
