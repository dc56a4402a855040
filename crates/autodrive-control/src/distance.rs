//! [`DistanceController`] – straight-line drive held on the averaged encoder.
//!
//! The error is taken against twice the nominal target:
//! `error = 2·target − average_encoder`.  Gains are derived from the nominal
//! target, so this doubling is part of the effective loop gain and must not be
//! "simplified" away.
//!
//! While locked, each cycle commands `(forward = −output, turn = 0)`.  The
//! cycle `|output|` drops below [`DEADBAND`] the controller releases and sends
//! no command at all.

use std::time::Duration;

use autodrive_hal::HardwareRig;
use autodrive_types::{AutoError, DriveCommand, LockState, RobotIntent, StageKind};
use tracing::debug;

use crate::pid::{DEADBAND, PidGains, PidLoop};
use crate::stage::Controller;

#[derive(Debug, Clone)]
pub struct DistanceController {
    target: f64,
    pid: PidLoop,
    lock: LockState,
}

impl DistanceController {
    /// Create a controller that drives `target` ticks.
    ///
    /// # Errors
    ///
    /// [`AutoError::InvalidTarget`] when `target` is zero or not finite.
    pub fn new(target: f64) -> Result<Self, AutoError> {
        Ok(Self {
            target,
            pid: PidLoop::new(PidGains::for_distance(target)?),
            lock: LockState::Locked,
        })
    }

    /// Gains derived from the target.
    pub fn gains(&self) -> PidGains {
        self.pid.gains()
    }

    pub fn integral(&self) -> f64 {
        self.pid.integral()
    }

    pub fn previous_error(&self) -> f64 {
        self.pid.previous_error()
    }
}

impl Controller for DistanceController {
    fn kind(&self) -> StageKind {
        StageKind::Distance
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

        let measurement = rig.average_encoder();
        let error = 2.0 * self.target - measurement;
        let output = self.pid.update(error, dt.as_secs_f64());
        debug!(setpoint = self.target, measurement, error, output, "distance loop");

        if output.abs() < DEADBAND {
            self.lock = LockState::Released;
            return Ok(self.lock);
        }

        rig.dispatch(RobotIntent::Drive(DriveCommand::new(-output, 0.0)))?;
        Ok(self.lock)
    }

    fn reset(&mut self) {
        self.pid.reset();
        self.lock = LockState::Locked;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autodrive_hal::SimRobot;

    const TICK: Duration = Duration::from_millis(20);

    #[test]
    fn first_cycle_commands_negated_output() {
        let sim = SimRobot::new();
        sim.set_encoders(-50.0, 50.0);
        let mut rig = sim.rig();
        let mut ctl = DistanceController::new(100.0).unwrap();

        // avg = 50, error = 2 * 100 - 50 = 150, output = 0.007 * 150 = 1.05
        let lock = ctl.execute(&mut rig, TICK).unwrap();

        assert_eq!(lock, LockState::Locked);
        assert!((ctl.output() - 1.05).abs() < 1e-12);
        let cmd = sim.last_drive().expect("drive commanded");
        assert!((cmd.forward + 1.05).abs() < 1e-12);
        assert_eq!(cmd.turn, 0.0);
    }

    #[test]
    fn converged_measurement_releases_without_command() {
        let sim = SimRobot::new();
        sim.set_encoders(-200.0, 200.0);
        let mut rig = sim.rig();
        let mut ctl = DistanceController::new(100.0).unwrap();

        let lock = ctl.execute(&mut rig, TICK).unwrap();

        assert_eq!(lock, LockState::Released);
        assert!(sim.drive_log().is_empty());
    }

    #[test]
    fn released_controller_is_inert() {
        let sim = SimRobot::new();
        sim.set_encoders(-200.0, 200.0);
        let mut rig = sim.rig();
        let mut ctl = DistanceController::new(100.0).unwrap();
        ctl.execute(&mut rig, TICK).unwrap();

        // Far from target again, but a released stage never re-locks on its own.
        sim.set_encoders(0.0, 0.0);
        for _ in 0..5 {
            assert_eq!(ctl.execute(&mut rig, TICK).unwrap(), LockState::Released);
        }
        assert!(sim.drive_log().is_empty());
    }

    #[test]
    fn zero_period_is_skipped() {
        let sim = SimRobot::new();
        let mut rig = sim.rig();
        let mut ctl = DistanceController::new(100.0).unwrap();

        assert_eq!(ctl.execute(&mut rig, Duration::ZERO).unwrap(), LockState::Locked);
        assert_eq!(ctl.previous_error(), 0.0);
        assert!(sim.drive_log().is_empty());
    }

    #[test]
    fn reset_restores_locked_with_clean_history() {
        let sim = SimRobot::new();
        let mut rig = sim.rig();
        let mut ctl = DistanceController::new(300.0).unwrap();
        for _ in 0..10 {
            ctl.execute(&mut rig, TICK).unwrap();
            sim.advance(TICK);
        }
        assert!(ctl.integral() != 0.0);

        ctl.reset();
        assert_eq!(ctl.lock(), LockState::Locked);
        assert_eq!(ctl.integral(), 0.0);
        assert_eq!(ctl.previous_error(), 0.0);
    }

    #[test]
    fn drives_to_doubled_target_in_sim() {
        let sim = SimRobot::new();
        let mut rig = sim.rig();
        let mut ctl = DistanceController::new(500.0).unwrap();

        let mut cycles = 0;
        while ctl.execute(&mut rig, TICK).unwrap() == LockState::Locked {
            sim.advance(TICK);
            cycles += 1;
            assert!(cycles < 500, "distance loop failed to converge");
        }
        assert!((sim.average_encoder() - 1000.0).abs() < 100.0);
    }

    #[test]
    fn zero_target_is_rejected() {
        assert!(matches!(
            DistanceController::new(0.0),
            Err(AutoError::InvalidTarget {
                kind: StageKind::Distance,
                ..
            })
        ));
    }
}
