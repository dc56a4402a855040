//! [`Controller`] interface and the [`Stage`] union stored in routines.

use std::time::Duration;

use autodrive_hal::HardwareRig;
use autodrive_types::{AutoError, LockState, StageKind};

use crate::distance::DistanceController;
use crate::heading::HeadingController;

/// A closed-loop motion segment driven one control cycle at a time.
pub trait Controller: Send {
    fn kind(&self) -> StageKind;

    /// Nominal target: ticks for distance stages, degrees for heading stages.
    fn target(&self) -> f64;

    fn lock(&self) -> LockState;

    /// Overwrite the lock state.  The sequencer uses this to acknowledge a
    /// release or to abort a stalled stage.
    fn set_lock(&mut self, lock: LockState);

    /// Output computed on the most recent cycle.
    fn output(&self) -> f64;

    /// Run one cycle: read the sensor, update the loop, and either command the
    /// drive or release.  Does nothing unless the lock state is
    /// [`LockState::Locked`].
    ///
    /// # Errors
    ///
    /// Propagates hardware faults from the drive command.
    fn execute(&mut self, rig: &mut HardwareRig, dt: Duration) -> Result<LockState, AutoError>;

    /// Back to [`LockState::Locked`] with a clean loop history.
    fn reset(&mut self);
}

/// One entry of a routine.
#[derive(Debug, Clone)]
pub enum Stage {
    Distance(DistanceController),
    Heading(HeadingController),
}

impl Stage {
    /// A straight drive of `ticks`.
    pub fn distance(ticks: f64) -> Result<Self, AutoError> {
        DistanceController::new(ticks).map(Stage::Distance)
    }

    /// A turn to `degrees`.
    pub fn heading(degrees: f64) -> Result<Self, AutoError> {
        HeadingController::new(degrees).map(Stage::Heading)
    }

    /// The wrapped controller.
    pub fn controller(&self) -> &dyn Controller {
        match self {
            Stage::Distance(c) => c,
            Stage::Heading(c) => c,
        }
    }

    pub fn controller_mut(&mut self) -> &mut dyn Controller {
        match self {
            Stage::Distance(c) => c,
            Stage::Heading(c) => c,
        }
    }

    /// Sensor this stage closes its loop on.
    pub fn kind(&self) -> StageKind {
        self.controller().kind()
    }

    /// Ticks or degrees, depending on [`Stage::kind`].
    pub fn target(&self) -> f64 {
        self.controller().target()
    }

    pub fn lock(&self) -> LockState {
        self.controller().lock()
    }

    pub fn set_lock(&mut self, lock: LockState) {
        self.controller_mut().set_lock(lock);
    }

    pub fn execute(&mut self, rig: &mut HardwareRig, dt: Duration) -> Result<LockState, AutoError> {
        self.controller_mut().execute(rig, dt)
    }

    pub fn reset(&mut self) {
        self.controller_mut().reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autodrive_hal::SimRobot;

    #[test]
    fn stage_dispatches_to_its_controller() {
        let sim = SimRobot::new();
        sim.set_angle(90.0);
        let mut rig = sim.rig();

        let mut turn = Stage::heading(90.0).unwrap();
        let drive = Stage::distance(1200.0).unwrap();
        assert_eq!(turn.kind(), StageKind::Heading);
        assert_eq!(drive.kind(), StageKind::Distance);
        assert_eq!(drive.target(), 1200.0);

        let lock = turn
            .execute(&mut rig, Duration::from_millis(20))
            .unwrap();
        assert_eq!(lock, LockState::Released);
        assert_eq!(turn.lock(), LockState::Released);
    }

    #[test]
    fn set_lock_and_reset_round_trip() {
        let mut stage = Stage::distance(400.0).unwrap();
        stage.set_lock(LockState::ReleasedAck);
        assert_eq!(stage.lock(), LockState::ReleasedAck);
        stage.reset();
        assert_eq!(stage.lock(), LockState::Locked);
    }

    #[test]
    fn invalid_target_propagates_from_constructor() {
        assert!(matches!(
            Stage::heading(0.0),
            Err(AutoError::InvalidTarget {
                kind: StageKind::Heading,
                ..
            })
        ));
    }
}
