//! [`StageSequencer`] – runs a [`Routine`] one stage at a time.
//!
//! # Cycle contract
//!
//! Each call to [`StageSequencer::tick`] executes at most one stage: the
//! current one, which is always the first stage still [`LockState::Locked`].
//! Every earlier stage is `ReleasedAck`.
//!
//! The cycle a stage releases, the sequencer immediately
//!
//! 1. commands the drive to `(0, 0)` so the robot brakes between segments,
//! 2. resets the sensor the *next* stage closes its loop on (both encoders
//!    before a distance stage, the gyro before a heading stage),
//! 3. marks the finished stage `ReleasedAck` and moves the current-stage
//!    pointer forward.
//!
//! The next stage first executes on the following cycle.  When the final
//! stage releases it stays `Released`, the routine is complete, and every
//! later tick holds the drive at zero.
//!
//! A stage that stays locked past the stage timeout is marked
//! [`LockState::Aborted`], the tick returns [`AutoError::StageTimeout`], and
//! the routine is stopped: later ticks command a full stop.

use std::time::Duration;

use autodrive_hal::HardwareRig;
use autodrive_types::{AutoError, DriveCommand, LockState, RobotIntent, StageKind};
use tracing::{info, warn};

use crate::routine::{IntakePolicy, Routine};
use crate::watchdog::{StageHealth, StageWatchdog};

/// Where a routine is after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineStatus {
    /// `stage` is the one being executed.
    Running { stage: usize },
    /// The final stage has released.
    Complete,
    /// `stage` timed out.
    Aborted { stage: usize },
}

/// Runs one [`Routine`], one stage at a time, with lock hand-off between
/// stages.
pub struct StageSequencer {
    routine: Routine,
    status: RoutineStatus,
    watchdog: StageWatchdog,
    cycles: u64,
}

impl StageSequencer {
    /// Wrap `routine`, ready to run from its first stage.  `stage_timeout`
    /// bounds the time any single stage may stay locked; `None` disables it.
    pub fn new(routine: Routine, stage_timeout: Option<Duration>) -> Self {
        let mut sequencer = Self {
            routine,
            status: RoutineStatus::Running { stage: 0 },
            watchdog: StageWatchdog::new(stage_timeout),
            cycles: 0,
        };
        sequencer.reset();
        sequencer
    }

    /// Rewind to the first stage and relock every stage.
    ///
    /// Hardware is not touched; resetting sensors and the match timer at run
    /// start is the caller's job.
    pub fn reset(&mut self) {
        self.routine.reset();
        self.status = RoutineStatus::Running { stage: 0 };
        self.watchdog.arm();
        self.cycles = 0;
    }

    /// Advance the routine by one control cycle of length `dt`.
    ///
    /// # Errors
    ///
    /// - [`AutoError::StageTimeout`] on the cycle the current stage exceeds
    ///   the stage timeout.
    /// - [`AutoError::HardwareFault`] propagated from any driver call.
    pub fn tick(&mut self, rig: &mut HardwareRig, dt: Duration) -> Result<RoutineStatus, AutoError> {
        self.cycles += 1;
        match self.status {
            RoutineStatus::Running { stage } => self.run_stage(rig, stage, dt)?,
            RoutineStatus::Complete => rig.dispatch(RobotIntent::Drive(DriveCommand::ZERO))?,
            RoutineStatus::Aborted { .. } => rig.dispatch(RobotIntent::Stop)?,
        }
        self.drive_intake(rig)?;
        Ok(self.status)
    }

    fn run_stage(
        &mut self,
        rig: &mut HardwareRig,
        index: usize,
        dt: Duration,
    ) -> Result<(), AutoError> {
        let lock = self.routine.stages()[index].lock();
        match lock {
            LockState::Locked => {
                let lock = self.routine.stages_mut()[index].execute(rig, dt)?;
                match lock {
                    LockState::Released => self.hand_off(rig, index),
                    LockState::Locked => match self.watchdog.feed(dt) {
                        StageHealth::Healthy => Ok(()),
                        StageHealth::TimedOut => self.abort(rig, index),
                    },
                    LockState::ReleasedAck | LockState::Aborted => Ok(()),
                }
            }
            // Released outside `execute`; hand off now.
            LockState::Released => self.hand_off(rig, index),
            LockState::ReleasedAck => {
                self.advance_past(index);
                Ok(())
            }
            LockState::Aborted => {
                self.status = RoutineStatus::Aborted { stage: index };
                rig.dispatch(RobotIntent::Stop)
            }
        }
    }

    fn hand_off(&mut self, rig: &mut HardwareRig, index: usize) -> Result<(), AutoError> {
        rig.dispatch(RobotIntent::Drive(DriveCommand::ZERO))?;

        let next_kind = self.routine.stages().get(index + 1).map(|s| s.kind());
        match next_kind {
            Some(kind) => {
                let reset = match kind {
                    StageKind::Distance => RobotIntent::ResetEncoders,
                    StageKind::Heading => RobotIntent::ResetGyro,
                };
                rig.dispatch(reset)?;
                self.routine.stages_mut()[index].set_lock(LockState::ReleasedAck);
                info!(
                    routine = self.routine.name(),
                    stage = index,
                    next = %kind,
                    elapsed_ms = self.watchdog.elapsed().as_millis() as u64,
                    "stage released"
                );
                self.advance_past(index);
            }
            None => {
                info!(
                    routine = self.routine.name(),
                    cycles = self.cycles,
                    "routine complete"
                );
                self.status = RoutineStatus::Complete;
            }
        }
        Ok(())
    }

    fn advance_past(&mut self, index: usize) {
        self.status = if index + 1 < self.routine.len() {
            RoutineStatus::Running { stage: index + 1 }
        } else {
            RoutineStatus::Complete
        };
        self.watchdog.arm();
    }

    fn abort(&mut self, rig: &mut HardwareRig, index: usize) -> Result<(), AutoError> {
        let kind = self.routine.stages()[index].kind();
        let limit_ms = self
            .watchdog
            .limit()
            .map(|l| l.as_millis() as u64)
            .unwrap_or_default();
        warn!(
            routine = self.routine.name(),
            stage = index,
            %kind,
            limit_ms,
            "stage timed out; aborting routine"
        );

        self.routine.stages_mut()[index].set_lock(LockState::Aborted);
        self.status = RoutineStatus::Aborted { stage: index };
        rig.dispatch(RobotIntent::Stop)?;
        Err(AutoError::StageTimeout {
            stage: index,
            kind,
            limit_ms,
        })
    }

    fn drive_intake(&self, rig: &mut HardwareRig) -> Result<(), AutoError> {
        let final_stage = self.routine.len() - 1;
        let on_final = match self.status {
            RoutineStatus::Running { stage } => stage == final_stage,
            RoutineStatus::Complete => true,
            RoutineStatus::Aborted { .. } => return Ok(()),
        };

        let elapsed = rig.elapsed();
        let power = match self.routine.intake() {
            IntakePolicy::None => None,
            IntakePolicy::Pickup { power, window } if on_final => {
                Some(if elapsed < window { power } else { 0.0 })
            }
            IntakePolicy::Pickup { .. } => None,
            IntakePolicy::AfterDelay { power, delay } => {
                let released = self.status == RoutineStatus::Complete;
                (released || elapsed > delay).then_some(power)
            }
        };

        match power {
            Some(power) => rig.dispatch(RobotIntent::SetRoller { power }),
            None => Ok(()),
        }
    }

    /// Status after the most recent tick.
    pub fn status(&self) -> RoutineStatus {
        self.status
    }

    /// Index of the stage being executed, `None` once complete or aborted.
    pub fn current_stage(&self) -> Option<usize> {
        match self.status {
            RoutineStatus::Running { stage } => Some(stage),
            _ => None,
        }
    }

    /// The routine being run.
    pub fn routine(&self) -> &Routine {
        &self.routine
    }

    /// Lock state of every stage, in order.
    pub fn lock_states(&self) -> Vec<LockState> {
        self.routine.lock_states()
    }

    /// Ticks since the last reset.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routine::{IntakePolicy, Routine};
    use crate::stage::Stage;
    use autodrive_hal::SimRobot;

    const TICK: Duration = Duration::from_millis(20);

    /// D 100, H 45, D 100, H 45, D 100
    fn five_stage(intake: IntakePolicy) -> Routine {
        Routine::new(
            "test-five",
            vec![
                Stage::distance(100.0).unwrap(),
                Stage::heading(45.0).unwrap(),
                Stage::distance(100.0).unwrap(),
                Stage::heading(45.0).unwrap(),
                Stage::distance(100.0).unwrap(),
            ],
            intake,
        )
        .unwrap()
    }

    /// Sensors read the converged value for every stage of [`five_stage`].
    fn pin_converged(sim: &SimRobot) {
        sim.set_encoders(-200.0, 200.0);
        sim.set_angle(45.0);
    }

    #[test]
    fn one_call_stages_finish_in_five_cycles() {
        let sim = SimRobot::new();
        let mut rig = sim.rig();
        let mut seq = StageSequencer::new(five_stage(IntakePolicy::None), None);

        for cycle in 0..5 {
            pin_converged(&sim);
            let status = seq.tick(&mut rig, TICK).unwrap();
            if cycle < 4 {
                assert_eq!(status, RoutineStatus::Running { stage: cycle + 1 });
            } else {
                assert_eq!(status, RoutineStatus::Complete);
            }
        }

        use LockState::{Released, ReleasedAck};
        assert_eq!(
            seq.lock_states(),
            vec![ReleasedAck, ReleasedAck, ReleasedAck, ReleasedAck, Released]
        );
        assert_eq!(sim.encoder_resets(), (2, 2));
        assert_eq!(sim.gyro_resets(), 2);
        assert_eq!(sim.last_drive(), Some(DriveCommand::ZERO));
    }

    #[test]
    fn at_most_one_stage_executes_per_cycle() {
        let sim = SimRobot::new();
        let mut rig = sim.rig();
        let mut seq = StageSequencer::new(five_stage(IntakePolicy::None), None);

        for _ in 0..5 {
            pin_converged(&sim);
            let before = seq.lock_states();
            seq.tick(&mut rig, TICK).unwrap();
            let after = seq.lock_states();

            let changed = before
                .iter()
                .zip(&after)
                .filter(|(b, a)| *b == &LockState::Locked && *a != &LockState::Locked)
                .count();
            assert!(changed <= 1);

            // Everything before the first locked stage is finished.
            if let Some(first_locked) = after.iter().position(|l| *l == LockState::Locked) {
                assert!(after[..first_locked].iter().all(|l| l.is_finished()));
                assert!(after[first_locked..].iter().all(|l| *l == LockState::Locked));
            }
        }
    }

    #[test]
    fn next_stage_waits_one_cycle_after_release() {
        let sim = SimRobot::new();
        let mut rig = sim.rig();
        let mut seq = StageSequencer::new(five_stage(IntakePolicy::None), None);

        // Stage 0 converged, the gyro reads far from 45.
        sim.set_encoders(-200.0, 200.0);
        sim.set_angle(0.0);
        seq.tick(&mut rig, TICK).unwrap();

        // Released stage 0 braked and reset the gyro, nothing else ran.
        assert_eq!(sim.drive_log(), vec![DriveCommand::ZERO]);
        assert_eq!(sim.gyro_resets(), 1);
        assert_eq!(seq.current_stage(), Some(1));

        // Stage 1 now turns.
        seq.tick(&mut rig, TICK).unwrap();
        let cmd = sim.last_drive().unwrap();
        assert_eq!(cmd.forward, 0.0);
        assert!(cmd.turn > 0.0);
    }

    #[test]
    fn complete_routine_holds_zero() {
        let sim = SimRobot::new();
        let mut rig = sim.rig();
        let routine = Routine::new(
            "single",
            vec![Stage::distance(100.0).unwrap()],
            IntakePolicy::None,
        )
        .unwrap();
        let mut seq = StageSequencer::new(routine, None);

        sim.set_encoders(-200.0, 200.0);
        assert_eq!(seq.tick(&mut rig, TICK).unwrap(), RoutineStatus::Complete);
        let before = sim.drive_log().len();

        for _ in 0..3 {
            assert_eq!(seq.tick(&mut rig, TICK).unwrap(), RoutineStatus::Complete);
        }
        let log = sim.drive_log();
        assert_eq!(log.len(), before + 3);
        assert!(log.iter().all(|c| *c == DriveCommand::ZERO));
        assert_eq!(seq.lock_states(), vec![LockState::Released]);
    }

    #[test]
    fn stalled_stage_times_out_and_stops() {
        let sim = SimRobot::new();
        let mut rig = sim.rig();
        rig.dispatch(RobotIntent::SetRoller { power: 1.0 }).unwrap();
        let mut seq = StageSequencer::new(
            five_stage(IntakePolicy::None),
            Some(Duration::from_millis(100)),
        );

        // The plant never moves, so stage 0 never settles.
        for _ in 0..5 {
            assert_eq!(
                seq.tick(&mut rig, TICK).unwrap(),
                RoutineStatus::Running { stage: 0 }
            );
        }
        assert_eq!(
            seq.tick(&mut rig, TICK),
            Err(AutoError::StageTimeout {
                stage: 0,
                kind: StageKind::Distance,
                limit_ms: 100
            })
        );
        assert_eq!(seq.status(), RoutineStatus::Aborted { stage: 0 });
        assert_eq!(seq.lock_states()[0], LockState::Aborted);
        assert_eq!(sim.last_drive(), Some(DriveCommand::ZERO));
        assert_eq!(sim.roller_power(), 0.0);

        // Later ticks keep the robot stopped without erroring again.
        assert_eq!(
            seq.tick(&mut rig, TICK).unwrap(),
            RoutineStatus::Aborted { stage: 0 }
        );
    }

    #[test]
    fn pickup_roller_runs_on_final_stage_until_window_closes() {
        let sim = SimRobot::new();
        let mut rig = sim.rig();
        rig.restart_timer();
        let intake = IntakePolicy::Pickup {
            power: 1.0,
            window: Duration::from_millis(200),
        };
        let mut seq = StageSequencer::new(five_stage(intake), None);

        // Stages 0..=3 release; roller untouched until the final stage.
        for _ in 0..4 {
            pin_converged(&sim);
            seq.tick(&mut rig, TICK).unwrap();
            sim.advance(TICK);
        }
        assert_eq!(seq.current_stage(), Some(4));
        assert_eq!(sim.roller_power(), 1.0);

        // Complete and still inside the window.
        pin_converged(&sim);
        seq.tick(&mut rig, TICK).unwrap();
        assert_eq!(seq.status(), RoutineStatus::Complete);
        assert_eq!(sim.roller_power(), 1.0);

        sim.advance(Duration::from_millis(200));
        seq.tick(&mut rig, TICK).unwrap();
        assert_eq!(sim.roller_power(), 0.0);
    }

    #[test]
    fn after_delay_roller_starts_on_timer() {
        let sim = SimRobot::new();
        let mut rig = sim.rig();
        rig.restart_timer();
        let routine = Routine::new(
            "straight",
            vec![Stage::distance(5000.0).unwrap()],
            IntakePolicy::AfterDelay {
                power: 1.0,
                delay: Duration::from_millis(100),
            },
        )
        .unwrap();
        let mut seq = StageSequencer::new(routine, None);

        seq.tick(&mut rig, TICK).unwrap();
        assert_eq!(sim.roller_power(), 0.0);

        sim.advance(Duration::from_millis(120));
        seq.tick(&mut rig, TICK).unwrap();
        assert_eq!(seq.status(), RoutineStatus::Running { stage: 0 });
        assert_eq!(sim.roller_power(), 1.0);
    }

    #[test]
    fn reset_relocks_every_stage() {
        let sim = SimRobot::new();
        let mut rig = sim.rig();
        let mut seq = StageSequencer::new(five_stage(IntakePolicy::None), None);
        for _ in 0..3 {
            pin_converged(&sim);
            seq.tick(&mut rig, TICK).unwrap();
        }
        assert_eq!(seq.current_stage(), Some(3));

        seq.reset();
        assert_eq!(seq.current_stage(), Some(0));
        assert_eq!(seq.cycles(), 0);
        assert!(seq.lock_states().iter().all(|l| *l == LockState::Locked));
    }
}
