//! [`Autonomous`] – the supervisor that owns every routine and runs the one
//! chosen for this match.
//!
//! ```text
//!  begin(selection)          tick(dt) every control period
//!  ───────────────           ──────────────────────────────
//!  drive (0, 0)              Idle          → drive (0, 0)
//!  reset gyro                TimedReverse  → (−power, 0) until the reverse
//!  reset encoders                             duration elapses, then (0, 0)
//!  restart timer             routine plans → StageSequencer::tick
//!  relock every stage
//!  resolve the plan once
//! ```
//!
//! The plan is resolved from the [`Selection`] exactly once per `begin` and
//! never re-read mid-run.  Calling `begin` again is the only way to cancel a
//! run in progress.

use std::time::Duration;

use autodrive_hal::HardwareRig;
use autodrive_types::{AutoError, DriveCommand, PlanKind, RobotIntent, Selection, StageReport};
use tracing::info;

use crate::routine::{Routine, RoutineParams};
use crate::sequencer::{RoutineStatus, StageSequencer};

/// Tunables for the autonomous period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutonomousConfig {
    /// Longest a single stage may stay locked; `None` disables the escape.
    pub stage_timeout: Option<Duration>,
    /// How long the timed-reverse plan backs up.
    pub reverse_duration: Duration,
    /// Magnitude of the timed-reverse forward command.
    pub reverse_power: f64,
    pub params: RoutineParams,
}

impl Default for AutonomousConfig {
    fn default() -> Self {
        Self {
            stage_timeout: Some(Duration::from_secs(6)),
            reverse_duration: Duration::from_secs(3),
            reverse_power: 0.5,
            params: RoutineParams::default(),
        }
    }
}

/// Owns the stock routines and runs the one selected at `begin`.
pub struct Autonomous {
    config: AutonomousConfig,
    selection: Selection,
    plan: PlanKind,
    right_center: StageSequencer,
    left_center: StageSequencer,
    straight_pickup: StageSequencer,
    auto_line: StageSequencer,
}

impl Autonomous {
    /// Build every stock routine up front.  Until [`Autonomous::begin`] is
    /// called the plan is [`PlanKind::Idle`].
    ///
    /// # Errors
    ///
    /// [`AutoError::InvalidTarget`] when `config.params` yield an unusable
    /// distance.
    pub fn new(config: AutonomousConfig) -> Result<Self, AutoError> {
        Ok(Self {
            right_center: sequencer(PlanKind::RightCenter, &config)?,
            left_center: sequencer(PlanKind::LeftCenter, &config)?,
            straight_pickup: sequencer(PlanKind::StraightPickup, &config)?,
            auto_line: sequencer(PlanKind::AutoLine, &config)?,
            config,
            selection: Selection::default(),
            plan: PlanKind::Idle,
        })
    }

    /// Start a run: relock every routine, put the hardware in a known state
    /// and resolve `selection` to the plan for this run.
    ///
    /// Any run in progress is cancelled before the hardware is touched, so a
    /// failed reset leaves the supervisor idle rather than still driving.
    ///
    /// # Errors
    ///
    /// Propagates hardware faults from the resets.
    pub fn begin(
        &mut self,
        selection: Selection,
        rig: &mut HardwareRig,
    ) -> Result<PlanKind, AutoError> {
        self.plan = PlanKind::Idle;
        for seq in [
            &mut self.right_center,
            &mut self.left_center,
            &mut self.straight_pickup,
            &mut self.auto_line,
        ] {
            seq.reset();
        }

        rig.dispatch(RobotIntent::Drive(DriveCommand::ZERO))?;
        rig.dispatch(RobotIntent::ResetGyro)?;
        rig.dispatch(RobotIntent::ResetEncoders)?;
        rig.restart_timer();

        self.selection = selection;
        self.plan = selection.plan();
        info!(
            position = %selection.position,
            alliance = ?selection.alliance,
            plan = %self.plan,
            "autonomous plan selected"
        );
        Ok(self.plan)
    }

    /// Run one control cycle of the active plan.
    ///
    /// # Errors
    ///
    /// [`AutoError::StageTimeout`] from a stalled stage, or a hardware fault.
    pub fn tick(&mut self, rig: &mut HardwareRig, dt: Duration) -> Result<RoutineStatus, AutoError> {
        match self.plan {
            PlanKind::Idle => {
                rig.dispatch(RobotIntent::Drive(DriveCommand::ZERO))?;
                Ok(RoutineStatus::Complete)
            }
            PlanKind::TimedReverse => {
                if rig.elapsed() < self.config.reverse_duration {
                    let back = DriveCommand::new(-self.config.reverse_power, 0.0);
                    rig.dispatch(RobotIntent::Drive(back))?;
                    Ok(RoutineStatus::Running { stage: 0 })
                } else {
                    rig.dispatch(RobotIntent::Drive(DriveCommand::ZERO))?;
                    Ok(RoutineStatus::Complete)
                }
            }
            _ => match self.active_mut() {
                Some(seq) => seq.tick(rig, dt),
                None => Ok(RoutineStatus::Complete),
            },
        }
    }

    fn active_mut(&mut self) -> Option<&mut StageSequencer> {
        match self.plan {
            PlanKind::RightCenter => Some(&mut self.right_center),
            PlanKind::LeftCenter => Some(&mut self.left_center),
            PlanKind::StraightPickup => Some(&mut self.straight_pickup),
            PlanKind::AutoLine => Some(&mut self.auto_line),
            PlanKind::Idle | PlanKind::TimedReverse => None,
        }
    }

    /// Sequencer of the active plan; `None` for stageless plans.
    pub fn active(&self) -> Option<&StageSequencer> {
        match self.plan {
            PlanKind::RightCenter => Some(&self.right_center),
            PlanKind::LeftCenter => Some(&self.left_center),
            PlanKind::StraightPickup => Some(&self.straight_pickup),
            PlanKind::AutoLine => Some(&self.auto_line),
            PlanKind::Idle | PlanKind::TimedReverse => None,
        }
    }

    /// Plan resolved by the last successful `begin`; idle otherwise.
    pub fn plan(&self) -> PlanKind {
        self.plan
    }

    /// Selection passed to the last successful `begin`.
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Settings the routines were built with.
    pub fn config(&self) -> &AutonomousConfig {
        &self.config
    }

    /// Final state of every stage of the active routine.
    pub fn stage_reports(&self) -> Vec<StageReport> {
        self.active()
            .map(|seq| {
                seq.routine()
                    .stages()
                    .iter()
                    .map(|stage| StageReport {
                        kind: stage.kind(),
                        target: stage.target(),
                        lock: stage.lock(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn sequencer(plan: PlanKind, config: &AutonomousConfig) -> Result<StageSequencer, AutoError> {
    let routine = Routine::for_plan(plan, &config.params)?
        .ok_or_else(|| AutoError::EmptyRoutine(plan.to_string()))?;
    Ok(StageSequencer::new(routine, config.stage_timeout))
}
