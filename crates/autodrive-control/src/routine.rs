//! Routines: ordered stage lists plus what the intake roller does around them.
//!
//! The field geometry of the stock routines is expressed in feet and degrees
//! and converted to encoder ticks with [`RoutineParams::ticks_per_foot`].
//!
//! | Routine | Stages | Intake |
//! |---|---|---|
//! | right-center | D 2.8 ft, H +45°, D 7/√2 ft, H −45°, D 1.2 ft | pickup window |
//! | left-center | D 2.8 ft, H −45°, D 7/√2 ft, H +45°, D 1.2 ft | pickup window |
//! | straight-pickup | D 11 ft | after delay |
//! | auto-line | D 11 ft | none |

use std::f64::consts::{PI, SQRT_2};
use std::time::Duration;

use autodrive_types::{AutoError, LockState, PlanKind};

use crate::stage::Stage;

/// Encoder ticks per foot of travel for the stock wheels.
pub const TICKS_PER_FOOT: f64 = 650.1875 / PI;

/// What the intake roller does while a routine runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntakePolicy {
    /// Roller untouched.
    None,
    /// Roller at `power` while the final stage runs and after it finishes,
    /// until `window` has elapsed on the match timer; zero afterwards.
    Pickup { power: f64, window: Duration },
    /// Roller at `power` once the final stage has released or `delay` has
    /// elapsed on the match timer, whichever comes first.
    AfterDelay { power: f64, delay: Duration },
}

/// Tunables that shape the stock routines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutineParams {
    pub ticks_per_foot: f64,
    pub roller_power: f64,
    pub pickup_window: Duration,
    pub straight_intake_delay: Duration,
}

impl Default for RoutineParams {
    fn default() -> Self {
        Self {
            ticks_per_foot: TICKS_PER_FOOT,
            roller_power: 1.0,
            pickup_window: Duration::from_secs(10),
            straight_intake_delay: Duration::from_secs(5),
        }
    }
}

/// An ordered, non-empty list of stages.
#[derive(Debug, Clone)]
pub struct Routine {
    name: String,
    stages: Vec<Stage>,
    intake: IntakePolicy,
}

impl Routine {
    /// # Errors
    ///
    /// [`AutoError::EmptyRoutine`] when `stages` is empty.
    pub fn new(
        name: impl Into<String>,
        stages: Vec<Stage>,
        intake: IntakePolicy,
    ) -> Result<Self, AutoError> {
        let name = name.into();
        if stages.is_empty() {
            return Err(AutoError::EmptyRoutine(name));
        }
        Ok(Self {
            name,
            stages,
            intake,
        })
    }

    /// Build the stock routine for `plan`.  Plans without stages (idle, timed
    /// reverse) return `Ok(None)`.
    ///
    /// # Errors
    ///
    /// [`AutoError::InvalidTarget`] if `params` produce a zero or non-finite
    /// distance.
    pub fn for_plan(plan: PlanKind, params: &RoutineParams) -> Result<Option<Self>, AutoError> {
        let feet = |f: f64| f * params.ticks_per_foot;
        let pickup = IntakePolicy::Pickup {
            power: params.roller_power,
            window: params.pickup_window,
        };

        let routine = match plan {
            PlanKind::Idle | PlanKind::TimedReverse => return Ok(None),
            PlanKind::RightCenter => Self::center("right-center", 45.0, feet, pickup)?,
            PlanKind::LeftCenter => Self::center("left-center", -45.0, feet, pickup)?,
            PlanKind::StraightPickup => Self::new(
                "straight-pickup",
                vec![Stage::distance(feet(11.0))?],
                IntakePolicy::AfterDelay {
                    power: params.roller_power,
                    delay: params.straight_intake_delay,
                },
            )?,
            PlanKind::AutoLine => Self::new(
                "auto-line",
                vec![Stage::distance(feet(11.0))?],
                IntakePolicy::None,
            )?,
        };
        Ok(Some(routine))
    }

    /// Drive out, angle toward the side, cross diagonally, straighten, and
    /// finish with a short pickup run.
    fn center(
        name: &str,
        first_turn: f64,
        feet: impl Fn(f64) -> f64,
        intake: IntakePolicy,
    ) -> Result<Self, AutoError> {
        Self::new(
            name,
            vec![
                Stage::distance(feet(2.8))?,
                Stage::heading(first_turn)?,
                Stage::distance(feet(7.0 / SQRT_2))?,
                Stage::heading(-first_turn)?,
                Stage::distance(feet(1.2))?,
            ],
            intake,
        )
    }

    /// Name used in logs and reports.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stages in execution order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub(crate) fn stages_mut(&mut self) -> &mut [Stage] {
        &mut self.stages
    }

    /// Number of stages, at least one.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always `false`: construction rejects empty routines.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// What the roller does while this routine runs.
    pub fn intake(&self) -> IntakePolicy {
        self.intake
    }

    /// Lock state of every stage, in order.
    pub fn lock_states(&self) -> Vec<LockState> {
        self.stages.iter().map(Stage::lock).collect()
    }

    /// Every stage back to [`LockState::Locked`] with clean loop history.
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }
}
