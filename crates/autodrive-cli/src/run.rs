//! Headless autonomous period against the simulated plant.
//!
//! The loop ticks the supervisor once per control period for the length of
//! the autonomous period, advancing the plant by the same period after every
//! tick.  Time is simulated: without `realtime` the whole period runs as fast
//! as the CPU allows.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use autodrive_control::{Autonomous, RoutineStatus};
use autodrive_hal::SimRobot;
use autodrive_hal::sim::SimState;
use autodrive_types::{AutoError, RobotIntent, RunOutcome, RunReport, Selection};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;

/// A finished simulated run.
pub struct SimRun {
    pub report: RunReport,
    /// Plant state after the final stop command.
    pub plant: SimState,
}

/// Run one autonomous period.
///
/// `stop` is polled once per cycle; when set the robot is stopped and the run
/// reports [`RunOutcome::Interrupted`].
///
/// # Errors
///
/// Hardware faults abort the run.  A stage timeout does not: the routine is
/// already stopped and the report records [`RunOutcome::Aborted`].
pub fn run_simulated(
    cfg: &Config,
    selection: Selection,
    stop: &AtomicBool,
    realtime: bool,
) -> Result<SimRun, AutoError> {
    let sim = SimRobot::with_rates(cfg.sim_ticks_per_sec, cfg.sim_degrees_per_sec);
    let mut rig = sim.rig();
    let mut auto = Autonomous::new(cfg.autonomous())?;
    let period = cfg.period();
    let budget = cfg.autonomous_period();

    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let plan = auto.begin(selection, &mut rig)?;
    info!(%run_id, %plan, period_ms = period.as_millis() as u64, "simulated run started");

    let mut cycles = 0u64;
    let mut status = RoutineStatus::Running { stage: 0 };
    let mut interrupted = false;

    while rig.elapsed() < budget {
        if stop.load(Ordering::SeqCst) {
            warn!(cycles, "run interrupted by operator");
            interrupted = true;
            break;
        }

        status = match auto.tick(&mut rig, period) {
            Ok(status) => status,
            Err(AutoError::StageTimeout { stage, .. }) => RoutineStatus::Aborted { stage },
            Err(e) => {
                rig.dispatch(RobotIntent::Stop)?;
                return Err(e);
            }
        };
        cycles += 1;

        sim.advance(period);
        if realtime {
            std::thread::sleep(period);
        }
    }

    rig.dispatch(RobotIntent::Stop)?;

    let outcome = if interrupted {
        RunOutcome::Interrupted
    } else {
        match status {
            RoutineStatus::Complete => RunOutcome::Complete,
            RoutineStatus::Aborted { .. } => RunOutcome::Aborted,
            RoutineStatus::Running { .. } => RunOutcome::OutOfTime,
        }
    };
    let elapsed_ms = duration_ms(sim.clock());
    info!(%run_id, ?outcome, cycles, elapsed_ms, "simulated run finished");

    Ok(SimRun {
        report: RunReport {
            run_id,
            started_at,
            selection,
            plan,
            outcome,
            cycles,
            elapsed_ms,
            stages: auto.stage_reports(),
        },
        plant: sim.snapshot(),
    })
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
