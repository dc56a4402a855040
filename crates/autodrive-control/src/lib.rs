//! `autodrive-control` – closed-loop stages and the routine that chains them
//!
//! Everything here is single-threaded and externally clocked: the caller
//! invokes [`Autonomous::tick`] once per control period with the measured
//! period, and each layer below does a bounded amount of work before
//! returning.
//!
//! # Modules
//!
//! - [`pid`] – [`PidLoop`][pid::PidLoop] and target-derived
//!   [`PidGains`][pid::PidGains].
//! - [`distance`] – [`DistanceController`][distance::DistanceController]:
//!   straight drive held on the averaged encoder count.
//! - [`heading`] – [`HeadingController`][heading::HeadingController]:
//!   in-place turn held on the gyro angle.
//! - [`stage`] – the [`Controller`][stage::Controller] interface and the
//!   [`Stage`][stage::Stage] union routines are built from.
//! - [`routine`] – [`Routine`][routine::Routine]: ordered stages plus an
//!   intake policy, and the stock field routines.
//! - [`watchdog`] – [`StageWatchdog`][watchdog::StageWatchdog]: per-stage
//!   stall timeout.
//! - [`sequencer`] – [`StageSequencer`][sequencer::StageSequencer]: runs one
//!   routine with lock hand-off between stages.
//! - [`autonomous`] – [`Autonomous`][autonomous::Autonomous]: resolves a
//!   [`Selection`][autodrive_types::Selection] to a plan and runs it.
//!
//! # Lock hand-off
//!
//! ```text
//!   Locked ──(|output| < deadband)──▶ Released ──(sequencer)──▶ ReleasedAck
//!     │
//!     └──(stage timeout)──▶ Aborted
//! ```

pub mod autonomous;
pub mod distance;
pub mod heading;
pub mod pid;
pub mod routine;
pub mod sequencer;
pub mod stage;
pub mod watchdog;

pub use autonomous::{Autonomous, AutonomousConfig};
pub use distance::DistanceController;
pub use heading::HeadingController;
pub use pid::{DEADBAND, PidGains, PidLoop};
pub use routine::{IntakePolicy, Routine, RoutineParams, TICKS_PER_FOOT};
pub use sequencer::{RoutineStatus, StageSequencer};
pub use stage::{Controller, Stage};
pub use watchdog::{StageHealth, StageWatchdog};
