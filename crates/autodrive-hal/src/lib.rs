//! `autodrive-hal` – Hardware Abstraction Layer
//!
//! The control core never talks to a motor controller or sensor directly.  It
//! borrows a [`HardwareRig`] for the duration of one control cycle and goes
//! through the traits below, so real drivers and the simulated plant are
//! interchangeable.
//!
//! # Modules
//!
//! - [`drive`] – [`DriveBase`][drive::DriveBase]: arcade (forward, turn) drive.
//! - [`roller`] – [`Roller`][roller::Roller]: auxiliary intake roller.
//! - [`sensor`] – [`Encoder`][sensor::Encoder] and [`Gyro`][sensor::Gyro].
//! - [`timer`] – [`Timer`][timer::Timer] plus the wall-clock
//!   [`SystemTimer`][timer::SystemTimer].
//! - [`rig`] – [`HardwareRig`]: one of each device, plus
//!   [`RobotIntent`][autodrive_types::RobotIntent] dispatch.
//! - [`sim`] – [`SimRobot`][sim::SimRobot]: an in-process kinematic plant for
//!   headless runs and tests.

pub mod drive;
pub mod rig;
pub mod roller;
pub mod sensor;
pub mod sim;
pub mod timer;

pub use drive::DriveBase;
pub use rig::{HardwareRig, RigBuilder};
pub use roller::Roller;
pub use sensor::{Encoder, Gyro};
pub use sim::SimRobot;
pub use timer::{SystemTimer, Timer};
