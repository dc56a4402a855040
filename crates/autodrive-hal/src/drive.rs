//! Generic `DriveBase` trait for arcade-driven differential drivetrains.
//!
//! Drivers implement this trait and are handed to a
//! [`HardwareRig`][crate::rig::HardwareRig].  The control core only ever talks
//! to the trait, so the same routines run on the robot and in simulation.

use autodrive_types::{AutoError, DriveCommand};

/// A differential drivetrain accepting one arcade command per cycle.
///
/// Issuing no command for a cycle leaves the previous actuation in effect;
/// what that means physically (coast, hold, motor-safety timeout) is up to
/// the driver.
pub trait DriveBase: Send + Sync {
    /// Stable identifier for this drivetrain, e.g. `"drive_base"`.
    fn id(&self) -> &str;

    /// Apply `command` to the motors.
    ///
    /// # Errors
    ///
    /// Returns [`AutoError::HardwareFault`] if the command cannot be applied.
    fn arcade(&mut self, command: DriveCommand) -> Result<(), AutoError>;
}
