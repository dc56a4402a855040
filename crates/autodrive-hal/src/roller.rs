//! Generic `Roller` trait for the auxiliary intake actuator.

use autodrive_types::AutoError;

/// A single-channel power actuator (intake roller, conveyor, …).
pub trait Roller: Send + Sync {
    /// Stable identifier for this roller, e.g. `"intake"`.
    fn id(&self) -> &str;

    /// Drive the roller at `power` (nominally `[-1, 1]`).
    ///
    /// # Errors
    ///
    /// Returns [`AutoError::HardwareFault`] if the command cannot be applied.
    fn set_power(&mut self, power: f64) -> Result<(), AutoError>;

    /// Return the most recently commanded power.
    fn power(&self) -> f64;
}
