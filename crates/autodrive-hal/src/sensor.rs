//! Position sensors: wheel [`Encoder`]s and the [`Gyro`].
//!
//! Reads are infallible by contract.  The hardware layer owns sensor liveness;
//! the control core assumes every read returns a current value.

use autodrive_types::AutoError;

/// A signed, position-tracking wheel encoder.
pub trait Encoder: Send + Sync {
    fn id(&self) -> &str;

    /// Current signed tick count since the last reset.
    fn ticks(&self) -> f64;

    /// Zero the tick count.
    ///
    /// # Errors
    ///
    /// Returns [`AutoError::HardwareFault`] if the device rejects the reset.
    fn reset(&mut self) -> Result<(), AutoError>;
}

/// A single-axis gyroscope reporting a cumulative yaw angle.
pub trait Gyro: Send + Sync {
    fn id(&self) -> &str;

    /// Signed cumulative angle in degrees since the last reset.
    fn angle(&self) -> f64;

    /// Zero the angle.
    ///
    /// # Errors
    ///
    /// Returns [`AutoError::HardwareFault`] if the device rejects the reset.
    fn reset(&mut self) -> Result<(), AutoError>;
}
