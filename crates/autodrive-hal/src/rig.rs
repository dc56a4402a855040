//! [`HardwareRig`] – the drivetrain, sensors and roller of one robot, plus the
//! [`RobotIntent`] dispatcher.
//!
//! Unlike a general device registry, the rig holds exactly one device per
//! role: the control core needs the drive, both encoders, the gyro, the intake
//! roller and a match timer, and nothing else.  Construct it with
//! [`HardwareRig::builder`]; a missing device is reported at build time rather
//! than on the first control cycle.
//!
//! # Averaged encoder
//!
//! The left encoder is mounted mirrored, so forward travel increases the right
//! count and decreases the left one.  [`HardwareRig::average_encoder`] returns
//! `(right − left) / 2`, which grows as the vehicle moves in the commanded
//! direction.

use std::time::Duration;

use autodrive_types::{AutoError, DriveCommand, RobotIntent};
use tracing::debug;

use crate::drive::DriveBase;
use crate::roller::Roller;
use crate::sensor::{Encoder, Gyro};
use crate::timer::{SystemTimer, Timer};

/// One of every device the control core drives or reads.
pub struct HardwareRig {
    drive: Box<dyn DriveBase>,
    left_encoder: Box<dyn Encoder>,
    right_encoder: Box<dyn Encoder>,
    gyro: Box<dyn Gyro>,
    roller: Box<dyn Roller>,
    timer: Box<dyn Timer>,
    last_drive: Option<DriveCommand>,
}

impl HardwareRig {
    /// Assemble a rig from already-constructed drivers.
    pub fn new(
        drive: Box<dyn DriveBase>,
        left_encoder: Box<dyn Encoder>,
        right_encoder: Box<dyn Encoder>,
        gyro: Box<dyn Gyro>,
        roller: Box<dyn Roller>,
        timer: Box<dyn Timer>,
    ) -> Self {
        Self {
            drive,
            left_encoder,
            right_encoder,
            gyro,
            roller,
            timer,
            last_drive: None,
        }
    }

    /// Start building a rig device by device.
    pub fn builder() -> RigBuilder {
        RigBuilder::default()
    }

    /// `(right − left) / 2`: the vehicle's linear displacement in ticks.
    pub fn average_encoder(&self) -> f64 {
        (self.right_encoder.ticks() - self.left_encoder.ticks()) / 2.0
    }

    /// Current gyro angle in degrees.
    pub fn angle(&self) -> f64 {
        self.gyro.angle()
    }

    /// Time on the match timer.
    pub fn elapsed(&self) -> Duration {
        self.timer.elapsed()
    }

    /// Zero the match timer and make sure it is running.
    pub fn restart_timer(&mut self) {
        self.timer.reset();
        self.timer.start();
    }

    /// The last drive command sent through this rig, if any.
    pub fn last_drive(&self) -> Option<DriveCommand> {
        self.last_drive
    }

    /// Power most recently commanded to the roller.
    pub fn roller_power(&self) -> f64 {
        self.roller.power()
    }

    /// Translate a [`RobotIntent`] into driver calls.
    ///
    /// # Errors
    ///
    /// Propagates the [`AutoError::HardwareFault`] of the first driver call
    /// that fails.
    pub fn dispatch(&mut self, intent: RobotIntent) -> Result<(), AutoError> {
        debug!(drive = self.drive.id(), intent = ?intent, "dispatching intent");
        match intent {
            RobotIntent::Drive(command) => self.arcade(command),
            RobotIntent::SetRoller { power } => self.roller.set_power(power),
            RobotIntent::ResetEncoders => {
                self.left_encoder.reset()?;
                self.right_encoder.reset()
            }
            RobotIntent::ResetGyro => self.gyro.reset(),
            RobotIntent::Stop => {
                self.arcade(DriveCommand::ZERO)?;
                self.roller.set_power(0.0)
            }
        }
    }

    fn arcade(&mut self, command: DriveCommand) -> Result<(), AutoError> {
        self.drive.arcade(command)?;
        self.last_drive = Some(command);
        Ok(())
    }
}

/// Builder for [`HardwareRig`].
///
/// The timer defaults to a [`SystemTimer`]; every other device is required.
#[derive(Default)]
pub struct RigBuilder {
    drive: Option<Box<dyn DriveBase>>,
    left_encoder: Option<Box<dyn Encoder>>,
    right_encoder: Option<Box<dyn Encoder>>,
    gyro: Option<Box<dyn Gyro>>,
    roller: Option<Box<dyn Roller>>,
    timer: Option<Box<dyn Timer>>,
}

impl RigBuilder {
    pub fn with_drive(mut self, drive: Box<dyn DriveBase>) -> Self {
        self.drive = Some(drive);
        self
    }

    pub fn with_encoders(mut self, left: Box<dyn Encoder>, right: Box<dyn Encoder>) -> Self {
        self.left_encoder = Some(left);
        self.right_encoder = Some(right);
        self
    }

    pub fn with_gyro(mut self, gyro: Box<dyn Gyro>) -> Self {
        self.gyro = Some(gyro);
        self
    }

    pub fn with_roller(mut self, roller: Box<dyn Roller>) -> Self {
        self.roller = Some(roller);
        self
    }

    pub fn with_timer(mut self, timer: Box<dyn Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Consume the builder and return the assembled rig.
    ///
    /// # Errors
    ///
    /// Returns [`AutoError::HardwareFault`] naming the first missing device.
    pub fn build(self) -> Result<HardwareRig, AutoError> {
        Ok(HardwareRig::new(
            required(self.drive, "drive")?,
            required(self.left_encoder, "left_encoder")?,
            required(self.right_encoder, "right_encoder")?,
            required(self.gyro, "gyro")?,
            required(self.roller, "roller")?,
            self.timer.unwrap_or_else(|| Box::new(SystemTimer::new())),
        ))
    }
}

fn required<T>(device: Option<T>, role: &str) -> Result<T, AutoError> {
    device.ok_or_else(|| AutoError::HardwareFault {
        component: role.to_string(),
        details: format!("{role} is not registered"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimRobot;

    // ------------------------------------------------------------------
    // Test doubles
    // ------------------------------------------------------------------

    struct FaultyDrive;
    impl DriveBase for FaultyDrive {
        fn id(&self) -> &str {
            "faulty_drive"
        }
        fn arcade(&mut self, _command: DriveCommand) -> Result<(), AutoError> {
            Err(AutoError::HardwareFault {
                component: "faulty_drive".to_string(),
                details: "motor controller brownout".to_string(),
            })
        }
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[test]
    fn average_encoder_uses_mirrored_left_side() {
        let sim = SimRobot::new();
        sim.set_encoders(-50.0, 50.0);
        let rig = sim.rig();
        assert_eq!(rig.average_encoder(), 50.0);
    }

    #[test]
    fn dispatch_drive_records_last_command() {
        let sim = SimRobot::new();
        let mut rig = sim.rig();
        assert_eq!(rig.last_drive(), None);

        rig.dispatch(RobotIntent::Drive(DriveCommand::new(-0.4, 0.1)))
            .unwrap();
        assert_eq!(rig.last_drive(), Some(DriveCommand::new(-0.4, 0.1)));
        assert_eq!(sim.last_drive(), Some(DriveCommand::new(-0.4, 0.1)));
    }

    #[test]
    fn dispatch_resets_reach_the_sensors() {
        let sim = SimRobot::new();
        sim.set_encoders(-10.0, 10.0);
        sim.set_angle(30.0);
        let mut rig = sim.rig();

        rig.dispatch(RobotIntent::ResetEncoders).unwrap();
        rig.dispatch(RobotIntent::ResetGyro).unwrap();

        assert_eq!(rig.average_encoder(), 0.0);
        assert_eq!(rig.angle(), 0.0);
        assert_eq!(sim.encoder_resets(), (1, 1));
        assert_eq!(sim.gyro_resets(), 1);
    }

    #[test]
    fn dispatch_stop_zeroes_drive_and_roller() {
        let sim = SimRobot::new();
        let mut rig = sim.rig();
        rig.dispatch(RobotIntent::SetRoller { power: 1.0 }).unwrap();
        assert_eq!(rig.roller_power(), 1.0);

        rig.dispatch(RobotIntent::Stop).unwrap();
        assert_eq!(rig.roller_power(), 0.0);
        assert_eq!(rig.last_drive(), Some(DriveCommand::ZERO));
    }

    #[test]
    fn driver_fault_is_propagated_and_not_recorded() {
        let sim = SimRobot::new();
        let mut rig = sim
            .builder()
            .with_drive(Box::new(FaultyDrive))
            .build()
            .unwrap();

        let result = rig.dispatch(RobotIntent::Drive(DriveCommand::new(0.5, 0.0)));
        assert!(matches!(result, Err(AutoError::HardwareFault { .. })));
        assert_eq!(rig.last_drive(), None);
    }

    #[test]
    fn builder_reports_missing_device() {
        let result = HardwareRig::builder().build();
        match result {
            Err(AutoError::HardwareFault { component, .. }) => assert_eq!(component, "drive"),
            _ => panic!("expected a missing-drive fault"),
        }
    }
}
