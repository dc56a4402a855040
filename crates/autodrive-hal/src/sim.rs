//! In-process simulated robot for headless runs and tests.
//!
//! [`SimRobot`] owns a shared [`SimState`] and hands out stub drivers that
//! read and write it.  Drive commands persist until replaced, exactly like a
//! motor controller with safety disabled; [`SimRobot::advance`] integrates them
//! into encoder ticks and gyro degrees with a first-order kinematic model.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use autodrive_hal::sim::SimRobot;
//! use autodrive_types::{DriveCommand, RobotIntent};
//!
//! let sim = SimRobot::new();
//! let mut rig = sim.rig();
//!
//! rig.dispatch(RobotIntent::Drive(DriveCommand::new(-1.0, 0.0)))
//!     .expect("sim drive must succeed");
//! sim.advance(Duration::from_millis(20));
//!
//! assert!(rig.average_encoder() > 0.0);
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use autodrive_types::{AutoError, DriveCommand};

use crate::drive::DriveBase;
use crate::rig::{HardwareRig, RigBuilder};
use crate::roller::Roller;
use crate::sensor::{Encoder, Gyro};
use crate::timer::Timer;

/// Encoder ticks per second at full forward power.
pub const DEFAULT_TICKS_PER_SEC: f64 = 2000.0;
/// Gyro degrees per second at full turn power.
pub const DEFAULT_DEGREES_PER_SEC: f64 = 180.0;
/// Most recent drive commands kept in [`SimState::drive_log`].
pub const DRIVE_LOG_CAPACITY: usize = 1024;

// ────────────────────────────────────────────────────────────────────────────
// Shared plant state
// ────────────────────────────────────────────────────────────────────────────

/// Everything the simulated devices read and write.
#[derive(Debug, Clone)]
pub struct SimState {
    pub left_ticks: f64,
    pub right_ticks: f64,
    pub angle: f64,
    /// Command currently applied to the motors.
    pub drive: Option<DriveCommand>,
    /// Drive commands received, oldest first.  Only the last
    /// [`DRIVE_LOG_CAPACITY`] are kept.
    pub drive_log: Vec<DriveCommand>,
    pub roller_power: f64,
    pub left_resets: u32,
    pub right_resets: u32,
    pub gyro_resets: u32,
    /// Simulated wall clock.
    pub clock: Duration,
    pub ticks_per_sec: f64,
    pub degrees_per_sec: f64,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            left_ticks: 0.0,
            right_ticks: 0.0,
            angle: 0.0,
            drive: None,
            drive_log: Vec::new(),
            roller_power: 0.0,
            left_resets: 0,
            right_resets: 0,
            gyro_resets: 0,
            clock: Duration::ZERO,
            ticks_per_sec: DEFAULT_TICKS_PER_SEC,
            degrees_per_sec: DEFAULT_DEGREES_PER_SEC,
        }
    }
}

type Shared = Arc<Mutex<SimState>>;

fn lock(state: &Shared) -> MutexGuard<'_, SimState> {
    // A panicking test thread must not hide the plant from the others.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ────────────────────────────────────────────────────────────────────────────
// SimRobot
// ────────────────────────────────────────────────────────────────────────────

/// Handle to a simulated robot.  Cloning shares the same plant.
#[derive(Clone, Default)]
pub struct SimRobot {
    state: Shared,
}

impl SimRobot {
    /// Create a plant with the default drive and turn rates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a plant with explicit full-power rates.
    pub fn with_rates(ticks_per_sec: f64, degrees_per_sec: f64) -> Self {
        let sim = Self::new();
        {
            let mut s = lock(&sim.state);
            s.ticks_per_sec = ticks_per_sec;
            s.degrees_per_sec = degrees_per_sec;
        }
        sim
    }

    /// A [`HardwareRig`] whose devices all read and write this plant.
    pub fn rig(&self) -> HardwareRig {
        HardwareRig::new(
            Box::new(SimDrive::new(self.state.clone())),
            Box::new(SimEncoder::new("left_encoder", Side::Left, self.state.clone())),
            Box::new(SimEncoder::new("right_encoder", Side::Right, self.state.clone())),
            Box::new(SimGyro::new(self.state.clone())),
            Box::new(SimRoller::new(self.state.clone())),
            Box::new(SimTimer::new(self.state.clone())),
        )
    }

    /// A [`RigBuilder`] pre-populated with this plant's devices, so a test can
    /// swap in a single custom driver.
    pub fn builder(&self) -> RigBuilder {
        HardwareRig::builder()
            .with_drive(Box::new(SimDrive::new(self.state.clone())))
            .with_encoders(
                Box::new(SimEncoder::new("left_encoder", Side::Left, self.state.clone())),
                Box::new(SimEncoder::new("right_encoder", Side::Right, self.state.clone())),
            )
            .with_gyro(Box::new(SimGyro::new(self.state.clone())))
            .with_roller(Box::new(SimRoller::new(self.state.clone())))
            .with_timer(Box::new(SimTimer::new(self.state.clone())))
    }

    /// Advance the clock by `dt` and integrate the applied drive command.
    ///
    /// A negative forward channel drives the robot forward: the right count
    /// rises and the mirrored left count falls.  A positive turn channel
    /// increases the gyro angle.  Both channels saturate at ±1.
    pub fn advance(&self, dt: Duration) {
        let mut s = lock(&self.state);
        let secs = dt.as_secs_f64();
        s.clock += dt;
        if let Some(command) = s.drive {
            let travel = -command.forward.clamp(-1.0, 1.0) * s.ticks_per_sec * secs;
            s.right_ticks += travel;
            s.left_ticks -= travel;
            s.angle += command.turn.clamp(-1.0, 1.0) * s.degrees_per_sec * secs;
        }
    }

    pub fn set_encoders(&self, left: f64, right: f64) {
        let mut s = lock(&self.state);
        s.left_ticks = left;
        s.right_ticks = right;
    }

    pub fn set_angle(&self, angle: f64) {
        lock(&self.state).angle = angle;
    }

    /// `(right − left) / 2` straight from the plant.
    pub fn average_encoder(&self) -> f64 {
        let s = lock(&self.state);
        (s.right_ticks - s.left_ticks) / 2.0
    }

    pub fn angle(&self) -> f64 {
        lock(&self.state).angle
    }

    pub fn last_drive(&self) -> Option<DriveCommand> {
        lock(&self.state).drive
    }

    pub fn drive_log(&self) -> Vec<DriveCommand> {
        lock(&self.state).drive_log.clone()
    }

    pub fn roller_power(&self) -> f64 {
        lock(&self.state).roller_power
    }

    /// `(left, right)` reset counts.
    pub fn encoder_resets(&self) -> (u32, u32) {
        let s = lock(&self.state);
        (s.left_resets, s.right_resets)
    }

    pub fn gyro_resets(&self) -> u32 {
        lock(&self.state).gyro_resets
    }

    pub fn clock(&self) -> Duration {
        lock(&self.state).clock
    }

    /// Copy of the whole plant state.
    pub fn snapshot(&self) -> SimState {
        lock(&self.state).clone()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stub drivers
// ────────────────────────────────────────────────────────────────────────────

struct SimDrive {
    state: Shared,
}

impl SimDrive {
    fn new(state: Shared) -> Self {
        Self { state }
    }
}

impl DriveBase for SimDrive {
    fn id(&self) -> &str {
        "sim_drive"
    }

    fn arcade(&mut self, command: DriveCommand) -> Result<(), AutoError> {
        let mut s = lock(&self.state);
        s.drive = Some(command);
        if s.drive_log.len() >= DRIVE_LOG_CAPACITY {
            let excess = s.drive_log.len() + 1 - DRIVE_LOG_CAPACITY;
            s.drive_log.drain(..excess);
        }
        s.drive_log.push(command);
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

struct SimEncoder {
    id: &'static str,
    side: Side,
    state: Shared,
}

impl SimEncoder {
    fn new(id: &'static str, side: Side, state: Shared) -> Self {
        Self { id, side, state }
    }
}

impl Encoder for SimEncoder {
    fn id(&self) -> &str {
        self.id
    }

    fn ticks(&self) -> f64 {
        let s = lock(&self.state);
        match self.side {
            Side::Left => s.left_ticks,
            Side::Right => s.right_ticks,
        }
    }

    fn reset(&mut self) -> Result<(), AutoError> {
        let mut s = lock(&self.state);
        match self.side {
            Side::Left => {
                s.left_ticks = 0.0;
                s.left_resets += 1;
            }
            Side::Right => {
                s.right_ticks = 0.0;
                s.right_resets += 1;
            }
        }
        Ok(())
    }
}

struct SimGyro {
    state: Shared,
}

impl SimGyro {
    fn new(state: Shared) -> Self {
        Self { state }
    }
}

impl Gyro for SimGyro {
    fn id(&self) -> &str {
        "sim_gyro"
    }

    fn angle(&self) -> f64 {
        lock(&self.state).angle
    }

    fn reset(&mut self) -> Result<(), AutoError> {
        let mut s = lock(&self.state);
        s.angle = 0.0;
        s.gyro_resets += 1;
        Ok(())
    }
}

struct SimRoller {
    state: Shared,
}

impl SimRoller {
    fn new(state: Shared) -> Self {
        Self { state }
    }
}

impl Roller for SimRoller {
    fn id(&self) -> &str {
        "sim_roller"
    }

    fn set_power(&mut self, power: f64) -> Result<(), AutoError> {
        lock(&self.state).roller_power = power;
        Ok(())
    }

    fn power(&self) -> f64 {
        lock(&self.state).roller_power
    }
}

/// Stopwatch over the simulated clock.
struct SimTimer {
    state: Shared,
    accumulated: Duration,
    running_since: Option<Duration>,
}

impl SimTimer {
    fn new(state: Shared) -> Self {
        Self {
            state,
            accumulated: Duration::ZERO,
            running_since: None,
        }
    }

    fn now(&self) -> Duration {
        lock(&self.state).clock
    }
}

impl Timer for SimTimer {
    fn start(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(self.now());
        }
    }

    fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        if self.running_since.is_some() {
            self.running_since = Some(self.now());
        }
    }

    fn elapsed(&self) -> Duration {
        let running = self
            .running_since
            .map(|since| self.now().saturating_sub(since))
            .unwrap_or_default();
        self.accumulated + running
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
