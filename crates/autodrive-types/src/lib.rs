//! `autodrive-types` – shared data types for the AutoDrive workspace.
//!
//! Everything that crosses a crate boundary lives here: the commands sent to
//! the drive hardware, stage lock states, the autonomous routine selection
//! signal, the run report, and the workspace-wide [`AutoError`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Stage state
// ────────────────────────────────────────────────────────────────────────────

/// Which sensor a stage closes its loop on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    /// Straight-line drive measured by the averaged wheel encoders.
    Distance,
    /// In-place turn measured by the gyroscope.
    Heading,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Distance => write!(f, "distance"),
            StageKind::Heading => write!(f, "heading"),
        }
    }
}

/// Completion flag of a single stage.
///
/// A stage moves `Locked → Released → ReleasedAck` exactly once per run.  The
/// split between `Released` and `ReleasedAck` is what lets the sequencer fire
/// its hand-off side effects a single time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    /// Target not reached yet; the controller is computing and driving.
    #[default]
    Locked,
    /// The controller output fell inside the deadband this cycle.
    Released,
    /// Released, and the sequencer has performed its hand-off side effects.
    ReleasedAck,
    /// The stage exceeded its maximum duration and was abandoned.
    Aborted,
}

impl LockState {
    /// `true` once the stage no longer needs `execute` calls.
    pub fn is_finished(self) -> bool {
        !matches!(self, LockState::Locked)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Hardware commands
// ────────────────────────────────────────────────────────────────────────────

/// Arcade-style drive command: forward channel and turn channel, each
/// nominally in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DriveCommand {
    pub forward: f64,
    pub turn: f64,
}

impl DriveCommand {
    /// Both channels at zero.
    pub const ZERO: DriveCommand = DriveCommand {
        forward: 0.0,
        turn: 0.0,
    };

    pub fn new(forward: f64, turn: f64) -> Self {
        Self { forward, turn }
    }
}

/// Physical actions the control core may request from the hardware layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload")]
pub enum RobotIntent {
    /// Arcade drive command for this cycle.
    Drive(DriveCommand),
    /// Power command for the auxiliary intake roller.
    SetRoller { power: f64 },
    /// Zero both drive encoders.
    ResetEncoders,
    /// Zero the gyroscope.
    ResetGyro,
    /// Drive to zero and roller off.
    Stop,
}

// ────────────────────────────────────────────────────────────────────────────
// Routine selection
// ────────────────────────────────────────────────────────────────────────────

/// Starting position key chosen by the drive team before the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldPosition {
    /// Open-loop timed reverse.
    Solid,
    /// Do nothing.
    #[default]
    None,
    Center,
    Right,
    Left,
}

impl FromStr for FieldPosition {
    type Err = AutoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "solid" => Ok(FieldPosition::Solid),
            "none" => Ok(FieldPosition::None),
            "center" => Ok(FieldPosition::Center),
            "right" => Ok(FieldPosition::Right),
            "left" => Ok(FieldPosition::Left),
            other => Err(AutoError::InvalidSelection(format!(
                "unknown position '{other}'"
            ))),
        }
    }
}

impl fmt::Display for FieldPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldPosition::Solid => "solid",
            FieldPosition::None => "none",
            FieldPosition::Center => "center",
            FieldPosition::Right => "right",
            FieldPosition::Left => "left",
        };
        f.write_str(s)
    }
}

/// The side of the scoring target assigned to our alliance for this match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alliance {
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
}

impl Alliance {
    /// Parse the first character of the match game-data message.
    ///
    /// An empty message yields `Ok(None)`: the field has not published the
    /// assignment yet.
    pub fn from_game_message(message: &str) -> Result<Option<Alliance>, AutoError> {
        match message.trim().chars().next() {
            None => Ok(None),
            Some('L') => Ok(Some(Alliance::Left)),
            Some('R') => Ok(Some(Alliance::Right)),
            Some(other) => Err(AutoError::InvalidSelection(format!(
                "unexpected game data side '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Alliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alliance::Left => write!(f, "L"),
            Alliance::Right => write!(f, "R"),
        }
    }
}

/// The autonomous plan a [`Selection`] resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    Idle,
    TimedReverse,
    RightCenter,
    LeftCenter,
    /// Straight drive toward our side, roller runs after a delay.
    StraightPickup,
    /// Straight drive across the auto line only.
    AutoLine,
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanKind::Idle => "idle",
            PlanKind::TimedReverse => "timed-reverse",
            PlanKind::RightCenter => "right-center",
            PlanKind::LeftCenter => "left-center",
            PlanKind::StraightPickup => "straight-pickup",
            PlanKind::AutoLine => "auto-line",
        };
        f.write_str(s)
    }
}

/// Routine-selection signal, read once when autonomous starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub position: FieldPosition,
    pub alliance: Option<Alliance>,
}

impl Selection {
    pub fn new(position: FieldPosition, alliance: Option<Alliance>) -> Self {
        Self { position, alliance }
    }

    /// Build a selection from the raw position key and game-data message.
    ///
    /// # Errors
    ///
    /// Returns [`AutoError::InvalidSelection`] for an unknown position key or
    /// a game-data message that does not start with `L` or `R`.
    pub fn from_signals(position_key: &str, game_message: &str) -> Result<Self, AutoError> {
        Ok(Self {
            position: position_key.parse()?,
            alliance: Alliance::from_game_message(game_message)?,
        })
    }

    /// Resolve the plan to run.  Positions that need a side fall back to
    /// [`PlanKind::Idle`] when no alliance signal is available.
    pub fn plan(&self) -> PlanKind {
        use Alliance::{Left, Right};

        match (self.position, self.alliance) {
            (FieldPosition::Solid, _) => PlanKind::TimedReverse,
            (FieldPosition::None, _) => PlanKind::Idle,
            (_, None) => PlanKind::Idle,
            (FieldPosition::Center, Some(Right)) => PlanKind::RightCenter,
            (FieldPosition::Center, Some(Left)) => PlanKind::LeftCenter,
            (FieldPosition::Right, Some(Right)) | (FieldPosition::Left, Some(Left)) => {
                PlanKind::StraightPickup
            }
            (FieldPosition::Right, Some(Left)) | (FieldPosition::Left, Some(Right)) => {
                PlanKind::AutoLine
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Run report
// ────────────────────────────────────────────────────────────────────────────

/// Final state of one stage at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub kind: StageKind,
    pub target: f64,
    pub lock: LockState,
}

/// How an autonomous run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every stage released (or the plan had no stages).
    Complete,
    /// The autonomous period ended with a stage still running.
    OutOfTime,
    /// A stage timed out and the routine was abandoned.
    Aborted,
    /// The operator interrupted the run.
    Interrupted,
}

/// Summary of a single autonomous run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub selection: Selection,
    pub plan: PlanKind,
    pub outcome: RunOutcome,
    pub cycles: u64,
    pub elapsed_ms: u64,
    pub stages: Vec<StageReport>,
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Workspace-wide error type covering configuration mistakes, stalled stages
/// and faults reported by the hardware layer.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AutoError {
    #[error("Invalid {kind} target {target}: gains are undefined")]
    InvalidTarget { kind: StageKind, target: f64 },

    #[error("Stage {stage} ({kind}) timed out after {limit_ms} ms")]
    StageTimeout {
        stage: usize,
        kind: StageKind,
        limit_ms: u64,
    },

    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Invalid routine selection: {0}")]
    InvalidSelection(String),

    #[error("Routine '{0}' has no stages")]
    EmptyRoutine(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_parses_known_keys() {
        assert_eq!("solid".parse::<FieldPosition>().unwrap(), FieldPosition::Solid);
        assert_eq!("none".parse::<FieldPosition>().unwrap(), FieldPosition::None);
        assert_eq!(" center ".parse::<FieldPosition>().unwrap(), FieldPosition::Center);
        assert!(matches!(
            "middle".parse::<FieldPosition>(),
            Err(AutoError::InvalidSelection(_))
        ));
    }

    #[test]
    fn alliance_reads_first_character() {
        assert_eq!(Alliance::from_game_message("RLR").unwrap(), Some(Alliance::Right));
        assert_eq!(Alliance::from_game_message("LRL").unwrap(), Some(Alliance::Left));
        assert_eq!(Alliance::from_game_message("").unwrap(), None);
        assert!(Alliance::from_game_message("X").is_err());
    }

    #[test]
    fn selection_resolves_plans() {
        let plan = |pos, side| Selection::new(pos, side).plan();
        let (l, r) = (Some(Alliance::Left), Some(Alliance::Right));

        assert_eq!(plan(FieldPosition::Solid, None), PlanKind::TimedReverse);
        assert_eq!(plan(FieldPosition::None, r), PlanKind::Idle);
        assert_eq!(plan(FieldPosition::Center, r), PlanKind::RightCenter);
        assert_eq!(plan(FieldPosition::Center, l), PlanKind::LeftCenter);
        assert_eq!(plan(FieldPosition::Right, r), PlanKind::StraightPickup);
        assert_eq!(plan(FieldPosition::Left, l), PlanKind::StraightPickup);
        assert_eq!(plan(FieldPosition::Right, l), PlanKind::AutoLine);
        assert_eq!(plan(FieldPosition::Left, r), PlanKind::AutoLine);
        assert_eq!(plan(FieldPosition::Center, None), PlanKind::Idle);
    }

    #[test]
    fn lock_state_finished() {
        assert!(!LockState::Locked.is_finished());
        assert!(LockState::Released.is_finished());
        assert!(LockState::ReleasedAck.is_finished());
        assert!(LockState::Aborted.is_finished());
        assert_eq!(LockState::default(), LockState::Locked);
    }

    #[test]
    fn robot_intent_uses_tagged_json() {
        let json = serde_json::to_string(&RobotIntent::SetRoller { power: 1.0 }).unwrap();
        assert!(json.contains("\"action\":\"SetRoller\""));

        let back: RobotIntent =
            serde_json::from_str(r#"{"action":"Drive","payload":{"forward":-0.5,"turn":0.0}}"#)
                .unwrap();
        assert_eq!(back, RobotIntent::Drive(DriveCommand::new(-0.5, 0.0)));
    }

    #[test]
    fn run_report_serializes_selection() {
        let report = RunReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            selection: Selection::new(FieldPosition::Center, Some(Alliance::Left)),
            plan: PlanKind::LeftCenter,
            outcome: RunOutcome::Complete,
            cycles: 250,
            elapsed_ms: 5000,
            stages: vec![StageReport {
                kind: StageKind::Heading,
                target: -45.0,
                lock: LockState::ReleasedAck,
            }],
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"position\":\"center\""));
        assert!(json.contains("\"alliance\":\"L\""));
        assert!(json.contains("\"lock\":\"released_ack\""));
    }

    #[test]
    fn auto_error_display() {
        let err = AutoError::InvalidTarget {
            kind: StageKind::Distance,
            target: 0.0,
        };
        assert!(err.to_string().contains("distance"));

        let err = AutoError::StageTimeout {
            stage: 2,
            kind: StageKind::Heading,
            limit_ms: 4000,
        };
        assert!(err.to_string().contains("4000 ms"));
    }
}
