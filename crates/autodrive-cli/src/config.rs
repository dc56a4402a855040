//! Run configuration – reads/writes `~/.autodrive/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use autodrive_control::{AutonomousConfig, RoutineParams, TICKS_PER_FOOT};
use autodrive_hal::sim::{DEFAULT_DEGREES_PER_SEC, DEFAULT_TICKS_PER_SEC};

/// Persisted run configuration stored in `~/.autodrive/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Control period in milliseconds.
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    /// Longest a single stage may stay locked.  `0` disables the timeout.
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: f64,

    /// Length of the autonomous period.
    #[serde(default = "default_autonomous_secs")]
    pub autonomous_secs: f64,

    #[serde(default = "default_ticks_per_foot")]
    pub ticks_per_foot: f64,

    /// Field position key: `solid`, `none`, `center`, `right` or `left`.
    #[serde(default = "default_position")]
    pub position: String,

    /// Match game-data message; its first character picks the side.
    #[serde(default)]
    pub game_data: String,

    #[serde(default = "default_pickup_window_secs")]
    pub pickup_window_secs: f64,

    #[serde(default = "default_straight_intake_delay_secs")]
    pub straight_intake_delay_secs: f64,

    #[serde(default = "default_reverse_secs")]
    pub reverse_secs: f64,

    #[serde(default = "default_reverse_power")]
    pub reverse_power: f64,

    /// Simulated encoder ticks per second at full power.
    #[serde(default = "default_sim_ticks_per_sec")]
    pub sim_ticks_per_sec: f64,

    /// Simulated gyro degrees per second at full turn.
    #[serde(default = "default_sim_degrees_per_sec")]
    pub sim_degrees_per_sec: f64,
}

fn default_period_ms() -> u64 {
    20
}
fn default_stage_timeout_secs() -> f64 {
    6.0
}
fn default_autonomous_secs() -> f64 {
    15.0
}
fn default_ticks_per_foot() -> f64 {
    TICKS_PER_FOOT
}
fn default_position() -> String {
    "none".to_string()
}
fn default_pickup_window_secs() -> f64 {
    10.0
}
fn default_straight_intake_delay_secs() -> f64 {
    5.0
}
fn default_reverse_secs() -> f64 {
    3.0
}
fn default_reverse_power() -> f64 {
    0.5
}
fn default_sim_ticks_per_sec() -> f64 {
    DEFAULT_TICKS_PER_SEC
}
fn default_sim_degrees_per_sec() -> f64 {
    DEFAULT_DEGREES_PER_SEC
}

impl Default for Config {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            stage_timeout_secs: default_stage_timeout_secs(),
            autonomous_secs: default_autonomous_secs(),
            ticks_per_foot: default_ticks_per_foot(),
            position: default_position(),
            game_data: String::new(),
            pickup_window_secs: default_pickup_window_secs(),
            straight_intake_delay_secs: default_straight_intake_delay_secs(),
            reverse_secs: default_reverse_secs(),
            reverse_power: default_reverse_power(),
            sim_ticks_per_sec: default_sim_ticks_per_sec(),
            sim_degrees_per_sec: default_sim_degrees_per_sec(),
        }
    }
}

impl Config {
    /// Control period, never shorter than one millisecond.
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms.max(1))
    }

    pub fn autonomous_period(&self) -> Duration {
        secs(self.autonomous_secs)
    }

    /// Supervisor settings derived from this file.
    pub fn autonomous(&self) -> AutonomousConfig {
        let stage_timeout = (self.stage_timeout_secs > 0.0).then(|| secs(self.stage_timeout_secs));
        AutonomousConfig {
            stage_timeout,
            reverse_duration: secs(self.reverse_secs),
            reverse_power: self.reverse_power,
            params: RoutineParams {
                ticks_per_foot: self.ticks_per_foot,
                pickup_window: secs(self.pickup_window_secs),
                straight_intake_delay: secs(self.straight_intake_delay_secs),
                ..RoutineParams::default()
            },
        }
    }
}

/// Negative, NaN and overflowing values clamp instead of panicking.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

/// Return the path to `~/.autodrive/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".autodrive").join("config.toml")
}

/// Load the config from a specific path.  Returns `None` if the file does not
/// exist.  Environment overrides are applied to a loaded file.
pub fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `AUTODRIVE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `AUTODRIVE_POSITION` | `position` |
/// | `AUTODRIVE_GAME_DATA` | `game_data` |
/// | `AUTODRIVE_PERIOD_MS` | `period_ms` |
/// | `AUTODRIVE_STAGE_TIMEOUT_SECS` | `stage_timeout_secs` |
///
/// Numbers that fail to parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("AUTODRIVE_POSITION") {
        cfg.position = v;
    }
    if let Ok(v) = std::env::var("AUTODRIVE_GAME_DATA") {
        cfg.game_data = v;
    }
    if let Ok(v) = std::env::var("AUTODRIVE_PERIOD_MS")
        && let Ok(ms) = v.trim().parse::<u64>()
    {
        cfg.period_ms = ms;
    }
    if let Ok(v) = std::env::var("AUTODRIVE_STAGE_TIMEOUT_SECS")
        && let Ok(s) = v.trim().parse::<f64>()
        && s.is_finite()
    {
        cfg.stage_timeout_secs = s;
    }
}

/// Save the config to a specific path, creating the parent directory if
/// necessary.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}
