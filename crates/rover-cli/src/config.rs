//! Vehicle configuration – reads/writes a TOML file, `~/.rover/config.toml`
//! unless another path is given.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rover_control::{LoopParams, NavigationParams};
use rover_hal::MotorConfig;
use rover_types::{Angle, Centimeters, RoverError};
use serde::{Deserialize, Serialize};

/// One `[[sensors]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SensorConfig {
    /// SRF08 on its own bus address.
    Ultrasonic {
        angle: Angle,
        address: u8,
        /// Distance reported by the bench simulation.
        #[serde(default = "default_sim_distance")]
        sim_distance_cm: Centimeters,
    },
    /// Infrared ranger on a channel of the shared converter.
    Infrared {
        angle: Angle,
        channel: u8,
        #[serde(default = "default_sim_distance")]
        sim_distance_cm: Centimeters,
    },
}

impl SensorConfig {
    pub fn angle(&self) -> Angle {
        match self {
            SensorConfig::Ultrasonic { angle, .. } | SensorConfig::Infrared { angle, .. } => *angle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorSettings {
    pub full_scale: i32,
    pub brake_threshold: i32,
    pub brake_pulse_ms: u64,
}

impl Default for MotorSettings {
    fn default() -> Self {
        let motor = MotorConfig::default();
        Self {
            full_scale: motor.full_scale,
            brake_threshold: motor.brake_threshold,
            brake_pulse_ms: motor.pulse_hold.as_millis() as u64,
        }
    }
}

impl MotorSettings {
    pub fn to_motor_config(&self) -> MotorConfig {
        MotorConfig {
            full_scale: self.full_scale,
            brake_threshold: self.brake_threshold,
            pulse_hold: Duration::from_millis(self.brake_pulse_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringSettings {
    /// Largest steering command in percent of full lock.
    pub limit: i32,
}

impl Default for SteeringSettings {
    fn default() -> Self {
        Self { limit: 100 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    /// Whether a motion sensor is fitted.
    pub enabled: bool,
    /// dy reported on every poll by the bench simulation.
    pub sim_dy: i32,
}

/// Persisted vehicle configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub navigation: NavigationParams,

    #[serde(default)]
    pub control: LoopParams,

    #[serde(default)]
    pub motor: MotorSettings,

    #[serde(default)]
    pub steering: SteeringSettings,

    #[serde(default)]
    pub motion: MotionSettings,

    #[serde(default = "default_sensors")]
    pub sensors: Vec<SensorConfig>,
}

fn default_sim_distance() -> Centimeters {
    200
}

/// Front and short-range sides on ultrasonic rangers, long-range sides on
/// the infrared converter.
fn default_sensors() -> Vec<SensorConfig> {
    vec![
        SensorConfig::Ultrasonic {
            angle: Angle::FRONT,
            address: 0x70,
            sim_distance_cm: 150,
        },
        SensorConfig::Ultrasonic {
            angle: Angle::wrapping(45),
            address: 0x71,
            sim_distance_cm: 100,
        },
        SensorConfig::Ultrasonic {
            angle: Angle::wrapping(135),
            address: 0x72,
            sim_distance_cm: 100,
        },
        SensorConfig::Infrared {
            angle: Angle::wrapping(90),
            channel: 0,
            sim_distance_cm: 120,
        },
        SensorConfig::Infrared {
            angle: Angle::wrapping(270),
            channel: 1,
            sim_distance_cm: 120,
        },
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            navigation: NavigationParams::default(),
            control: LoopParams::default(),
            motor: MotorSettings::default(),
            steering: SteeringSettings::default(),
            motion: MotionSettings::default(),
            sensors: default_sensors(),
        }
    }
}

/// Pick the config file: the explicit path, else `$ROVER_CONFIG`, else
/// `~/.rover/config.toml`.
pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    resolve_path_with(explicit, std::env::var("ROVER_CONFIG").ok(), &home)
}

pub(crate) fn resolve_path_with(explicit: Option<PathBuf>, env: Option<String>, home: &str) -> PathBuf {
    explicit
        .or_else(|| env.filter(|p| !p.is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| config_path_for_home(home))
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".rover").join("config.toml")
}

/// Load `path` (defaults when the file is missing), then apply `ROVER_*`
/// overrides.
pub fn load(path: &Path) -> Result<Config, RoverError> {
    let mut cfg = load_from(path)?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Parse the config at `path`.  Returns `None` if the file does not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, RoverError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| RoverError::Config(format!("failed to read {}: {e}", path.display())))?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| RoverError::Config(format!("failed to parse {}: {e}", path.display())))?;
    Ok(Some(cfg))
}

/// Apply `ROVER_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ROVER_CYCLE_MS` | `control.cycle_period_ms` |
/// | `ROVER_MIN_SPEED` | `control.min_speed` |
///
/// Unparsable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ROVER_CYCLE_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.control.cycle_period_ms = ms;
    }
    if let Ok(v) = std::env::var("ROVER_MIN_SPEED")
        && let Ok(speed) = v.parse::<i32>()
    {
        cfg.control.min_speed = speed;
    }
}

/// Write `cfg` to `path`, creating the parent directory if necessary.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), RoverError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| RoverError::Config(format!("failed to create {}: {e}", parent.display())))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| RoverError::Config(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw).map_err(|e| RoverError::Config(format!("failed to write {}: {e}", path.display())))
}
