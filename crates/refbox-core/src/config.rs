//! Configuration loading and typed config structures for the game controller.
//!
//! The binary reads `refbox-config.yaml` from the working directory, or the
//! path given as its first argument. This module defines strongly-typed structs that mirror the YAML structure and
//! provides a loader that reads and validates the file. Every section has
//! defaults matching the official competition rules, so an empty file (or
//! no file at all) yields a usable controller.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use refbox_types::{GameDuration, MatchState, Stage, TeamInfo};
use serde::{Deserialize, Deserializer};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level controller configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RefboxConfig {
    /// Match timing and team budgets.
    #[serde(default)]
    pub game: GameConfig,

    /// Recovery snapshot and audit log locations.
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Broadcast sink target.
    #[serde(default)]
    pub publish: PublishConfig,

    /// Operator UI / live viewer server.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RefboxConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `REFBOX_PUBLISH_ADDRESS` overrides `publish.address`
    /// - `REFBOX_LOG_DIR` overrides `persistence.log_dir`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty map.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("REFBOX_PUBLISH_ADDRESS") {
            self.publish.address = val;
        }
        if let Ok(val) = std::env::var("REFBOX_LOG_DIR") {
            self.persistence.log_dir = PathBuf::from(val);
        }
    }
}

// ---------------------------------------------------------------------------
// Game timing
// ---------------------------------------------------------------------------

/// Match timing parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameConfig {
    /// Regulation time. Omitted keys keep the regulation defaults.
    #[serde(
        default = "HalvesConfig::regulation",
        deserialize_with = "regulation_halves"
    )]
    pub normal: HalvesConfig,

    /// Overtime. Omitted keys keep the overtime defaults.
    #[serde(default = "HalvesConfig::overtime", deserialize_with = "overtime_halves")]
    pub overtime: HalvesConfig,

    /// Suspension time of a yellow card, in seconds.
    #[serde(default = "default_yellow_card_duration_secs")]
    pub yellow_card_duration_secs: u32,

    /// Team name used for both teams until the operator renames them.
    #[serde(default = "default_team_name")]
    pub default_team_name: String,
}

impl GameConfig {
    /// Nominal duration of every stage of the schedule.
    pub fn stage_times(&self) -> StageTimes {
        let mut times: BTreeMap<Stage, GameDuration> = Stage::ALL
            .into_iter()
            .map(|stage| (stage, GameDuration::ZERO))
            .collect();
        times.insert(Stage::FirstHalf, secs(self.normal.half_duration_secs));
        times.insert(Stage::HalfTime, secs(self.normal.half_time_duration_secs));
        times.insert(Stage::SecondHalf, secs(self.normal.half_duration_secs));
        times.insert(Stage::OvertimeBreak, secs(self.normal.break_after_secs));
        times.insert(Stage::OvertimeFirstHalf, secs(self.overtime.half_duration_secs));
        times.insert(
            Stage::OvertimeHalfTime,
            secs(self.overtime.half_time_duration_secs),
        );
        times.insert(Stage::OvertimeSecondHalf, secs(self.overtime.half_duration_secs));
        times.insert(Stage::ShootoutBreak, secs(self.overtime.break_after_secs));
        StageTimes { times }
    }

    /// Suspension time of a yellow card.
    pub fn yellow_card_duration(&self) -> GameDuration {
        secs(self.yellow_card_duration_secs)
    }

    /// A fresh, halted pre-game state with regulation timeout budgets.
    pub fn initial_state(&self) -> MatchState {
        MatchState::new(&TeamInfo::new(
            self.default_team_name.clone(),
            self.normal.timeouts,
            secs(self.normal.timeout_duration_secs),
        ))
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            normal: HalvesConfig::regulation(),
            overtime: HalvesConfig::overtime(),
            yellow_card_duration_secs: default_yellow_card_duration_secs(),
            default_team_name: default_team_name(),
        }
    }
}

/// Timing of one pair of halves (regulation or overtime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HalvesConfig {
    /// Length of each half, in seconds.
    pub half_duration_secs: u32,
    /// Length of the break between the halves, in seconds.
    pub half_time_duration_secs: u32,
    /// Length of the break after the second half, in seconds.
    pub break_after_secs: u32,
    /// Timeout time budget per team, in seconds.
    pub timeout_duration_secs: u32,
    /// Number of timeouts per team.
    pub timeouts: u32,
}

impl HalvesConfig {
    /// Regulation defaults: 5 minute halves, 4 timeouts totalling 5 minutes.
    pub const fn regulation() -> Self {
        Self {
            half_duration_secs: 300,
            half_time_duration_secs: 300,
            break_after_secs: 300,
            timeout_duration_secs: 300,
            timeouts: 4,
        }
    }

    /// Overtime defaults: 2.5 minute halves, 2 timeouts totalling 2.5 minutes.
    pub const fn overtime() -> Self {
        Self {
            half_duration_secs: 150,
            half_time_duration_secs: 120,
            break_after_secs: 120,
            timeout_duration_secs: 150,
            timeouts: 2,
        }
    }
}

/// A halves section as written in YAML, where any key may be missing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HalvesOverrides {
    half_duration_secs: Option<u32>,
    half_time_duration_secs: Option<u32>,
    break_after_secs: Option<u32>,
    timeout_duration_secs: Option<u32>,
    timeouts: Option<u32>,
}

impl HalvesOverrides {
    fn apply_to(self, base: HalvesConfig) -> HalvesConfig {
        HalvesConfig {
            half_duration_secs: self.half_duration_secs.unwrap_or(base.half_duration_secs),
            half_time_duration_secs: self
                .half_time_duration_secs
                .unwrap_or(base.half_time_duration_secs),
            break_after_secs: self.break_after_secs.unwrap_or(base.break_after_secs),
            timeout_duration_secs: self
                .timeout_duration_secs
                .unwrap_or(base.timeout_duration_secs),
            timeouts: self.timeouts.unwrap_or(base.timeouts),
        }
    }
}

fn regulation_halves<'de, D: Deserializer<'de>>(deserializer: D) -> Result<HalvesConfig, D::Error> {
    HalvesOverrides::deserialize(deserializer).map(|o| o.apply_to(HalvesConfig::regulation()))
}

fn overtime_halves<'de, D: Deserializer<'de>>(deserializer: D) -> Result<HalvesConfig, D::Error> {
    HalvesOverrides::deserialize(deserializer).map(|o| o.apply_to(HalvesConfig::overtime()))
}

/// Nominal duration of each [`Stage`], derived from [`GameConfig`].
///
/// Stages without a scheduled duration (pre-game, shootout, post-game) map
/// to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTimes {
    times: BTreeMap<Stage, GameDuration>,
}

impl StageTimes {
    /// Scheduled duration of `stage`.
    pub fn get(&self, stage: Stage) -> GameDuration {
        self.times.get(&stage).copied().unwrap_or(GameDuration::ZERO)
    }
}

// ---------------------------------------------------------------------------
// Persistence, publishing, observer, logging
// ---------------------------------------------------------------------------

/// Where the recovery snapshot and audit logs are written.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersistenceConfig {
    /// Directory holding the recovery snapshot and the audit logs.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// File name of the recovery snapshot inside `log_dir`.
    #[serde(default = "default_last_state_file")]
    pub last_state_file: String,

    /// Recovery snapshots of this size or larger are refused at startup.
    #[serde(default = "default_max_snapshot_bytes")]
    pub max_snapshot_bytes: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            last_state_file: default_last_state_file(),
            max_snapshot_bytes: default_max_snapshot_bytes(),
        }
    }
}

/// Broadcast sink target.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublishConfig {
    /// `host:port` the referee frames are sent to (usually multicast).
    #[serde(default = "default_publish_address")]
    pub address: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            address: default_publish_address(),
        }
    }
}

/// Operator UI / live viewer server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Bind address.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit one JSON object per line instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn secs(value: u32) -> GameDuration {
    GameDuration::from_secs(i64::from(value))
}

const fn default_yellow_card_duration_secs() -> u32 {
    120
}

fn default_team_name() -> String {
    "Unknown".to_owned()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_last_state_file() -> String {
    "lastState.json".to_owned()
}

const fn default_max_snapshot_bytes() -> usize {
    10_000
}

fn default_publish_address() -> String {
    "224.5.23.1:10003".to_owned()
}

fn default_observer_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_observer_port() -> u16 {
    8081
}

fn default_log_level() -> String {
    "info".to_owned()
}
