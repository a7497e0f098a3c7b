// Configuration module for TPA System

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use toml::Value;
use tracing::{debug, info, warn};

use crate::core::constants::{
    DEFAULT_AUTO_REJECT_SECS, DEFAULT_TELEPORT_WAIT_SECS, MAX_TIMING_SECS, MIN_TIMING_SECS,
};
use crate::core::types::TimingSettings;

// =============================================================================
// CONFIGURATION STRUCTURES
// =============================================================================

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// Write logs to stdout
    #[serde(default)]
    pub console: bool,
    /// Log file path (relative to the config file or absolute). Empty = no file logging.
    #[serde(default = "default_log_file", rename = "log-file")]
    pub log_file: String,
    /// Level for this plugin's own logs; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_file() -> String {
    "tpa_system.log".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            console: false,
            log_file: default_log_file(),
            level: default_log_level(),
        }
    }
}

/// Main configuration structure
///
/// Timing values are kept as raw TOML values so that a mistyped entry only
/// affects its own key; use `timing_settings()` for the validated durations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(rename = "auto-reject-time-seconds", default = "default_auto_reject")]
    pub auto_reject_time_seconds: Value,
    #[serde(rename = "teleport-wait-time-seconds", default = "default_teleport_wait")]
    pub teleport_wait_time_seconds: Value,
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Message template overrides, keyed by message name
    #[serde(default)]
    pub messages: BTreeMap<String, String>,
}

fn default_auto_reject() -> Value {
    Value::Integer(DEFAULT_AUTO_REJECT_SECS as i64)
}

fn default_teleport_wait() -> Value {
    Value::Integer(DEFAULT_TELEPORT_WAIT_SECS as i64)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_reject_time_seconds: default_auto_reject(),
            teleport_wait_time_seconds: default_teleport_wait(),
            logging: LoggingSettings::default(),
            messages: BTreeMap::new(),
        }
    }
}

// =============================================================================
// CONFIG LOADING
// =============================================================================

#[derive(Debug)]
pub enum ConfigError {
    ReadError(std::io::Error),
    ParseError(toml::de::Error),
    WriteError(std::io::Error),
    SerializeError(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::ParseError(e) => write!(f, "Failed to parse config file: {}", e),
            ConfigError::WriteError(e) => write!(f, "Failed to write config file: {}", e),
            ConfigError::SerializeError(e) => write!(f, "Failed to serialize config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub const CONFIG_FILENAME: &'static str = "tpa_system.toml";

    /// Load configuration from `path`, falling back to defaults if the file
    /// does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "[config] No config found, using defaults");
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&contents).map_err(ConfigError::ParseError)?;
        info!(path = %path.display(), "[config] Loaded config");
        Ok(config)
    }

    /// Write the default configuration if no file exists yet.
    ///
    /// Returns true if a file was written.
    pub fn write_default_if_missing(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(ConfigError::WriteError)?;
        }
        let contents =
            toml::to_string_pretty(&Config::default()).map_err(ConfigError::SerializeError)?;
        fs::write(path, contents).map_err(ConfigError::WriteError)?;
        info!(path = %path.display(), "[config] Wrote default config");
        Ok(true)
    }

    /// Validated timing settings; each key that is missing, mistyped or out
    /// of range falls back to its default with a warning
    pub fn timing_settings(&self) -> TimingSettings {
        TimingSettings::new(
            read_time_setting(
                "auto-reject-time-seconds",
                &self.auto_reject_time_seconds,
                DEFAULT_AUTO_REJECT_SECS,
            ),
            read_time_setting(
                "teleport-wait-time-seconds",
                &self.teleport_wait_time_seconds,
                DEFAULT_TELEPORT_WAIT_SECS,
            ),
        )
    }

    /// Resolve the log file path against the config file's directory
    pub fn log_file_path(&self, config_path: &Path) -> Option<PathBuf> {
        if self.logging.log_file.is_empty() {
            return None;
        }
        let log_file = PathBuf::from(&self.logging.log_file);
        if log_file.is_absolute() {
            return Some(log_file);
        }
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        Some(base.join(log_file))
    }
}

/// Validate one timing entry. Anything that is not an integer in
/// `MIN_TIMING_SECS..=MAX_TIMING_SECS` falls back to the default with a
/// warning; other keys are unaffected.
fn read_time_setting(name: &str, value: &Value, default_secs: u64) -> Duration {
    match value {
        Value::Integer(secs) if (MIN_TIMING_SECS..=MAX_TIMING_SECS).contains(secs) => {
            return Duration::from_secs(*secs as u64);
        }
        Value::Integer(secs) if *secs > MAX_TIMING_SECS => warn!(
            setting = name,
            value = secs,
            max = MAX_TIMING_SECS,
            default = default_secs,
            "[config] Value too large, using default"
        ),
        _ => warn!(
            setting = name,
            value = %value,
            default = default_secs,
            "[config] Invalid value, using default"
        ),
    }
    Duration::from_secs(default_secs)
}

// =============================================================================
// TESTS
// =============================================================================
