use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid threshold {field}: {reason}")]
    InvalidThreshold { field: &'static str, reason: String },
}

/// Configuration for the authwatch daemon
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Input stream configuration
    pub input: InputConfig,
    /// Detection thresholds
    pub detection: DetectionConfig,
    /// Audit trail configuration
    pub output: OutputConfig,
    /// HTTP query interface configuration
    pub server: ServerConfig,
}

/// Input stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Path to the newline-delimited JSON log being tailed
    pub log_path: PathBuf,
    /// Tag that marks a login-failure record
    pub event_marker: String,
}

/// Detection thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Failures needed inside the rapid window
    pub rapid_count: u32,
    /// Length of the rapid window in seconds
    pub rapid_window_seconds: f64,
    /// Failures that trigger a block regardless of timing
    pub volume_count: u32,
    /// Inactivity after which an address drops out of the active view
    pub active_window_seconds: f64,
}

/// Audit trail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Append-only block/unblock history
    pub audit_path: PathBuf,
    /// Number of audit lines returned by the blocked list
    pub recent_events: usize,
}

/// HTTP query interface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Pause between synthetic records written by /simulate
    pub simulate_delay_ms: u64,
    pub default_simulate_ip: String,
    pub default_simulate_count: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            log_path: PathBuf::from("./logs/cowrie/cowrie.json"),
            event_marker: "cowrie.login.failed".to_string(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        DetectionConfig {
            rapid_count: 3,
            rapid_window_seconds: 30.0,
            volume_count: 6,
            active_window_seconds: 300.0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            audit_path: PathBuf::from("blocked_ips.txt"),
            recent_events: 10,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
            simulate_delay_ms: 100,
            default_simulate_ip: "192.168.1.100".to_string(),
            default_simulate_count: 3,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject thresholds the detector cannot work with.
    ///
    /// Called once at startup; an invalid configuration is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.detection;
        if d.rapid_count == 0 {
            return Err(invalid("rapid_count", "must be at least 1"));
        }
        if d.volume_count == 0 {
            return Err(invalid("volume_count", "must be at least 1"));
        }
        if !d.rapid_window_seconds.is_finite() || d.rapid_window_seconds < 0.0 {
            return Err(invalid(
                "rapid_window_seconds",
                format!("must be a non-negative number, got {}", d.rapid_window_seconds),
            ));
        }
        if !d.active_window_seconds.is_finite() || d.active_window_seconds <= 0.0 {
            return Err(invalid(
                "active_window_seconds",
                format!("must be positive, got {}", d.active_window_seconds),
            ));
        }
        if self.output.recent_events == 0 {
            return Err(invalid("recent_events", "must be at least 1"));
        }
        if self.input.event_marker.is_empty() {
            return Err(invalid("event_marker", "must not be empty"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidThreshold {
        field,
        reason: reason.into(),
    }
}
