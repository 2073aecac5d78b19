//! Bridge configuration.
//!
//! Stored as TOML in the platform data directory. Missing files and missing
//! keys fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bridge::BridgeSettings;
use crate::receiver::{DEFAULT_PRODUCT_ID, DEFAULT_REPORT_SIZE, DEFAULT_VENDOR_ID};
use crate::slimevr::{DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT};

/// Bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Receiver settings
    pub receiver: ReceiverSettings,
    /// SlimeVR server settings
    pub server: ServerSettings,
    /// Loop timing settings
    pub timing: TimingSettings,
}

impl BridgeConfig {
    /// Server address as `host:port`.
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Convert to orchestrator settings.
    pub fn bridge_settings(&self) -> BridgeSettings {
        BridgeSettings {
            vendor_id: self.receiver.vendor_id,
            product_id: self.receiver.product_id,
            report_size: self.receiver.report_size,
            read_timeout: Duration::from_millis(self.receiver.read_timeout_ms),
            idle_sleep: Duration::from_millis(self.timing.idle_sleep_ms),
            read_error_backoff: Duration::from_millis(self.timing.read_error_backoff_ms),
            heartbeat_interval: Duration::from_millis(self.timing.heartbeat_interval_ms),
            telemetry_interval: Duration::from_secs(self.timing.telemetry_interval_secs),
        }
    }
}

/// Receiver-related settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverSettings {
    /// USB vendor ID
    pub vendor_id: u16,
    /// USB product ID
    pub product_id: u16,
    /// HID report size in bytes
    pub report_size: usize,
    /// Read timeout in milliseconds
    pub read_timeout_ms: u64,
}

impl Default for ReceiverSettings {
    fn default() -> Self {
        Self {
            vendor_id: DEFAULT_VENDOR_ID,
            product_id: DEFAULT_PRODUCT_ID,
            report_size: DEFAULT_REPORT_SIZE,
            read_timeout_ms: 10,
        }
    }
}

/// SlimeVR server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server host name or address
    pub host: String,
    /// Server UDP port
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_SERVER_PORT,
        }
    }
}

/// Loop timing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// Heartbeat period in milliseconds
    pub heartbeat_interval_ms: u64,
    /// Battery resend interval in seconds
    pub telemetry_interval_secs: u64,
    /// Pause after an empty read in milliseconds
    pub idle_sleep_ms: u64,
    /// Pause after a read error in milliseconds
    pub read_error_backoff_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 1000,
            telemetry_interval_secs: 5,
            idle_sleep_ms: 1,
            read_error_backoff_ms: 100,
        }
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "slimebridge", "SlimeBridge")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load configuration from the default location, writing defaults on first run.
pub fn load_config() -> Result<BridgeConfig, ConfigError> {
    load_or_init_config(&get_config_path())
}

/// Load configuration from `path`, creating it with defaults if it does not exist.
///
/// A default file that cannot be written is logged and the defaults are still used.
pub fn load_or_init_config(path: &Path) -> Result<BridgeConfig, ConfigError> {
    if path.exists() {
        return load_config_from(path);
    }

    let config = BridgeConfig::default();
    match save_config_to(&config, path) {
        Ok(()) => tracing::info!("Wrote default configuration to {}", path.display()),
        Err(e) => tracing::warn!("Could not write default configuration: {}", e),
    }

    Ok(config)
}

/// Load configuration from `path`, using defaults if it does not exist.
pub fn load_config_from(path: &Path) -> Result<BridgeConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(BridgeConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Save configuration to `path`.
pub fn save_config_to(config: &BridgeConfig, path: &Path) -> Result<(), ConfigError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
