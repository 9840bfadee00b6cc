//! Configuration: recognised options, defaults, TOML/env loader.
//!
//! # Load Order
//!
//! 1. Compile-time defaults
//! 2. TOML file (when a path is given and the file exists)
//! 3. Environment variables (`SAUNA_*`)
//!
//! Each layer overrides the previous. Missing files are ignored;
//! files that exist but do not parse are an error.

use sauna_types::{ErrorCode, FlicMapping, McbStatusSource, NotificationKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("cannot read config file {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not valid TOML for this schema.
    #[error("cannot parse config file {}: {source}", path.display())]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// An environment variable held an unusable value.
    #[error("invalid value in {var}: {reason}")]
    InvalidEnvVar { var: &'static str, reason: String },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::ReadFile { .. } => "CONFIG_READ",
            Self::ParseToml { .. } => "CONFIG_PARSE",
            Self::InvalidEnvVar { .. } => "CONFIG_ENV",
        }
    }

    fn is_recoverable(&self) -> bool {
        // The operator can fix the file or the environment.
        true
    }
}

/// Notification cooldowns, per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Cooldown after a safety-shutdown notification, ms.
    pub safety_shutdown_cooldown_ms: u64,
    /// Cooldown after a temperature alert, ms.
    pub temperature_alert_cooldown_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            safety_shutdown_cooldown_ms: 60_000,
            temperature_alert_cooldown_ms: 300_000,
        }
    }
}

impl NotificationConfig {
    /// The cooldown map the rate limiter is built from.
    #[must_use]
    pub fn cooldowns(&self) -> HashMap<NotificationKind, Duration> {
        HashMap::from([
            (
                NotificationKind::SafetyShutdown,
                Duration::from_millis(self.safety_shutdown_cooldown_ms),
            ),
            (
                NotificationKind::TemperatureAlert,
                Duration::from_millis(self.temperature_alert_cooldown_ms),
            ),
        ])
    }
}

/// Ventilator relay options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VentilatorConfig {
    /// Relay address. Empty disables the ventilator integration.
    pub ip: String,
    /// Post-run delay before the relay turns off.
    pub delay_off_minutes: u64,
    /// Keep-alive cycling period.
    pub keep_alive_minutes: u64,
    /// Per-request relay timeout, ms.
    pub timeout_ms: u64,
    /// Master switch for the integration.
    pub enabled: bool,
}

impl Default for VentilatorConfig {
    fn default() -> Self {
        Self {
            ip: String::new(),
            delay_off_minutes: 60,
            keep_alive_minutes: 25,
            timeout_ms: 5_000,
            enabled: true,
        }
    }
}

impl VentilatorConfig {
    /// Delay-off as a duration.
    #[must_use]
    pub fn delay_off(&self) -> Duration {
        Duration::from_secs(self.delay_off_minutes * 60)
    }

    /// Keep-alive period as a duration.
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_minutes * 60)
    }

    /// Relay call timeout as a duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Floor-heating thermostat options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloorHeatingConfig {
    /// Device id on the local protocol.
    pub device_id: String,
    /// Local protocol key.
    pub local_key: String,
    /// Local protocol version, e.g. "3.3".
    pub protocol_version: String,
    /// Setpoint while the sauna is on.
    pub target_on_c: f64,
    /// Standby setpoint.
    pub target_off_c: f64,
    /// Status poll period, ms.
    pub poll_interval_ms: u64,
}

impl Default for FloorHeatingConfig {
    fn default() -> Self {
        Self {
            device_id: String::new(),
            local_key: String::new(),
            protocol_version: "3.3".into(),
            target_on_c: 21.0,
            target_off_c: 5.0,
            poll_interval_ms: 30_000,
        }
    }
}

impl FloorHeatingConfig {
    /// Poll period as a duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// The full recognised option set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaunaConfig {
    /// Per-phase trip threshold, amperes.
    pub amperage_threshold: f64,
    /// Meter polling interval, ms.
    pub polling_interval_ms: u64,
    /// Minimum interval between safety trips, ms.
    pub switch_off_cooldown_ms: u64,
    /// Cabin temperature that raises an alert, Celsius.
    pub temperature_alert_celsius: f64,
    /// Master switch for the phase-threshold check.
    pub safety_enabled: bool,
    /// Which MCB observation path is authoritative.
    pub mcb_status_source: McbStatusSource,
    /// Notification cooldowns.
    pub notification: NotificationConfig,
    /// Ventilator options.
    pub ventilator: VentilatorConfig,
    /// Floor-heating options.
    pub floor_heating: FloorHeatingConfig,
    /// Button gesture mapping.
    pub flic: FlicMapping,
}

impl Default for SaunaConfig {
    fn default() -> Self {
        Self {
            amperage_threshold: 25.0,
            polling_interval_ms: 5_000,
            switch_off_cooldown_ms: 10_000,
            temperature_alert_celsius: 85.0,
            safety_enabled: true,
            mcb_status_source: McbStatusSource::Device,
            notification: NotificationConfig::default(),
            ventilator: VentilatorConfig::default(),
            floor_heating: FloorHeatingConfig::default(),
            flic: FlicMapping::default(),
        }
    }
}

impl SaunaConfig {
    /// Parses a TOML document over the defaults.
    ///
    /// # Errors
    ///
    /// Returns the underlying TOML error for unknown or mistyped
    /// fields.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Safety trip cooldown as a duration.
    #[must_use]
    pub fn switch_off_cooldown(&self) -> Duration {
        Duration::from_millis(self.switch_off_cooldown_ms)
    }
}

/// Configuration loader with builder pattern.
///
/// # Example
///
/// ```ignore
/// let config = ConfigLoader::new()
///     .with_path("/etc/sauna/config.toml")
///     .skip_env_vars()  // for deterministic tests
///     .load()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
    skip_env: bool,
}

impl ConfigLoader {
    /// Creates a loader with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the config file path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Skips environment variable overrides.
    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Loads and merges configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a config file exists but cannot be
    /// parsed, or an env override holds garbage. A missing file is
    /// silently ignored.
    pub fn load(&self) -> Result<SaunaConfig, ConfigError> {
        let mut config = SaunaConfig::default();

        if let Some(path) = &self.path {
            if let Some(loaded) = load_file(path)? {
                debug!(path = %path.display(), "loaded config file");
                config = loaded;
            }
        }

        if !self.skip_env {
            apply_env_vars(&mut config)?;
        }

        Ok(config)
    }
}

fn load_file(path: &Path) -> Result<Option<SaunaConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let config = SaunaConfig::from_toml(&content).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(config))
}

fn apply_env_vars(config: &mut SaunaConfig) -> Result<(), ConfigError> {
    if let Ok(val) = std::env::var("SAUNA_AMPERAGE_THRESHOLD") {
        config.amperage_threshold =
            val.parse()
                .map_err(|_| ConfigError::InvalidEnvVar {
                    var: "SAUNA_AMPERAGE_THRESHOLD",
                    reason: format!("expected number, got '{val}'"),
                })?;
    }
    if let Ok(val) = std::env::var("SAUNA_SAFETY_ENABLED") {
        config.safety_enabled = parse_bool(&val).ok_or(ConfigError::InvalidEnvVar {
            var: "SAUNA_SAFETY_ENABLED",
            reason: format!("expected bool, got '{val}'"),
        })?;
    }
    if let Ok(val) = std::env::var("SAUNA_MCB_STATUS_SOURCE") {
        config.mcb_status_source = match val.to_lowercase().as_str() {
            "device" => McbStatusSource::Device,
            "meter" => McbStatusSource::Meter,
            _ => {
                return Err(ConfigError::InvalidEnvVar {
                    var: "SAUNA_MCB_STATUS_SOURCE",
                    reason: format!("expected 'device' or 'meter', got '{val}'"),
                })
            }
        };
    }
    if let Ok(val) = std::env::var("SAUNA_VENTILATOR_IP") {
        config.ventilator.ip = val;
    }
    Ok(())
}

/// Parses a boolean from string.
///
/// Accepts: "true", "false", "1", "0", "yes", "no", "on", "off"
/// (case-insensitive).
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
