//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every field is optional; anything left out falls back to
//! the defaults below, so an empty file (or no file at all) yields a working
//! configuration that only lacks a robot address.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::controller::keyboard::key_code_from_name;
use crate::error::{DashboardError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub robot: RobotConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub keyboard: KeyboardConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub cameras: CamerasConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Robot HTTP endpoint configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RobotConfig {
    /// Host (or host:port) of the robot's HTTP server. Empty until entered.
    #[serde(default)]
    pub address: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Poll cadences
#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,

    #[serde(default = "default_imu_interval_ms")]
    pub imu_interval_ms: u64,

    #[serde(default = "default_battery_interval_ms")]
    pub battery_interval_ms: u64,

    #[serde(default = "default_servo_interval_ms")]
    pub servo_interval_ms: u64,
}

/// Gamepad configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Explicit `/dev/input/eventN` path; empty means auto-detect.
    #[serde(default)]
    pub device_path: String,

    #[serde(default = "default_frame_rate_hz")]
    pub frame_rate_hz: u32,

    #[serde(default = "default_min_send_interval_ms")]
    pub min_send_interval_ms: u64,

    #[serde(default = "default_trigger_threshold")]
    pub trigger_threshold: f64,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Keyboard configuration
#[derive(Debug, Deserialize, Clone)]
pub struct KeyboardConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub device_path: String,

    /// Key that drives the reset-yaw command instead of being forwarded.
    /// Empty disables the binding.
    #[serde(default = "default_reset_yaw_key")]
    pub reset_yaw_key: String,
}

/// Telemetry recording configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Status report configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
}

/// Camera stream pages served by the camera devices themselves
#[derive(Debug, Deserialize, Clone)]
pub struct CamerasConfig {
    #[serde(default = "default_camera_streams")]
    pub streams: Vec<String>,
}

/// Application log output
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for daily-rotated log files. Empty logs to stdout only.
    #[serde(default)]
    pub log_dir: String,
}

// Default value functions
fn default_request_timeout_ms() -> u64 { 1000 }

fn default_probe_interval_ms() -> u64 { 5000 }
fn default_imu_interval_ms() -> u64 { 50 }
fn default_battery_interval_ms() -> u64 { 5000 }
fn default_servo_interval_ms() -> u64 { 100 }

fn default_enabled() -> bool { true }
fn default_frame_rate_hz() -> u32 { 60 }
fn default_min_send_interval_ms() -> u64 { 50 }
fn default_trigger_threshold() -> f64 { 0.10 }
fn default_reconnect_interval_ms() -> u64 { 1000 }

fn default_reset_yaw_key() -> String { "Home".to_string() }

fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u64 { 100 }
fn default_log_format() -> String { "jsonl".to_string() }

fn default_status_interval_ms() -> u64 { 1000 }

fn default_camera_streams() -> Vec<String> {
    vec![
        "http://192.168.1.131/web/admin.html".to_string(),
        "http://192.168.1.131/web/admin.html".to_string(),
    ]
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            probe_interval_ms: default_probe_interval_ms(),
            imu_interval_ms: default_imu_interval_ms(),
            battery_interval_ms: default_battery_interval_ms(),
            servo_interval_ms: default_servo_interval_ms(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            device_path: String::new(),
            frame_rate_hz: default_frame_rate_hz(),
            min_send_interval_ms: default_min_send_interval_ms(),
            trigger_threshold: default_trigger_threshold(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            device_path: String::new(),
            reset_yaw_key: default_reset_yaw_key(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            log_interval_ms: default_log_interval_ms(),
            format: default_log_format(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { status_interval_ms: default_status_interval_ms() }
    }
}

impl Default for CamerasConfig {
    fn default() -> Self {
        Self { streams: default_camera_streams() }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dogbot_teleop::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Load a configuration file if it exists, otherwise use the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.robot.address.chars().any(char::is_whitespace) {
            return Err(invalid("robot address cannot contain whitespace"));
        }

        for (name, value, min, max) in [
            ("request_timeout_ms", self.robot.request_timeout_ms, 1, 60_000),
            ("probe_interval_ms", self.polling.probe_interval_ms, 1, 60_000),
            ("imu_interval_ms", self.polling.imu_interval_ms, 1, 60_000),
            ("battery_interval_ms", self.polling.battery_interval_ms, 1, 600_000),
            ("servo_interval_ms", self.polling.servo_interval_ms, 1, 60_000),
            ("min_send_interval_ms", self.controller.min_send_interval_ms, 1, 10_000),
            ("reconnect_interval_ms", self.controller.reconnect_interval_ms, 1, 60_000),
            ("log_interval_ms", self.telemetry.log_interval_ms, 1, 60_000),
            ("status_interval_ms", self.display.status_interval_ms, 1, 60_000),
        ] {
            if value < min || value > max {
                return Err(invalid(format!("{} must be between {} and {}", name, min, max)));
            }
        }

        if self.controller.frame_rate_hz == 0 || self.controller.frame_rate_hz > 240 {
            return Err(invalid("frame_rate_hz must be between 1 and 240"));
        }

        if !(0.0..=1.0).contains(&self.controller.trigger_threshold) {
            return Err(invalid("trigger_threshold must be between 0.0 and 1.0"));
        }

        if !self.keyboard.reset_yaw_key.is_empty()
            && key_code_from_name(&self.keyboard.reset_yaw_key).is_none()
        {
            return Err(invalid(format!(
                "reset_yaw_key '{}' is not a known key name",
                self.keyboard.reset_yaw_key
            )));
        }

        // Validate telemetry recording
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.telemetry.format != "jsonl" {
            return Err(invalid("log format must be 'jsonl' (only supported format)"));
        }

        Ok(())
    }
}

fn invalid(msg: impl std::fmt::Display) -> DashboardError {
    DashboardError::Config(toml::de::Error::custom(msg))
}
