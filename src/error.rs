//! # Error Types
//!
//! Custom error types for Dogbot Teleop using `thiserror`.

use thiserror::Error;

/// Main error type for Dogbot Teleop
#[derive(Debug, Error)]
pub enum DashboardError {
    /// No robot address has been entered yet
    #[error("no robot address configured")]
    NoTarget,

    /// Transport-level HTTP failures (connection refused, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The robot answered with a non-2xx status
    #[error("{endpoint} returned HTTP {status}")]
    HttpStatus { endpoint: &'static str, status: u16 },

    /// A telemetry response was missing a field or carried a non-numeric value
    #[error("malformed {endpoint} response: {reason}")]
    MalformedResponse { endpoint: &'static str, reason: String },

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input device errors
    #[error("Controller error: {0}")]
    Controller(String),

    /// No matching input device was found under /dev/input
    #[error("no {0} device found")]
    DeviceNotFound(&'static str),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Dogbot Teleop
pub type Result<T> = std::result::Result<T, DashboardError>;
