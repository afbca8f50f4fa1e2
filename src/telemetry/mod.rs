//! # Telemetry Module
//!
//! Telemetry polled from the robot and its optional on-disk recording.
//!
//! This module handles:
//! - Validating IMU, battery and servo responses (all fields or nothing)
//! - Formatting snapshots as JSONL (JSON Lines)
//! - Writing to rotating log files
//! - Retaining only the last N files

pub mod recorder;
pub mod types;

pub use recorder::{TelemetryRecord, TelemetryRecorder};
pub use types::{BatteryStatus, ServoAngles, TelemetrySnapshot, LEG_COUNT};
