//! # Telemetry Types
//!
//! Snapshots polled from the robot's HTTP endpoints and their validation.
//!
//! Every snapshot is all-or-nothing: a response that lacks any expected field,
//! or carries a value that cannot be read as a number, is rejected as a whole
//! so the caller keeps its previous snapshot.
//!
//! Numeric fields are accepted either as JSON numbers or as numeric strings,
//! since the robot firmware formats some values as text.

use serde::Serialize;
use serde_json::Value;

use crate::error::{DashboardError, Result};

/// Leg numbers as they appear in the servo field names (`hipLeg1` .. `hipLeg4`).
pub const LEG_COUNT: usize = 4;

/// IMU reading: attitude in degrees and board temperature in °C.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TelemetrySnapshot {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub temperature: f64,
}

/// Battery pack reading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BatteryStatus {
    pub voltage: f64,
    pub percentage: i64,
}

/// Joint angles in degrees for all twelve servos, indexed by leg (0 = leg 1).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ServoAngles {
    pub hip: [f64; LEG_COUNT],
    pub shoulder: [f64; LEG_COUNT],
    pub knee: [f64; LEG_COUNT],
}

impl TelemetrySnapshot {
    /// Builds a snapshot from a `/getIMU` response body.
    ///
    /// # Errors
    ///
    /// `MalformedResponse` if any of `roll`, `pitch`, `yaw`, `temperature` is
    /// missing or not numeric.
    ///
    /// # Examples
    ///
    /// ```
    /// use dogbot_teleop::telemetry::TelemetrySnapshot;
    ///
    /// let body = serde_json::json!({"roll": 1.5, "pitch": "-2", "yaw": 90, "temperature": 31.2});
    /// let imu = TelemetrySnapshot::from_json(&body)?;
    /// assert_eq!(imu.pitch, -2.0);
    /// # Ok::<(), dogbot_teleop::error::DashboardError>(())
    /// ```
    pub fn from_json(body: &Value) -> Result<Self> {
        const ENDPOINT: &str = "/getIMU";
        Ok(Self {
            roll: number_field(body, ENDPOINT, "roll")?,
            pitch: number_field(body, ENDPOINT, "pitch")?,
            yaw: number_field(body, ENDPOINT, "yaw")?,
            temperature: number_field(body, ENDPOINT, "temperature")?,
        })
    }
}

impl BatteryStatus {
    /// Builds a battery status from a `/getBattery` response body.
    pub fn from_json(body: &Value) -> Result<Self> {
        const ENDPOINT: &str = "/getBattery";
        let voltage = number_field(body, ENDPOINT, "voltage")?;
        let percentage = number_field(body, ENDPOINT, "percentage")?.round() as i64;
        Ok(Self { voltage, percentage })
    }
}

impl ServoAngles {
    /// Builds servo angles from a `/getServo` response body.
    ///
    /// All twelve fields (`hipLeg1..4`, `shoulderLeg1..4`, `kneeLeg1..4`) must
    /// be present.
    pub fn from_json(body: &Value) -> Result<Self> {
        const ENDPOINT: &str = "/getServo";
        let mut angles = ServoAngles::default();
        for leg in 0..LEG_COUNT {
            let n = leg + 1;
            angles.hip[leg] = number_field(body, ENDPOINT, &format!("hipLeg{}", n))?;
            angles.shoulder[leg] = number_field(body, ENDPOINT, &format!("shoulderLeg{}", n))?;
            angles.knee[leg] = number_field(body, ENDPOINT, &format!("kneeLeg{}", n))?;
        }
        Ok(angles)
    }
}

/// Reads `field` from a JSON object as `f64`.
///
/// `null` counts as missing. Strings are trimmed and parsed.
fn number_field(body: &Value, endpoint: &'static str, field: &str) -> Result<f64> {
    let malformed = |reason: String| DashboardError::MalformedResponse { endpoint, reason };

    match body.get(field) {
        None | Some(Value::Null) => Err(malformed(format!("missing field '{}'", field))),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| malformed(format!("field '{}' is not representable as f64", field))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| malformed(format!("field '{}' is not numeric: {:?}", field, s))),
        Some(other) => Err(malformed(format!("field '{}' is not numeric: {}", field, other))),
    }
}
