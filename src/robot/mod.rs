//! # Robot Module
//!
//! HTTP interface of the robot's on-board server.
//!
//! The robot exposes three telemetry endpoints polled with `GET` and two
//! command endpoints that accept a plain-text `POST` body. [`RobotApi`] is the
//! seam the dashboard talks through; [`client::HttpRobotClient`] is the real
//! implementation.

use async_trait::async_trait;
use std::fmt;

use crate::controller::frame::ControllerPayload;
use crate::error::Result;
use crate::telemetry::{BatteryStatus, ServoAngles, TelemetrySnapshot};

pub mod client;

pub use client::HttpRobotClient;

/// Robot HTTP endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    GetImu,
    GetBattery,
    GetServo,
    SendKey,
    SendControllerData,
}

impl Endpoint {
    /// Request path, including the leading slash.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::GetImu => "/getIMU",
            Endpoint::GetBattery => "/getBattery",
            Endpoint::GetServo => "/getServo",
            Endpoint::SendKey => "/sendKey",
            Endpoint::SendControllerData => "/sendControllerData",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Address of the robot, `host` or `host:port`.
///
/// An empty target means no address has been entered yet.
///
/// # Examples
///
/// ```
/// use dogbot_teleop::robot::{ConnectionTarget, Endpoint};
///
/// let target = ConnectionTarget::new(" 192.168.1.50 ");
/// assert_eq!(target.url(Endpoint::GetImu), "http://192.168.1.50/getIMU");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionTarget(String);

impl ConnectionTarget {
    /// Builds a target from user input.
    ///
    /// Surrounding whitespace, an `http://` scheme and trailing slashes are
    /// dropped so the URL is always `http://{host}{path}`.
    pub fn new(input: &str) -> Self {
        let host = input.trim();
        let host = host.strip_prefix("http://").unwrap_or(host);
        Self(host.trim_end_matches('/').to_string())
    }

    pub fn host(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Full URL of `endpoint` on this robot.
    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("http://{}{}", self.0, endpoint.path())
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<unset>")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Operations the dashboard performs against the robot.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RobotApi: Send + Sync {
    /// Reachability check: `GET /getIMU`, any 2xx counts, body ignored.
    async fn probe(&self) -> Result<()>;

    async fn fetch_imu(&self) -> Result<TelemetrySnapshot>;

    async fn fetch_battery(&self) -> Result<BatteryStatus>;

    async fn fetch_servo(&self) -> Result<ServoAngles>;

    /// Posts a key command; returns the robot's reply text.
    async fn send_key(&self, body: &str) -> Result<String>;

    /// Posts a controller frame as JSON text; returns the robot's reply text.
    async fn send_controller_data(&self, payload: &ControllerPayload) -> Result<String>;
}
