//! # HTTP Robot Client
//!
//! `reqwest` implementation of [`RobotApi`].
//!
//! The target address is read from a `watch` channel on every request, so a
//! newly entered address takes effect on the very next poll without rebuilding
//! the client. Each request carries its own timeout; a poll that outlives it
//! fails like any other transport error.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::Duration;
use tracing::debug;

use super::{ConnectionTarget, Endpoint, RobotApi};
use crate::config::RobotConfig;
use crate::controller::frame::ControllerPayload;
use crate::error::{DashboardError, Result};
use crate::telemetry::{BatteryStatus, ServoAngles, TelemetrySnapshot};

/// Robot client over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpRobotClient {
    http: reqwest::Client,
    target: watch::Receiver<ConnectionTarget>,
}

impl HttpRobotClient {
    /// Creates a client that follows `target` and aborts requests after
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `Http` if the underlying client cannot be built.
    pub fn new(target: watch::Receiver<ConnectionTarget>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, target })
    }

    pub fn from_config(config: &RobotConfig, target: watch::Receiver<ConnectionTarget>) -> Result<Self> {
        Self::new(target, Duration::from_millis(config.request_timeout_ms))
    }

    fn url(&self, endpoint: Endpoint) -> Result<String> {
        let target = self.target.borrow();
        if target.is_empty() {
            return Err(DashboardError::NoTarget);
        }
        Ok(target.url(endpoint))
    }

    async fn get(&self, endpoint: Endpoint) -> Result<reqwest::Response> {
        let url = self.url(endpoint)?;
        debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;
        check_status(endpoint, response)
    }

    async fn get_json(&self, endpoint: Endpoint) -> Result<Value> {
        let body = self.get(endpoint).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn post_text(&self, endpoint: Endpoint, body: String) -> Result<String> {
        let url = self.url(endpoint)?;
        debug!("POST {} ({} bytes)", url, body.len());
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await?;
        Ok(check_status(endpoint, response)?.text().await?)
    }
}

fn check_status(endpoint: Endpoint, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(DashboardError::HttpStatus { endpoint: endpoint.path(), status: status.as_u16() })
    }
}

#[async_trait]
impl RobotApi for HttpRobotClient {
    async fn probe(&self) -> Result<()> {
        self.get(Endpoint::GetImu).await.map(|_| ())
    }

    async fn fetch_imu(&self) -> Result<TelemetrySnapshot> {
        TelemetrySnapshot::from_json(&self.get_json(Endpoint::GetImu).await?)
    }

    async fn fetch_battery(&self) -> Result<BatteryStatus> {
        BatteryStatus::from_json(&self.get_json(Endpoint::GetBattery).await?)
    }

    async fn fetch_servo(&self) -> Result<ServoAngles> {
        ServoAngles::from_json(&self.get_json(Endpoint::GetServo).await?)
    }

    async fn send_key(&self, body: &str) -> Result<String> {
        self.post_text(Endpoint::SendKey, body.to_string()).await
    }

    async fn send_controller_data(&self, payload: &ControllerPayload) -> Result<String> {
        self.post_text(Endpoint::SendControllerData, payload.to_json()?).await
    }
}
