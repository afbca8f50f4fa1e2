//! # Dashboard Module
//!
//! Starts and stops every background task of the teleoperation client.
//!
//! All tasks hang off one root [`CancellationToken`]; [`Dashboard::shutdown`]
//! cancels it and waits for each task to finish. The gamepad frame loop sits
//! under a child token of its own so it can be stopped on disconnect without
//! touching anything else.

pub mod input;
pub mod pollers;

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::robot::{ConnectionTarget, RobotApi};
use crate::state::{Action, Store};
use crate::telemetry::TelemetryRecorder;
use crate::view::StatusView;

use pollers::PollKind;

/// Owner of the current robot address.
///
/// Submitting an address updates both the HTTP client (through the watch
/// channel) and the store, and wakes the prober for an immediate check.
#[derive(Debug, Clone)]
pub struct TargetControl {
    tx: Arc<watch::Sender<ConnectionTarget>>,
    store: Store,
}

impl TargetControl {
    pub fn new(store: Store, initial: &str) -> Self {
        let target = ConnectionTarget::new(initial);
        store.dispatch(Action::TargetChanged(target.clone()));
        let (tx, _rx) = watch::channel(target);
        Self { tx: Arc::new(tx), store }
    }

    /// Receiver that always holds the current target.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionTarget> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> ConnectionTarget {
        self.tx.borrow().clone()
    }

    /// Switches to a newly entered address.
    ///
    /// Re-submitting the current address still counts as a change, so it
    /// also triggers a probe.
    pub fn submit(&self, input: &str) {
        let target = ConnectionTarget::new(input);
        info!("Robot address set to {}", target);
        self.tx.send_replace(target.clone());
        self.store.dispatch(Action::TargetChanged(target));
    }
}

/// Handle to the running background tasks.
#[derive(Debug)]
pub struct Dashboard {
    cancel: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Dashboard {
    /// Spawns every task the configuration enables.
    ///
    /// # Errors
    ///
    /// Returns `Io` if telemetry recording is enabled and its directory
    /// cannot be created.
    pub fn spawn(config: &Config, api: Arc<dyn RobotApi>, store: Store, targets: &TargetControl) -> Result<Self> {
        let cancel = CancellationToken::new();
        let mut dashboard = Self { cancel: cancel.clone(), tasks: Vec::new() };
        let polling = &config.polling;

        dashboard.add(
            "prober",
            tokio::spawn(pollers::run_prober(
                api.clone(),
                store.clone(),
                targets.subscribe(),
                Duration::from_millis(polling.probe_interval_ms),
                cancel.clone(),
            )),
        );

        for (name, kind, period_ms) in [
            ("imu-poller", PollKind::Imu, polling.imu_interval_ms),
            ("battery-poller", PollKind::Battery, polling.battery_interval_ms),
            ("servo-poller", PollKind::Servo, polling.servo_interval_ms),
        ] {
            dashboard.add(
                name,
                tokio::spawn(pollers::run_poller(
                    api.clone(),
                    store.clone(),
                    kind,
                    Duration::from_millis(period_ms),
                    cancel.clone(),
                )),
            );
        }

        dashboard.add("run-timer", tokio::spawn(pollers::run_timer(store.clone(), cancel.clone())));

        dashboard.add(
            "status-reporter",
            tokio::spawn(pollers::run_status_reporter(
                store.clone(),
                StatusView::new(config.cameras.streams.clone()),
                Duration::from_millis(config.display.status_interval_ms),
                cancel.clone(),
            )),
        );

        if config.telemetry.enabled {
            let recorder = TelemetryRecorder::from_config(&config.telemetry)?;
            dashboard.add(
                "telemetry-recorder",
                tokio::spawn(pollers::run_recorder(
                    store.clone(),
                    recorder,
                    Duration::from_millis(config.telemetry.log_interval_ms),
                    cancel.clone(),
                )),
            );
        }

        if config.controller.enabled {
            dashboard.add(
                "gamepad",
                tokio::spawn(input::run_gamepad_supervisor(
                    api.clone(),
                    store.clone(),
                    config.controller.clone(),
                    cancel.clone(),
                )),
            );
        }

        if config.keyboard.enabled {
            dashboard.add(
                "keyboard",
                tokio::spawn(input::run_keyboard_listener(
                    api,
                    store,
                    config.keyboard.clone(),
                    cancel.clone(),
                )),
            );
        }

        info!("Dashboard started with {} tasks", dashboard.tasks.len());
        Ok(dashboard)
    }

    /// Tracks an extra task so shutdown waits for it.
    pub fn add(&mut self, name: &'static str, handle: JoinHandle<()>) {
        debug!("Started task {}", name);
        self.tasks.push((name, handle));
    }

    /// Token that every dashboard task observes.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Cancels every task and waits for all of them.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for (name, handle) in self.tasks {
            if let Err(e) = handle.await {
                warn!("Task {} ended abnormally: {}", name, e);
            }
        }
        info!("Dashboard stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::MockRobotApi;
    use crate::telemetry::TelemetrySnapshot;
    use tokio::time::sleep;

    fn headless_config() -> Config {
        let mut config = Config::default();
        config.controller.enabled = false;
        config.keyboard.enabled = false;
        config
    }

    #[test]
    fn test_target_control_initial() {
        let store = Store::default();
        let targets = TargetControl::new(store.clone(), " 10.0.0.7 ");
        assert_eq!(targets.current().host(), "10.0.0.7");
        assert_eq!(store.snapshot().target.host(), "10.0.0.7");
    }

    #[test]
    fn test_resubmit_same_address_notifies() {
        let targets = TargetControl::new(Store::default(), "10.0.0.7");
        let mut rx = targets.subscribe();
        targets.submit("10.0.0.7");
        assert!(rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_and_shutdown() {
        let mut mock = MockRobotApi::new();
        mock.expect_probe().returning(|| Ok(()));
        mock.expect_fetch_imu().returning(|| {
            Ok(TelemetrySnapshot { roll: 3.0, pitch: 2.0, yaw: 1.0, temperature: 28.5 })
        });
        mock.expect_fetch_battery()
            .returning(|| Err(crate::error::DashboardError::NoTarget));
        mock.expect_fetch_servo()
            .returning(|| Err(crate::error::DashboardError::NoTarget));

        let store = Store::default();
        let targets = TargetControl::new(store.clone(), "10.0.0.7");
        let dashboard = Dashboard::spawn(&headless_config(), Arc::new(mock), store.clone(), &targets).unwrap();
        // prober, three pollers, run timer, status reporter
        assert_eq!(dashboard.task_count(), 6);

        sleep(Duration::from_millis(2_500)).await;
        let state = store.snapshot();
        assert!(state.connected);
        assert_eq!(state.run_time_s, 2);
        assert_eq!(state.imu.roll, 3.0);
        assert!(state.battery.is_none());

        let token = dashboard.cancellation_token();
        dashboard.shutdown().await;
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_with_recorder() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = headless_config();
        config.telemetry.enabled = true;
        config.telemetry.log_dir = dir.path().join("telemetry").to_string_lossy().into_owned();

        let mut mock = MockRobotApi::new();
        mock.expect_probe().returning(|| Err(crate::error::DashboardError::NoTarget));
        mock.expect_fetch_imu().returning(|| Err(crate::error::DashboardError::NoTarget));
        mock.expect_fetch_battery().returning(|| Err(crate::error::DashboardError::NoTarget));
        mock.expect_fetch_servo().returning(|| Err(crate::error::DashboardError::NoTarget));

        let store = Store::default();
        let targets = TargetControl::new(store.clone(), "");
        let dashboard = Dashboard::spawn(&config, Arc::new(mock), store, &targets).unwrap();
        assert_eq!(dashboard.task_count(), 7);

        sleep(Duration::from_millis(250)).await;
        dashboard.shutdown().await;
        assert!(dir.path().join("telemetry").is_dir());
    }
}
