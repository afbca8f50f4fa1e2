//! Periodic tasks: connectivity prober, telemetry pollers, run timer, status
//! report and telemetry recording.
//!
//! Every task owns its own `interval` and stops when its cancellation token
//! fires. Requests are awaited inline, so a tick that comes due while a request
//! is still in flight is skipped rather than queued.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, interval_at, Duration, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::DashboardError;
use crate::robot::{ConnectionTarget, RobotApi};
use crate::state::{Action, Store};
use crate::telemetry::{TelemetryRecord, TelemetryRecorder};
use crate::view::StatusView;

/// Interval whose first tick comes one `period` from now.
pub(crate) fn delayed_interval(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Probes reachability every `period`, and immediately whenever a new target
/// is submitted. The first probe runs at startup.
///
/// A probe still in flight when the target changes is dropped and restarted
/// against the new target, so its result never lands on the wrong host.
pub async fn run_prober(
    api: Arc<dyn RobotApi>,
    store: Store,
    mut targets: watch::Receiver<ConnectionTarget>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    'run: loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
            changed = targets.changed() => {
                if changed.is_err() {
                    break;
                }
                debug!("Target changed, probing now");
                ticker.reset();
            }
        }

        let reachable = loop {
            tokio::select! {
                _ = cancel.cancelled() => break 'run,
                changed = targets.changed() => {
                    if changed.is_err() {
                        break 'run;
                    }
                    debug!("Target changed during probe, restarting");
                    ticker.reset();
                }
                result = api.probe() => match result {
                    Ok(()) => break true,
                    Err(e) => {
                        debug!("Probe failed: {}", e);
                        break false;
                    }
                },
            }
        };
        store.dispatch(Action::ProbeCompleted { reachable });
    }

    debug!("Prober stopped");
}

/// Telemetry endpoint polled by [`run_poller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollKind {
    Imu,
    Battery,
    Servo,
}

impl fmt::Display for PollKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PollKind::Imu => "IMU",
            PollKind::Battery => "battery",
            PollKind::Servo => "servo",
        })
    }
}

async fn poll_once(api: &dyn RobotApi, kind: PollKind) -> crate::error::Result<Action> {
    match kind {
        PollKind::Imu => api.fetch_imu().await.map(Action::ImuUpdated),
        PollKind::Battery => api.fetch_battery().await.map(Action::BatteryUpdated),
        PollKind::Servo => api.fetch_servo().await.map(Action::ServoUpdated),
    }
}

/// Polls one telemetry endpoint every `period`.
///
/// Only a complete, valid response reaches the store; anything else is logged
/// and the previous snapshot stays. Connectivity is left to the prober.
pub async fn run_poller(
    api: Arc<dyn RobotApi>,
    store: Store,
    kind: PollKind,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = delayed_interval(period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = poll_once(api.as_ref(), kind) => result,
        };

        match result {
            Ok(action) => store.dispatch(action),
            Err(e @ DashboardError::MalformedResponse { .. }) => warn!("Discarding {} data: {}", kind, e),
            Err(e) => debug!("{} poll failed: {}", kind, e),
        }
    }

    debug!("{} poller stopped", kind);
}

/// Run timer: one tick per second, counted by the store only while connected.
///
/// The ticker restarts whenever the robot becomes reachable, so the first
/// second is counted a full second after connecting.
pub async fn run_timer(store: Store, cancel: CancellationToken) {
    let mut ticker = delayed_interval(Duration::from_secs(1));
    let mut states = store.subscribe();
    let mut was_connected = states.borrow_and_update().connected;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => store.dispatch(Action::RunTimerTick),
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let connected = states.borrow_and_update().connected;
                if connected && !was_connected {
                    ticker.reset();
                }
                was_connected = connected;
            }
        }
    }
}

/// Logs the rendered dashboard every `period`.
pub async fn run_status_reporter(
    store: Store,
    mut view: StatusView,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = delayed_interval(period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let lines = view.render(&store.snapshot());
                info!("\n{}", lines.join("\n"));
            }
        }
    }
}

/// Appends a telemetry record every `period` and closes the file on exit.
pub async fn run_recorder(
    store: Store,
    mut recorder: TelemetryRecorder,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = delayed_interval(period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let record = TelemetryRecord::from_state(&store.snapshot());
                if let Err(e) = recorder.record(&record) {
                    warn!("Failed to write telemetry record: {}", e);
                }
            }
        }
    }

    if let Err(e) = recorder.close() {
        warn!("Failed to close telemetry log: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::MockRobotApi;
    use crate::telemetry::{BatteryStatus, TelemetrySnapshot};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    fn imu(roll: f64) -> TelemetrySnapshot {
        TelemetrySnapshot { roll, pitch: 0.0, yaw: 0.0, temperature: 25.0 }
    }

    fn malformed() -> DashboardError {
        DashboardError::MalformedResponse { endpoint: "/getIMU", reason: "missing field yaw".to_string() }
    }

    #[tokio::test(start_paused = true)]
    async fn test_prober_tracks_reachability() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut mock = MockRobotApi::new();
        mock.expect_probe().returning(move || {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 | 1 => Ok(()),
                2 => Err(DashboardError::NoTarget),
                _ => Ok(()),
            }
        });

        let store = Store::default();
        let (_tx, rx) = watch::channel(ConnectionTarget::new("10.0.0.7"));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_prober(
            Arc::new(mock),
            store.clone(),
            rx,
            Duration::from_secs(5),
            cancel.clone(),
        ));

        sleep(Duration::from_millis(10)).await;
        assert!(store.snapshot().connected);

        sleep(Duration::from_secs(5)).await;
        assert!(store.snapshot().connected);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // One failed probe is enough to flip the state.
        sleep(Duration::from_secs(5)).await;
        assert!(!store.snapshot().connected);

        sleep(Duration::from_secs(5)).await;
        assert!(store.snapshot().connected);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_prober_probes_immediately_on_target_change() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut mock = MockRobotApi::new();
        mock.expect_probe().returning(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let store = Store::default();
        let (tx, rx) = watch::channel(ConnectionTarget::default());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_prober(
            Arc::new(mock),
            store.clone(),
            rx,
            Duration::from_secs(5),
            cancel.clone(),
        ));

        sleep(Duration::from_millis(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tx.send_replace(ConnectionTarget::new("10.0.0.8"));
        sleep(Duration::from_millis(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        cancel.cancel();
        task.await.unwrap();
    }

    /// Probes hang for three seconds against `old-robot` and fail fast
    /// everywhere else.
    struct SlowOldTarget {
        targets: watch::Receiver<ConnectionTarget>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl RobotApi for SlowOldTarget {
        async fn probe(&self) -> crate::error::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let host = self.targets.borrow().host().to_string();
            if host == "old-robot" {
                sleep(Duration::from_secs(3)).await;
                Ok(())
            } else {
                Err(DashboardError::NoTarget)
            }
        }

        async fn fetch_imu(&self) -> crate::error::Result<TelemetrySnapshot> {
            Err(DashboardError::NoTarget)
        }

        async fn fetch_battery(&self) -> crate::error::Result<BatteryStatus> {
            Err(DashboardError::NoTarget)
        }

        async fn fetch_servo(&self) -> crate::error::Result<crate::telemetry::ServoAngles> {
            Err(DashboardError::NoTarget)
        }

        async fn send_key(&self, _body: &str) -> crate::error::Result<String> {
            Err(DashboardError::NoTarget)
        }

        async fn send_controller_data(
            &self,
            _payload: &crate::controller::frame::ControllerPayload,
        ) -> crate::error::Result<String> {
            Err(DashboardError::NoTarget)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_target_change_drops_probe_in_flight() {
        let (tx, rx) = watch::channel(ConnectionTarget::new("old-robot"));
        let calls = Arc::new(AtomicUsize::new(0));
        let api = SlowOldTarget { targets: rx.clone(), calls: calls.clone() };

        let store = Store::default();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_prober(
            Arc::new(api),
            store.clone(),
            rx,
            Duration::from_secs(5),
            cancel.clone(),
        ));

        sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tx.send_replace(ConnectionTarget::new("new-robot"));
        sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!store.snapshot().connected);

        // The old probe would have finished here.
        sleep(Duration::from_secs(3)).await;
        assert!(!store.snapshot().connected);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_poll_keeps_previous_snapshot() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut mock = MockRobotApi::new();
        mock.expect_fetch_imu().returning(move || {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(imu(1.0)),
                1 => Err(malformed()),
                2 => Err(DashboardError::HttpStatus { endpoint: "/getIMU", status: 500 }),
                _ => Ok(imu(4.0)),
            }
        });

        let store = Store::default();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_poller(
            Arc::new(mock),
            store.clone(),
            PollKind::Imu,
            Duration::from_millis(50),
            cancel.clone(),
        ));

        sleep(Duration::from_millis(60)).await;
        assert_eq!(store.snapshot().imu, imu(1.0));

        sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.snapshot().imu, imu(1.0));

        sleep(Duration::from_millis(50)).await;
        assert_eq!(store.snapshot().imu, imu(4.0));
        // Pollers never decide connectivity.
        assert!(!store.snapshot().connected);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_battery_poller_cadence() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut mock = MockRobotApi::new();
        mock.expect_fetch_battery().returning(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(BatteryStatus { voltage: 12.4, percentage: 90 })
        });

        let store = Store::default();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_poller(
            Arc::new(mock),
            store.clone(),
            PollKind::Battery,
            Duration::from_secs(5),
            cancel.clone(),
        ));

        sleep(Duration::from_millis(4_900)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(store.snapshot().battery.is_none());

        sleep(Duration::from_millis(10_200)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.snapshot().battery.map(|b| b.percentage), Some(90));

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_timer_counts_seconds_while_connected() {
        let store = Store::default();
        store.dispatch(Action::ProbeCompleted { reachable: true });

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_timer(store.clone(), cancel.clone()));

        sleep(Duration::from_millis(3_500)).await;
        assert_eq!(store.snapshot().run_time_s, 3);

        store.dispatch(Action::ProbeCompleted { reachable: false });
        assert_eq!(store.snapshot().run_time_s, 0);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(store.snapshot().run_time_s, 0);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_timer_phase_starts_at_connect() {
        let store = Store::default();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_timer(store.clone(), cancel.clone()));

        sleep(Duration::from_millis(990)).await;
        store.dispatch(Action::ProbeCompleted { reachable: true });

        sleep(Duration::from_millis(20)).await;
        assert_eq!(store.snapshot().run_time_s, 0);

        sleep(Duration::from_millis(990)).await;
        assert_eq!(store.snapshot().run_time_s, 1);

        // Reconnecting restarts the phase again.
        store.dispatch(Action::ProbeCompleted { reachable: false });
        sleep(Duration::from_millis(500)).await;
        store.dispatch(Action::ProbeCompleted { reachable: true });
        sleep(Duration::from_millis(990)).await;
        assert_eq!(store.snapshot().run_time_s, 0);
        sleep(Duration::from_millis(20)).await;
        assert_eq!(store.snapshot().run_time_s, 1);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_recorder_task_writes_records() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = TelemetryRecorder::new(dir.path(), 100, 5).unwrap();
        let store = Store::default();
        store.dispatch(Action::ImuUpdated(imu(7.0)));

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_recorder(
            store.clone(),
            recorder,
            Duration::from_millis(100),
            cancel.clone(),
        ));

        sleep(Duration::from_millis(350)).await;
        cancel.cancel();
        task.await.unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let contents = std::fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert!(contents.contains("\"roll\":7.0"));
    }
}
