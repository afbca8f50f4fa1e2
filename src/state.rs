//! # Dashboard State
//!
//! Single store for everything the dashboard shows.
//!
//! Each event source has its own [`Action`]; [`DashboardState::apply`] is the
//! only place state changes. Telemetry slices are replaced wholesale on a
//! valid poll. Failed or partial polls dispatch nothing, so the previous slice
//! stays in place.
//!
//! The store is a `tokio::sync::watch` channel: tasks dispatch actions and any
//! number of readers (status report, telemetry recorder) observe the latest
//! state.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::controller::frame::InputFrame;
use crate::robot::ConnectionTarget;
use crate::telemetry::{BatteryStatus, ServoAngles, TelemetrySnapshot};

/// One state transition, named after its event source.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A new robot address was submitted
    TargetChanged(ConnectionTarget),
    /// Connectivity probe outcome
    ProbeCompleted { reachable: bool },
    /// Valid `/getIMU` response
    ImuUpdated(TelemetrySnapshot),
    /// Valid `/getBattery` response
    BatteryUpdated(BatteryStatus),
    /// Valid `/getServo` response
    ServoUpdated(ServoAngles),
    /// One second of the run timer elapsed
    RunTimerTick,
    /// A key was forwarded (`Some`) or released (`None`)
    KeyPressed(Option<String>),
    /// Text shown as the robot's reply to the last command
    CommandResponse(String),
    /// Gamepad plugged in or removed
    ControllerConnection { connected: bool },
    /// Gamepad state sampled this frame
    ControllerFrame(InputFrame),
}

/// Everything the dashboard displays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub target: ConnectionTarget,
    pub connected: bool,
    pub run_time_s: u64,
    pub imu: TelemetrySnapshot,
    pub battery: Option<BatteryStatus>,
    pub servo: Option<ServoAngles>,
    pub key_pressed: Option<String>,
    pub response: String,
    pub controller_connected: bool,
    pub controller: InputFrame,
}

impl DashboardState {
    /// Applies one action.
    ///
    /// # Examples
    ///
    /// ```
    /// use dogbot_teleop::state::{Action, DashboardState};
    ///
    /// let mut state = DashboardState::default();
    /// state.apply(Action::ProbeCompleted { reachable: true });
    /// state.apply(Action::RunTimerTick);
    /// assert_eq!(state.run_time_s, 1);
    ///
    /// state.apply(Action::ProbeCompleted { reachable: false });
    /// assert_eq!(state.run_time_s, 0);
    /// ```
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::TargetChanged(target) => self.target = target,
            Action::ProbeCompleted { reachable } => {
                if self.connected && !reachable {
                    self.run_time_s = 0;
                }
                self.connected = reachable;
            }
            Action::ImuUpdated(imu) => self.imu = imu,
            Action::BatteryUpdated(battery) => self.battery = Some(battery),
            Action::ServoUpdated(servo) => self.servo = Some(servo),
            Action::RunTimerTick => {
                if self.connected {
                    self.run_time_s += 1;
                }
            }
            Action::KeyPressed(key) => self.key_pressed = key,
            Action::CommandResponse(text) => self.response = text,
            Action::ControllerConnection { connected } => {
                self.controller_connected = connected;
                if !connected {
                    self.controller = InputFrame::default();
                }
            }
            Action::ControllerFrame(frame) => self.controller = frame,
        }
    }
}

/// Formats seconds as zero-padded `HH:MM:SS`.
///
/// ```
/// use dogbot_teleop::state::format_hms;
///
/// assert_eq!(format_hms(0), "00:00:00");
/// assert_eq!(format_hms(3725), "01:02:05");
/// ```
pub fn format_hms(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Shared dashboard store.
#[derive(Debug, Clone)]
pub struct Store {
    tx: Arc<watch::Sender<DashboardState>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(DashboardState::default())
    }
}

impl Store {
    pub fn new(initial: DashboardState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Applies `action` and notifies subscribers.
    pub fn dispatch(&self, action: Action) {
        self.tx.send_modify(|state| {
            let was_connected = state.connected;
            state.apply(action);
            if state.connected != was_connected {
                if state.connected {
                    info!("Robot reachable at {}", state.target);
                } else {
                    info!("Robot at {} not reachable, run timer reset", state.target);
                }
            }
        });
        debug!("State updated");
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> DashboardState {
        self.tx.borrow().clone()
    }

    /// Receiver that observes every dispatch.
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.tx.subscribe()
    }
}
