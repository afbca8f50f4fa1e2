//! Input tasks: gamepad supervisor and frame loop, keyboard listener and the
//! address line reader.
//!
//! evdev and stdin reads block, so each device is read on its own OS thread
//! that forwards items over a bounded channel. A reader thread exits when its
//! device fails or when the receiving task has gone away; the latter is only
//! noticed once the next item arrives.

use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, sleep, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::TargetControl;
use crate::config::{ControllerConfig, KeyboardConfig};
use crate::controller::frame::InputFrame;
use crate::controller::gamepad::Gamepad;
use crate::controller::keyboard::{KeyCommand, KeyEvent, Keyboard};
use crate::controller::mapper::EventMapper;
use crate::controller::{ControllerForwarder, KeyForwarder};
use crate::error::{DashboardError, Result};
use crate::robot::RobotApi;
use crate::state::{Action, Store};

/// Reply text shown when a key command could not be delivered.
pub const SEND_ERROR_TEXT: &str = "Error communicating with robot";

const READER_CHANNEL_CAPACITY: usize = 256;
const KEYBOARD_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Runs `read` on a dedicated thread, forwarding everything it yields.
fn spawn_reader<T, F>(name: &str, mut read: F) -> Result<mpsc::Receiver<T>>
where
    T: Send + 'static,
    F: FnMut() -> Result<Vec<T>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(READER_CHANNEL_CAPACITY);
    let thread_name = name.to_string();
    std::thread::Builder::new().name(thread_name.clone()).spawn(move || loop {
        match read() {
            Ok(items) => {
                for item in items {
                    if tx.blocking_send(item).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                debug!("{} stopped: {}", thread_name, e);
                return;
            }
        }
    })?;
    Ok(rx)
}

fn configured_path(path: &str) -> Option<&str> {
    Some(path).filter(|p| !p.is_empty())
}

/// Keeps a gamepad attached: opens it, drives it until it disappears, then
/// retries every `reconnect_interval_ms`.
pub async fn run_gamepad_supervisor(
    api: Arc<dyn RobotApi>,
    store: Store,
    config: ControllerConfig,
    cancel: CancellationToken,
) {
    let retry = Duration::from_millis(config.reconnect_interval_ms);
    let mut announced_missing = false;

    while !cancel.is_cancelled() {
        match Gamepad::open(configured_path(&config.device_path)) {
            Ok(pad) => {
                announced_missing = false;
                info!(
                    "Gamepad connected: {} ({})",
                    pad.name().unwrap_or("unknown"),
                    pad.device_path()
                );
                let mapper = EventMapper::new(pad.axis_ranges(), config.trigger_threshold);
                let mut pad = pad;
                match spawn_reader("gamepad-reader", move || {
                    pad.fetch_events().map(|events| events.collect::<Vec<_>>())
                }) {
                    Ok(events) => {
                        drive_gamepad(events, mapper, api.clone(), store.clone(), &config, &cancel).await;
                    }
                    Err(e) => warn!("Failed to start gamepad reader: {}", e),
                }
            }
            Err(e) => {
                if !announced_missing {
                    info!("Waiting for gamepad: {}", e);
                    announced_missing = true;
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(retry) => {}
        }
    }

    debug!("Gamepad supervisor stopped");
}

/// Drives one connected gamepad until its event stream ends or `cancel`
/// fires.
///
/// The frame loop runs as a separate task under a child token; it is
/// cancelled and joined before the disconnect is published.
pub(crate) async fn drive_gamepad(
    mut events: mpsc::Receiver<evdev::InputEvent>,
    mut mapper: EventMapper,
    api: Arc<dyn RobotApi>,
    store: Store,
    config: &ControllerConfig,
    cancel: &CancellationToken,
) {
    store.dispatch(Action::ControllerConnection { connected: true });

    let (frame_tx, frame_rx) = watch::channel(mapper.frame());
    let frame_token = cancel.child_token();
    let frame_period = Duration::from_secs_f64(1.0 / f64::from(config.frame_rate_hz.max(1)));
    let frame_loop = tokio::spawn(run_frame_loop(
        api,
        store.clone(),
        frame_rx,
        frame_period,
        Duration::from_millis(config.min_send_interval_ms),
        frame_token.clone(),
    ));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => {
                    mapper.process_event(&event);
                    frame_tx.send_replace(mapper.frame());
                }
                None => {
                    info!("Gamepad disconnected");
                    break;
                }
            },
        }
    }

    frame_token.cancel();
    if let Err(e) = frame_loop.await {
        warn!("Frame loop ended abnormally: {}", e);
    }
    store.dispatch(Action::ControllerConnection { connected: false });
}

/// Samples the latest gamepad frame every `frame_period`, publishes it and
/// forwards it through the rate limit and change gate.
pub(crate) async fn run_frame_loop(
    api: Arc<dyn RobotApi>,
    store: Store,
    frames: watch::Receiver<InputFrame>,
    frame_period: Duration,
    min_send_interval: Duration,
    cancel: CancellationToken,
) {
    let mut forwarder = ControllerForwarder::new(min_send_interval);
    let mut ticker = interval(frame_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut published: Option<InputFrame> = None;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let frame = frames.borrow().clone();

        if let Some(payload) = forwarder.offer(&frame, Instant::now()) {
            let api = api.clone();
            tokio::spawn(async move {
                match api.send_controller_data(&payload).await {
                    Ok(reply) => debug!("Controller data sent: {}", reply),
                    Err(e) => warn!("Error sending controller data: {}", e),
                }
            });
        }

        if published.as_ref() != Some(&frame) {
            store.dispatch(Action::ControllerFrame(frame.clone()));
            published = Some(frame);
        }
    }

    debug!("Frame loop stopped");
}

/// Reads the keyboard and forwards key commands, reopening the device if it
/// goes away.
pub async fn run_keyboard_listener(
    api: Arc<dyn RobotApi>,
    store: Store,
    config: KeyboardConfig,
    cancel: CancellationToken,
) {
    let mut forwarder = KeyForwarder::new(Some(config.reset_yaw_key.clone()));
    let mut announced_missing = false;

    while !cancel.is_cancelled() {
        match Keyboard::open(configured_path(&config.device_path)) {
            Ok(keyboard) => {
                announced_missing = false;
                info!("Keyboard connected ({})", keyboard.device_path());
                let mut keyboard = keyboard;
                match spawn_reader("keyboard-reader", move || keyboard.fetch_key_events()) {
                    Ok(mut events) => loop {
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            event = events.recv() => match event {
                                Some(event) => handle_key_event(api.as_ref(), &store, &mut forwarder, &event).await,
                                None => {
                                    warn!("Keyboard disconnected");
                                    break;
                                }
                            },
                        }
                    },
                    Err(e) => warn!("Failed to start keyboard reader: {}", e),
                }
            }
            Err(e) => {
                if !announced_missing {
                    info!("Keyboard input unavailable: {}", e);
                    announced_missing = true;
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(KEYBOARD_RETRY_INTERVAL) => {}
        }
    }

    debug!("Keyboard listener stopped");
}

/// Runs one key event through the forwarder and sends the resulting command.
///
/// Commands go out in order; the robot's reply (or [`SEND_ERROR_TEXT`]) is
/// stored as the response text.
pub async fn handle_key_event(
    api: &dyn RobotApi,
    store: &Store,
    forwarder: &mut KeyForwarder,
    event: &KeyEvent,
) {
    let Some(command) = forwarder.handle(event) else {
        return;
    };

    match &command {
        KeyCommand::Press(key) => store.dispatch(Action::KeyPressed(Some(key.clone()))),
        KeyCommand::Release => store.dispatch(Action::KeyPressed(None)),
        KeyCommand::ResetYaw(_) => {}
    }

    debug!("Sending key command {:?}", command.body());
    let response = match api.send_key(command.body()).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Error sending key command: {}", e);
            SEND_ERROR_TEXT.to_string()
        }
    };
    store.dispatch(Action::CommandResponse(response));
}

/// Starts a thread that reads robot addresses from stdin, one per line.
pub fn spawn_stdin_lines() -> Result<mpsc::Receiver<String>> {
    let stdin = std::io::stdin();
    spawn_reader("stdin-reader", move || {
        let mut line = String::new();
        match stdin.lock().read_line(&mut line)? {
            0 => Err(DashboardError::Io(std::io::ErrorKind::UnexpectedEof.into())),
            _ => Ok(vec![line]),
        }
    })
}

/// Submits every non-blank line as the new robot address.
pub async fn run_address_input(
    mut lines: mpsc::Receiver<String>,
    targets: TargetControl,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.recv() => match line {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => targets.submit(&line),
                None => break,
            },
        }
    }
}
