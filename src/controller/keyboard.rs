//! # Keyboard Module
//!
//! Keyboard input read from an evdev keyboard and the key forwarding state
//! machine.
//!
//! ## Forwarding
//!
//! Only one key is tracked at a time:
//!
//! | State | Event | Sends | Next |
//! |-------|-------|-------|------|
//! | Idle | key down `k` | `k` | KeySent(`k`) |
//! | KeySent | key down | nothing | KeySent |
//! | KeySent | key up (any key) | `None` | Idle |
//! | Idle | key up | nothing | Idle |
//!
//! Auto-repeat events are dropped before they reach the state machine.
//!
//! The reset-yaw key bypasses the state machine: press sends `ResetYawTrue`,
//! release sends `ResetYawFalse`.
//!
//! Key names follow the DOM `KeyboardEvent.key` spelling (`a`, `ArrowUp`,
//! `Enter`, `" "` for space) so the robot firmware sees the same strings it
//! always has. Letters are reported lowercase.

use evdev::{Device, InputEvent, InputEventKind, Key};

use super::device::open_input_device;
use crate::error::{DashboardError, Result};

/// Body sent on key release.
pub const RELEASE_BODY: &str = "None";

/// evdev key codes and the names forwarded to the robot.
const KEY_NAMES: &[(Key, &str)] = &[
    (Key::KEY_A, "a"), (Key::KEY_B, "b"), (Key::KEY_C, "c"), (Key::KEY_D, "d"),
    (Key::KEY_E, "e"), (Key::KEY_F, "f"), (Key::KEY_G, "g"), (Key::KEY_H, "h"),
    (Key::KEY_I, "i"), (Key::KEY_J, "j"), (Key::KEY_K, "k"), (Key::KEY_L, "l"),
    (Key::KEY_M, "m"), (Key::KEY_N, "n"), (Key::KEY_O, "o"), (Key::KEY_P, "p"),
    (Key::KEY_Q, "q"), (Key::KEY_R, "r"), (Key::KEY_S, "s"), (Key::KEY_T, "t"),
    (Key::KEY_U, "u"), (Key::KEY_V, "v"), (Key::KEY_W, "w"), (Key::KEY_X, "x"),
    (Key::KEY_Y, "y"), (Key::KEY_Z, "z"),
    (Key::KEY_0, "0"), (Key::KEY_1, "1"), (Key::KEY_2, "2"), (Key::KEY_3, "3"),
    (Key::KEY_4, "4"), (Key::KEY_5, "5"), (Key::KEY_6, "6"), (Key::KEY_7, "7"),
    (Key::KEY_8, "8"), (Key::KEY_9, "9"),
    (Key::KEY_UP, "ArrowUp"), (Key::KEY_DOWN, "ArrowDown"),
    (Key::KEY_LEFT, "ArrowLeft"), (Key::KEY_RIGHT, "ArrowRight"),
    (Key::KEY_SPACE, " "), (Key::KEY_ENTER, "Enter"), (Key::KEY_ESC, "Escape"),
    (Key::KEY_BACKSPACE, "Backspace"), (Key::KEY_TAB, "Tab"),
    (Key::KEY_LEFTSHIFT, "Shift"), (Key::KEY_RIGHTSHIFT, "Shift"),
    (Key::KEY_LEFTCTRL, "Control"), (Key::KEY_RIGHTCTRL, "Control"),
    (Key::KEY_LEFTALT, "Alt"), (Key::KEY_RIGHTALT, "Alt"),
    (Key::KEY_LEFTMETA, "Meta"), (Key::KEY_RIGHTMETA, "Meta"),
    (Key::KEY_HOME, "Home"), (Key::KEY_END, "End"),
    (Key::KEY_PAGEUP, "PageUp"), (Key::KEY_PAGEDOWN, "PageDown"),
    (Key::KEY_INSERT, "Insert"), (Key::KEY_DELETE, "Delete"),
    (Key::KEY_MINUS, "-"), (Key::KEY_EQUAL, "="), (Key::KEY_COMMA, ","),
    (Key::KEY_DOT, "."), (Key::KEY_SLASH, "/"),
    (Key::KEY_F1, "F1"), (Key::KEY_F2, "F2"), (Key::KEY_F3, "F3"), (Key::KEY_F4, "F4"),
    (Key::KEY_F5, "F5"), (Key::KEY_F6, "F6"), (Key::KEY_F7, "F7"), (Key::KEY_F8, "F8"),
    (Key::KEY_F9, "F9"), (Key::KEY_F10, "F10"), (Key::KEY_F11, "F11"), (Key::KEY_F12, "F12"),
];

/// Forwarded name of an evdev key, if it has one.
pub fn key_name(key: Key) -> Option<&'static str> {
    KEY_NAMES.iter().find(|(k, _)| *k == key).map(|(_, name)| *name)
}

/// First evdev key code carrying `name`.
///
/// ```
/// use dogbot_teleop::controller::keyboard::key_code_from_name;
/// use evdev::Key;
///
/// assert_eq!(key_code_from_name("Home"), Some(Key::KEY_HOME));
/// assert_eq!(key_code_from_name("Hyperspace"), None);
/// ```
pub fn key_code_from_name(name: &str) -> Option<Key> {
    KEY_NAMES.iter().find(|(_, n)| *n == name).map(|(k, _)| *k)
}

/// Press or release of a named key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyEvent {
    Down(String),
    Up(String),
}

impl KeyEvent {
    /// Translates an evdev event. Auto-repeat, unnamed keys and non-key
    /// events yield `None`.
    pub fn from_input_event(event: &InputEvent) -> Option<Self> {
        let InputEventKind::Key(key) = event.kind() else {
            return None;
        };
        let name = key_name(key)?.to_string();
        match event.value() {
            0 => Some(KeyEvent::Up(name)),
            1 => Some(KeyEvent::Down(name)),
            _ => None,
        }
    }
}

/// Text command POSTed to `/sendKey`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCommand {
    /// A key went down
    Press(String),
    /// The tracked key was released
    Release,
    /// Reset-yaw control held (`true`) or let go (`false`)
    ResetYaw(bool),
}

impl KeyCommand {
    /// Plain-text request body.
    pub fn body(&self) -> &str {
        match self {
            KeyCommand::Press(key) => key.as_str(),
            KeyCommand::Release => RELEASE_BODY,
            KeyCommand::ResetYaw(true) => "ResetYawTrue",
            KeyCommand::ResetYaw(false) => "ResetYawFalse",
        }
    }
}

/// Forwarding state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KeyState {
    #[default]
    Idle,
    KeySent(String),
}

/// Two-state key forwarder.
///
/// # Examples
///
/// ```
/// use dogbot_teleop::controller::keyboard::{KeyCommand, KeyForwarder};
///
/// let mut fwd = KeyForwarder::new(None);
/// assert_eq!(fwd.on_key_down("w"), Some(KeyCommand::Press("w".into())));
/// assert_eq!(fwd.on_key_down("a"), None);
/// assert_eq!(fwd.on_key_up("a"), Some(KeyCommand::Release));
/// ```
#[derive(Debug, Clone, Default)]
pub struct KeyForwarder {
    state: KeyState,
    reset_yaw_key: Option<String>,
}

impl KeyForwarder {
    /// Creates an idle forwarder. `reset_yaw_key` names the key bound to the
    /// reset-yaw command, if any.
    pub fn new(reset_yaw_key: Option<String>) -> Self {
        Self {
            state: KeyState::Idle,
            reset_yaw_key: reset_yaw_key.filter(|k| !k.is_empty()),
        }
    }

    /// Current state.
    pub fn state(&self) -> &KeyState {
        &self.state
    }

    /// Key currently being held, if one was sent.
    pub fn pending_key(&self) -> Option<&str> {
        match &self.state {
            KeyState::KeySent(key) => Some(key),
            KeyState::Idle => None,
        }
    }

    /// Handles a key press.
    pub fn on_key_down(&mut self, key: &str) -> Option<KeyCommand> {
        if self.is_reset_yaw(key) {
            return Some(KeyCommand::ResetYaw(true));
        }
        match self.state {
            KeyState::Idle => {
                self.state = KeyState::KeySent(key.to_string());
                Some(KeyCommand::Press(key.to_string()))
            }
            KeyState::KeySent(_) => None,
        }
    }

    /// Handles a key release. Any forwarded key releases the tracked one.
    pub fn on_key_up(&mut self, key: &str) -> Option<KeyCommand> {
        if self.is_reset_yaw(key) {
            return Some(KeyCommand::ResetYaw(false));
        }
        match self.state {
            KeyState::KeySent(_) => {
                self.state = KeyState::Idle;
                Some(KeyCommand::Release)
            }
            KeyState::Idle => None,
        }
    }

    /// Dispatches a [`KeyEvent`].
    pub fn handle(&mut self, event: &KeyEvent) -> Option<KeyCommand> {
        match event {
            KeyEvent::Down(key) => self.on_key_down(key),
            KeyEvent::Up(key) => self.on_key_up(key),
        }
    }

    fn is_reset_yaw(&self, key: &str) -> bool {
        self.reset_yaw_key.as_deref() == Some(key)
    }
}

/// Keyboard handle.
pub struct Keyboard {
    device: Device,
    device_path: String,
}

impl std::fmt::Debug for Keyboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyboard")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl Keyboard {
    /// Opens the configured keyboard, or the first one found.
    pub fn open(path: Option<&str>) -> Result<Self> {
        let (device, device_path) = open_input_device(path, "keyboard", is_keyboard)?;
        Ok(Self { device, device_path })
    }

    /// Get the device path of this keyboard
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Blocks until key events are available and returns the named ones.
    pub fn fetch_key_events(&mut self) -> Result<Vec<KeyEvent>> {
        let events = self
            .device
            .fetch_events()
            .map_err(|e| DashboardError::Controller(format!("Failed to fetch key events: {}", e)))?;
        Ok(events.filter_map(|e| KeyEvent::from_input_event(&e)).collect())
    }
}

fn is_keyboard(device: &Device) -> bool {
    device
        .supported_keys()
        .map(|keys| keys.contains(Key::KEY_A) && keys.contains(Key::KEY_SPACE) && !keys.contains(Key::BTN_SOUTH))
        .unwrap_or(false)
}
