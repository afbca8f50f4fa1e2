//! # Controller Module
//!
//! Gamepad and keyboard input handling.
//!
//! This module handles:
//! - Gamepad and keyboard detection via evdev
//! - Mapping gamepad events to the standard button/axis layout
//! - Per-frame input snapshots and their wire payload
//! - Rate-limited, change-gated controller forwarding
//! - The single-key keyboard forwarding state machine

pub mod device;
pub mod forwarder;
pub mod frame;
pub mod gamepad;
pub mod keyboard;
pub mod mapper;

pub use forwarder::ControllerForwarder;
pub use frame::{ControllerPayload, InputFrame};
pub use keyboard::{KeyCommand, KeyEvent, KeyForwarder};
