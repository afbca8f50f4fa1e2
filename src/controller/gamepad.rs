//! # Gamepad Device Module
//!
//! This module handles gamepad detection, connection, and input reading using
//! the Linux evdev interface.
//!
//! ## Controller Detection
//!
//! A gamepad is any event device that reports the `BTN_SOUTH` face button and
//! an `ABS_X` stick axis. That covers Xbox, DualShock/DualSense and most
//! generic pads driven by the kernel's standard gamepad mapping.

use evdev::{AbsoluteAxisType, Device, Key};

use super::device::open_input_device;
use super::mapper::{AxisRange, AxisRanges};
use crate::error::{DashboardError, Result};

/// Gamepad handle
///
/// Represents an open evdev gamepad. Reading blocks, so the dashboard drives
/// it from a dedicated blocking thread.
pub struct Gamepad {
    device: Device,
    device_path: String,
}

impl std::fmt::Debug for Gamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gamepad")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl Gamepad {
    /// Opens the configured gamepad, or the first one found.
    ///
    /// # Errors
    ///
    /// - `DeviceNotFound`: No gamepad found on the system
    /// - `Controller`: Permission denied or other I/O errors when opening device
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dogbot_teleop::controller::gamepad::Gamepad;
    ///
    /// let pad = Gamepad::open(None)?;
    /// println!("Connected to gamepad at: {}", pad.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(path: Option<&str>) -> Result<Self> {
        let (device, device_path) = open_input_device(path, "gamepad", is_gamepad)?;
        Ok(Self { device, device_path })
    }

    /// Get the device path of this gamepad
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Human-readable device name reported by the driver.
    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }

    /// Axis ranges reported by the driver.
    ///
    /// Falls back to the default `0..=255` range for any axis the driver does
    /// not describe.
    pub fn axis_ranges(&self) -> AxisRanges {
        let Ok(info) = self.device.get_abs_state() else {
            return AxisRanges::default();
        };
        let supported = self.device.supported_absolute_axes();
        let range = |axis: AbsoluteAxisType| {
            let reported = supported.map(|s| s.contains(axis)).unwrap_or(false);
            match info.get(axis.0 as usize) {
                Some(abs) if reported && abs.maximum > abs.minimum => {
                    AxisRange { min: abs.minimum, max: abs.maximum }
                }
                _ => AxisRange::default(),
            }
        };

        AxisRanges {
            left_x: range(AbsoluteAxisType::ABS_X),
            left_y: range(AbsoluteAxisType::ABS_Y),
            right_x: range(AbsoluteAxisType::ABS_RX),
            right_y: range(AbsoluteAxisType::ABS_RY),
            left_trigger: range(AbsoluteAxisType::ABS_Z),
            right_trigger: range(AbsoluteAxisType::ABS_RZ),
        }
    }

    /// Fetch events from the gamepad
    ///
    /// Blocks until at least one event is available.
    ///
    /// # Errors
    ///
    /// Returns `Controller` error if fetching events fails (e.g., the pad was
    /// unplugged).
    pub fn fetch_events(&mut self) -> Result<impl Iterator<Item = evdev::InputEvent> + '_> {
        self.device
            .fetch_events()
            .map_err(|e| DashboardError::Controller(format!("Failed to fetch events: {}", e)))
    }
}

fn is_gamepad(device: &Device) -> bool {
    let has_face_button = device
        .supported_keys()
        .map(|keys| keys.contains(Key::BTN_SOUTH))
        .unwrap_or(false);
    let has_stick = device
        .supported_absolute_axes()
        .map(|axes| axes.contains(AbsoluteAxisType::ABS_X))
        .unwrap_or(false);
    has_face_button && has_stick
}
