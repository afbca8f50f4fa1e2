//! # Input Device Discovery
//!
//! Finds evdev devices under `/dev/input` by capability.

use evdev::Device;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{DashboardError, Result};

/// Directory scanned for `event*` nodes.
pub const INPUT_DIR: &str = "/dev/input";

/// Opens an input device.
///
/// With `path` set, that node is opened and checked against `matches`.
/// Otherwise all `/dev/input/event*` nodes are scanned in sorted order and the
/// first one accepted by `matches` is returned, so the choice is deterministic
/// when several devices are attached.
///
/// # Errors
///
/// - `DeviceNotFound(kind)`: nothing matched
/// - `Controller`: the input directory or an explicit path could not be read
pub fn open_input_device(
    path: Option<&str>,
    kind: &'static str,
    matches: fn(&Device) -> bool,
) -> Result<(Device, String)> {
    if let Some(path) = path {
        let device = Device::open(path)
            .map_err(|e| DashboardError::Controller(format!("Failed to open {}: {}", path, e)))?;
        if !matches(&device) {
            return Err(DashboardError::Controller(format!(
                "{} does not look like a {}",
                path, kind
            )));
        }
        info!("Opened {} at {}", kind, path);
        return Ok((device, path.to_string()));
    }

    let input_dir = Path::new(INPUT_DIR);
    if !input_dir.exists() {
        return Err(DashboardError::Controller(format!("{} directory not found", INPUT_DIR)));
    }

    let mut entries: Vec<_> = std::fs::read_dir(input_dir)
        .map_err(|e| DashboardError::Controller(format!("Failed to read {}: {}", INPUT_DIR, e)))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| DashboardError::Controller(format!("Failed to read directory entry: {}", e)))?;

    entries.sort_by_key(|entry| entry.path());

    for entry in entries {
        let path = entry.path();

        let is_event_node = path
            .file_name()
            .map(|name| name.to_string_lossy().starts_with("event"))
            .unwrap_or(false);
        if !is_event_node {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => {
                debug!(
                    "Found input device: {} ({})",
                    path.display(),
                    device.name().unwrap_or("unnamed")
                );
                if matches(&device) {
                    let device_path = path.to_string_lossy().to_string();
                    info!("Found {} at: {}", kind, device_path);
                    return Ok((device, device_path));
                }
            }
            Err(e) => {
                // Permission denied or other errors - skip device
                debug!("Could not open {}: {}", path.display(), e);
            }
        }
    }

    Err(DashboardError::DeviceNotFound(kind))
}
