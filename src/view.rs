//! # Status View
//!
//! Renders [`DashboardState`] as plain text lines for the periodic status
//! report.

use crate::controller::frame::{pressed_buttons_text, AXIS_LABELS};
use crate::orientation::OrientationCache;
use crate::state::{format_hms, DashboardState};
use crate::telemetry::types::LEG_COUNT;

/// Text renderer with its own orientation cache.
#[derive(Debug, Default)]
pub struct StatusView {
    orientation: OrientationCache,
    cameras: Vec<String>,
}

impl StatusView {
    pub fn new(cameras: Vec<String>) -> Self {
        Self { orientation: OrientationCache::new(), cameras }
    }

    /// Renders every panel, one line per entry.
    pub fn render(&mut self, state: &DashboardState) -> Vec<String> {
        let mut lines = Vec::with_capacity(16);

        lines.push(format!(
            "Status: {} ({})",
            if state.connected { "Connected" } else { "Not Connected" },
            state.target
        ));

        let imu = &state.imu;
        lines.push(format!(
            "IMU Data: Roll: {:.2}° | Pitch: {:.2}° | Yaw: {:.2}°",
            imu.roll, imu.pitch, imu.yaw
        ));
        let q = self.orientation.get(imu.roll, imu.pitch, imu.yaw);
        lines.push(format!(
            "Orientation: x={:.4} y={:.4} z={:.4} w={:.4}",
            q.x, q.y, q.z, q.w
        ));

        lines.push(format!("Temperature: {:.2} °C", imu.temperature));
        match &state.battery {
            Some(battery) => {
                lines.push(format!("Battery Voltage: {:.2} Volts", battery.voltage));
                lines.push(format!("Battery Percentage: {}%", battery.percentage));
            }
            None => {
                lines.push("Battery Voltage: --".to_string());
                lines.push("Battery Percentage: --".to_string());
            }
        }
        lines.push(format!("Run time: {}", format_hms(state.run_time_s)));

        match &state.servo {
            Some(servo) => {
                for leg in 0..LEG_COUNT {
                    lines.push(format!(
                        "Leg {}: hip {:.1}° | shoulder {:.1}° | knee {:.1}°",
                        leg + 1,
                        servo.hip[leg],
                        servo.shoulder[leg],
                        servo.knee[leg]
                    ));
                }
            }
            None => lines.push("Servo Data: --".to_string()),
        }

        lines.push(format!("Key Pressed: {}", state.key_pressed.as_deref().unwrap_or("None")));
        lines.push(format!("Robot Response: {}", state.response));
        lines.push(format!(
            "Controller Status: {}",
            if state.controller_connected { "Connected" } else { "Not Connected" }
        ));
        lines.push(format!(
            "Controller Buttons Pressed: {}",
            pressed_buttons_text(&state.controller.pressed_labels())
        ));
        for (index, label) in AXIS_LABELS.iter().enumerate() {
            lines.push(format!("Axis {}: {}", label, state.controller.axis(index).unwrap_or("")));
        }

        for (index, url) in self.cameras.iter().enumerate() {
            lines.push(format!("Camera {} Stream: {}", index + 1, url));
        }

        lines
    }

    /// Number of orientation recomputations so far.
    pub fn orientation_computations(&self) -> u64 {
        self.orientation.computations()
    }
}
