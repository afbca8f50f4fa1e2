//! # Input Frames
//!
//! Per-frame snapshot of the gamepad and the payload sent to the robot.
//!
//! ## Standard Layout
//!
//! Button indices follow the standard gamepad layout:
//!
//! | Index | Label | Index | Label |
//! |-------|-------|-------|-------|
//! | 0 | A | 8 | View |
//! | 1 | B | 9 | Menu |
//! | 2 | X | 10 | Left Stick |
//! | 3 | Y | 11 | Right Stick |
//! | 4 | LB | 12 | Up |
//! | 5 | RB | 13 | Down |
//! | 6 | LT | 14 | Left |
//! | 7 | RT | 15 | Right |
//!
//! Any other index is labelled `Button N`.
//!
//! Axis values are carried as 3-decimal strings so that jitter below 0.001
//! does not make two frames differ.

use serde::Serialize;

/// Human-readable labels for standard button indices 0-15.
pub const BUTTON_LABELS: [&str; 16] = [
    "A", "B", "X", "Y", "LB", "RB", "LT", "RT", "View", "Menu", "Left Stick", "Right Stick",
    "Up", "Down", "Left", "Right",
];

/// Labels of the four stick axes, in axis index order.
pub const AXIS_LABELS: [&str; 4] = ["LX", "LY", "RX", "RY"];

/// One button in a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonState {
    pub index: usize,
    pub pressed: bool,
}

/// One axis in a frame, value already formatted by [`format_axis`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisState {
    pub index: usize,
    pub value: String,
}

/// Button and axis state of the gamepad sampled on one frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputFrame {
    pub buttons: Vec<ButtonState>,
    pub axes: Vec<AxisState>,
}

/// Body of a `/sendControllerData` request.
///
/// ```
/// use dogbot_teleop::controller::frame::ControllerPayload;
///
/// let payload = ControllerPayload { buttons: vec![1, 0], axes: vec!["0.500".into()] };
/// assert_eq!(payload.to_json()?, r#"{"buttons":[1,0],"axes":["0.500"]}"#);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ControllerPayload {
    pub buttons: Vec<u8>,
    pub axes: Vec<String>,
}

impl ControllerPayload {
    /// Serializes the payload as compact JSON text.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl InputFrame {
    /// Builds a frame from raw button flags and axis values.
    pub fn from_raw(buttons: &[bool], axes: &[f64]) -> Self {
        Self {
            buttons: buttons
                .iter()
                .enumerate()
                .map(|(index, &pressed)| ButtonState { index, pressed })
                .collect(),
            axes: axes
                .iter()
                .enumerate()
                .map(|(index, &value)| AxisState { index, value: format_axis(value) })
                .collect(),
        }
    }

    /// Converts the frame to its wire form (buttons as 0/1).
    pub fn to_payload(&self) -> ControllerPayload {
        ControllerPayload {
            buttons: self.buttons.iter().map(|b| u8::from(b.pressed)).collect(),
            axes: self.axes.iter().map(|a| a.value.clone()).collect(),
        }
    }

    /// Labels of the buttons currently pressed, in index order.
    pub fn pressed_labels(&self) -> Vec<String> {
        self.buttons
            .iter()
            .filter(|b| b.pressed)
            .map(|b| button_label(b.index))
            .collect()
    }

    /// Formatted value of the axis at `index`, if the pad reports it.
    pub fn axis(&self, index: usize) -> Option<&str> {
        self.axes.iter().find(|a| a.index == index).map(|a| a.value.as_str())
    }
}

/// Label for a button index.
///
/// # Examples
///
/// ```
/// use dogbot_teleop::controller::frame::button_label;
///
/// assert_eq!(button_label(4), "LB");
/// assert_eq!(button_label(16), "Button 16");
/// ```
pub fn button_label(index: usize) -> String {
    BUTTON_LABELS
        .get(index)
        .map(|l| l.to_string())
        .unwrap_or_else(|| format!("Button {}", index))
}

/// Formats an axis value with exactly three decimals, rounding to nearest.
///
/// Negative zero prints as `0.000`.
///
/// # Examples
///
/// ```
/// use dogbot_teleop::controller::frame::format_axis;
///
/// assert_eq!(format_axis(0.1234), "0.123");
/// assert_eq!(format_axis(0.1236), "0.124");
/// assert_eq!(format_axis(-1.0), "-1.000");
/// ```
pub fn format_axis(value: f64) -> String {
    // -0.0 == 0.0, so this also strips the sign of negative zero
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{:.3}", value)
}

/// Sentence describing the pressed buttons.
///
/// - none: `None`
/// - one: `A is pressed`
/// - several: `A and LB are pressed`
pub fn pressed_buttons_text(labels: &[String]) -> String {
    match labels {
        [] => "None".to_string(),
        [only] => format!("{} is pressed", only),
        many => format!("{} are pressed", many.join(" and ")),
    }
}
