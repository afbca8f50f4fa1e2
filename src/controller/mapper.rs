//! # Gamepad Event Mapper Module
//!
//! This module parses raw evdev events from a gamepad and maintains a
//! [`GamepadState`] laid out like the standard gamepad: 17 buttons and four
//! stick axes normalised to `[-1.0, 1.0]`.
//!
//! ## Axis Codes (EV_ABS)
//!
//! | Axis | evdev Code | Standard index |
//! |------|------------|----------------|
//! | Left Stick X | ABS_X | axis 0 |
//! | Left Stick Y | ABS_Y | axis 1 |
//! | Right Stick X | ABS_RX | axis 2 |
//! | Right Stick Y | ABS_RY | axis 3 |
//! | Left Trigger | ABS_Z | button 6 (analog) |
//! | Right Trigger | ABS_RZ | button 7 (analog) |
//! | D-Pad X | ABS_HAT0X | buttons 14 / 15 |
//! | D-Pad Y | ABS_HAT0Y | buttons 12 / 13 |
//!
//! ## Button Codes (EV_KEY)
//!
//! | Button | evdev Code | Standard index |
//! |--------|------------|----------------|
//! | A / Cross | BTN_SOUTH | 0 |
//! | B / Circle | BTN_EAST | 1 |
//! | X / Square | BTN_WEST | 2 |
//! | Y / Triangle | BTN_NORTH | 3 |
//! | LB / L1 | BTN_TL | 4 |
//! | RB / R1 | BTN_TR | 5 |
//! | LT / L2 click | BTN_TL2 | 6 |
//! | RT / R2 click | BTN_TR2 | 7 |
//! | View / Share | BTN_SELECT | 8 |
//! | Menu / Options | BTN_START | 9 |
//! | L3 | BTN_THUMBL | 10 |
//! | R3 | BTN_THUMBR | 11 |
//! | D-Pad | BTN_DPAD_* | 12-15 |
//! | Guide / PS | BTN_MODE | 16 |
//!
//! ## Usage
//!
//! ```no_run
//! use dogbot_teleop::controller::gamepad::Gamepad;
//! use dogbot_teleop::controller::mapper::EventMapper;
//!
//! let mut pad = Gamepad::open(None)?;
//! let mut mapper = EventMapper::new(pad.axis_ranges(), 0.1);
//!
//! loop {
//!     for event in pad.fetch_events()? {
//!         mapper.process_event(&event);
//!     }
//!     let frame = mapper.frame();
//!     // Offer the frame to the forwarder...
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use evdev::{AbsoluteAxisType, InputEvent, Key};

use super::frame::InputFrame;

/// Number of buttons in the standard layout (0-15 plus the guide button).
pub const BUTTON_COUNT: usize = 17;
/// Number of stick axes in the standard layout.
pub const AXIS_COUNT: usize = 4;

/// Raw axis range assumed when the device does not report one.
pub const DEFAULT_AXIS_MIN: i32 = 0;
/// Raw axis range assumed when the device does not report one.
pub const DEFAULT_AXIS_MAX: i32 = 255;

/// Standard button indices.
pub mod buttons {
    pub const A: usize = 0;
    pub const B: usize = 1;
    pub const X: usize = 2;
    pub const Y: usize = 3;
    pub const LB: usize = 4;
    pub const RB: usize = 5;
    pub const LT: usize = 6;
    pub const RT: usize = 7;
    pub const VIEW: usize = 8;
    pub const MENU: usize = 9;
    pub const LEFT_STICK: usize = 10;
    pub const RIGHT_STICK: usize = 11;
    pub const UP: usize = 12;
    pub const DOWN: usize = 13;
    pub const LEFT: usize = 14;
    pub const RIGHT: usize = 15;
    pub const GUIDE: usize = 16;
}

/// Reported range of one absolute axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl Default for AxisRange {
    fn default() -> Self {
        Self { min: DEFAULT_AXIS_MIN, max: DEFAULT_AXIS_MAX }
    }
}

impl AxisRange {
    /// Maps a raw value onto `[-1.0, 1.0]`.
    ///
    /// ```
    /// use dogbot_teleop::controller::mapper::AxisRange;
    ///
    /// let range = AxisRange { min: 0, max: 255 };
    /// assert_eq!(range.normalize_signed(0), -1.0);
    /// assert_eq!(range.normalize_signed(255), 1.0);
    /// ```
    #[must_use]
    pub fn normalize_signed(&self, raw: i32) -> f64 {
        self.normalize_unsigned(raw) * 2.0 - 1.0
    }

    /// Maps a raw value onto `[0.0, 1.0]`.
    #[must_use]
    pub fn normalize_unsigned(&self, raw: i32) -> f64 {
        let span = (self.max - self.min) as f64;
        if span <= 0.0 {
            return 0.0;
        }
        ((raw - self.min) as f64 / span).clamp(0.0, 1.0)
    }
}

/// Ranges of the six analog axes a gamepad reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisRanges {
    pub left_x: AxisRange,
    pub left_y: AxisRange,
    pub right_x: AxisRange,
    pub right_y: AxisRange,
    pub left_trigger: AxisRange,
    pub right_trigger: AxisRange,
}

/// Current gamepad state in standard layout.
#[derive(Debug, Clone, PartialEq)]
pub struct GamepadState {
    /// Digital buttons. Trigger buttons hold only the digital click here.
    pub buttons: [bool; BUTTON_COUNT],
    /// LX, LY, RX, RY in `[-1.0, 1.0]`. Up is negative on the Y axes.
    pub axes: [f64; AXIS_COUNT],
    /// Left and right trigger travel in `[0.0, 1.0]`.
    pub triggers: [f64; 2],
}

impl Default for GamepadState {
    /// Sticks centered, triggers and buttons released.
    fn default() -> Self {
        Self {
            buttons: [false; BUTTON_COUNT],
            axes: [0.0; AXIS_COUNT],
            triggers: [0.0; 2],
        }
    }
}

/// Parses raw evdev events and maintains gamepad state.
///
/// `EventMapper` is not thread-safe. Use from a single task only.
#[derive(Debug)]
pub struct EventMapper {
    state: GamepadState,
    ranges: AxisRanges,
    trigger_threshold: f64,
}

impl Default for EventMapper {
    fn default() -> Self {
        Self::new(AxisRanges::default(), 0.1)
    }
}

impl EventMapper {
    /// Creates a mapper for a pad with the given axis ranges.
    ///
    /// An analog trigger counts as pressed once its travel exceeds
    /// `trigger_threshold`.
    #[must_use]
    pub fn new(ranges: AxisRanges, trigger_threshold: f64) -> Self {
        Self {
            state: GamepadState::default(),
            ranges,
            trigger_threshold,
        }
    }

    /// Returns a reference to the current gamepad state.
    #[must_use]
    pub fn state(&self) -> &GamepadState {
        &self.state
    }

    /// Samples the current state as an [`InputFrame`].
    ///
    /// Trigger buttons are pressed if clicked or pulled past the threshold.
    ///
    /// # Examples
    ///
    /// ```
    /// use dogbot_teleop::controller::mapper::EventMapper;
    ///
    /// let mapper = EventMapper::default();
    /// let frame = mapper.frame();
    /// assert_eq!(frame.buttons.len(), 17);
    /// assert_eq!(frame.axis(0), Some("0.000"));
    /// ```
    #[must_use]
    pub fn frame(&self) -> InputFrame {
        let mut pressed = self.state.buttons;
        pressed[buttons::LT] |= self.state.triggers[0] > self.trigger_threshold;
        pressed[buttons::RT] |= self.state.triggers[1] > self.trigger_threshold;
        InputFrame::from_raw(&pressed, &self.state.axes)
    }

    /// Processes a single evdev input event and updates internal state.
    ///
    /// Sync events and unknown codes are ignored.
    pub fn process_event(&mut self, event: &InputEvent) {
        match event.kind() {
            evdev::InputEventKind::AbsAxis(axis) => {
                self.process_axis_event(axis, event.value());
            }
            evdev::InputEventKind::Key(key) => {
                self.process_key_event(key, event.value() != 0);
            }
            _ => {}
        }
    }

    fn process_axis_event(&mut self, axis: AbsoluteAxisType, value: i32) {
        let r = &self.ranges;
        match axis {
            // Sticks
            AbsoluteAxisType::ABS_X => self.state.axes[0] = r.left_x.normalize_signed(value),
            AbsoluteAxisType::ABS_Y => self.state.axes[1] = r.left_y.normalize_signed(value),
            AbsoluteAxisType::ABS_RX => self.state.axes[2] = r.right_x.normalize_signed(value),
            AbsoluteAxisType::ABS_RY => self.state.axes[3] = r.right_y.normalize_signed(value),

            // Analog triggers
            AbsoluteAxisType::ABS_Z => self.state.triggers[0] = r.left_trigger.normalize_unsigned(value),
            AbsoluteAxisType::ABS_RZ => self.state.triggers[1] = r.right_trigger.normalize_unsigned(value),

            // D-Pad hat
            AbsoluteAxisType::ABS_HAT0X => {
                self.state.buttons[buttons::LEFT] = value < 0;
                self.state.buttons[buttons::RIGHT] = value > 0;
            }
            AbsoluteAxisType::ABS_HAT0Y => {
                self.state.buttons[buttons::UP] = value < 0;
                self.state.buttons[buttons::DOWN] = value > 0;
            }

            _ => {
                // Ignore other axes (gyro, accelerometer, etc.)
            }
        }
    }

    fn process_key_event(&mut self, key: Key, pressed: bool) {
        if let Some(index) = button_index(key) {
            self.state.buttons[index] = pressed;
        }
    }
}

/// Standard button index for an evdev key code.
#[must_use]
pub fn button_index(key: Key) -> Option<usize> {
    let index = match key {
        Key::BTN_SOUTH => buttons::A,
        Key::BTN_EAST => buttons::B,
        Key::BTN_WEST => buttons::X,
        Key::BTN_NORTH => buttons::Y,
        Key::BTN_TL => buttons::LB,
        Key::BTN_TR => buttons::RB,
        Key::BTN_TL2 => buttons::LT,
        Key::BTN_TR2 => buttons::RT,
        Key::BTN_SELECT => buttons::VIEW,
        Key::BTN_START => buttons::MENU,
        Key::BTN_THUMBL => buttons::LEFT_STICK,
        Key::BTN_THUMBR => buttons::RIGHT_STICK,
        Key::BTN_DPAD_UP => buttons::UP,
        Key::BTN_DPAD_DOWN => buttons::DOWN,
        Key::BTN_DPAD_LEFT => buttons::LEFT,
        Key::BTN_DPAD_RIGHT => buttons::RIGHT,
        Key::BTN_MODE => buttons::GUIDE,
        _ => return None,
    };
    Some(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::EventType;

    /// Helper to create an axis event for testing.
    fn make_axis_event(axis: AbsoluteAxisType, value: i32) -> InputEvent {
        InputEvent::new(EventType::ABSOLUTE, axis.0, value)
    }

    /// Helper to create a key event for testing.
    fn make_key_event(key: Key, pressed: bool) -> InputEvent {
        InputEvent::new(EventType::KEY, key.code(), if pressed { 1 } else { 0 })
    }

    // ==================== AxisRange Tests ====================

    #[test]
    fn test_axis_range_signed() {
        let range = AxisRange { min: -32768, max: 32767 };
        assert_eq!(range.normalize_signed(-32768), -1.0);
        assert_eq!(range.normalize_signed(32767), 1.0);
        assert!(range.normalize_signed(0).abs() < 0.001);
    }

    #[test]
    fn test_axis_range_clamps() {
        let range = AxisRange::default();
        assert_eq!(range.normalize_signed(-10), -1.0);
        assert_eq!(range.normalize_signed(300), 1.0);
    }

    #[test]
    fn test_axis_range_degenerate() {
        let range = AxisRange { min: 5, max: 5 };
        assert_eq!(range.normalize_unsigned(5), 0.0);
    }

    // ==================== EventMapper Tests ====================

    #[test]
    fn test_event_mapper_default_state() {
        let mapper = EventMapper::default();
        assert_eq!(*mapper.state(), GamepadState::default());

        let frame = mapper.frame();
        assert_eq!(frame.buttons.len(), BUTTON_COUNT);
        assert_eq!(frame.axes.len(), AXIS_COUNT);
        assert!(frame.pressed_labels().is_empty());
    }

    #[test]
    fn test_process_sticks() {
        let mut mapper = EventMapper::default();
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_X, 255));
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_Y, 0));
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_RX, 0));
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_RY, 255));

        assert_eq!(mapper.state().axes, [1.0, -1.0, -1.0, 1.0]);

        let frame = mapper.frame();
        assert_eq!(frame.axis(0), Some("1.000"));
        assert_eq!(frame.axis(1), Some("-1.000"));
    }

    #[test]
    fn test_process_buttons() {
        let mut mapper = EventMapper::default();
        mapper.process_event(&make_key_event(Key::BTN_SOUTH, true));
        mapper.process_event(&make_key_event(Key::BTN_TR, true));
        mapper.process_event(&make_key_event(Key::BTN_MODE, true));

        assert_eq!(mapper.frame().pressed_labels(), vec!["A", "RB", "Button 16"]);

        mapper.process_event(&make_key_event(Key::BTN_SOUTH, false));
        assert_eq!(mapper.frame().pressed_labels(), vec!["RB", "Button 16"]);
    }

    #[test]
    fn test_all_mapped_buttons() {
        let keys = [
            Key::BTN_SOUTH, Key::BTN_EAST, Key::BTN_WEST, Key::BTN_NORTH,
            Key::BTN_TL, Key::BTN_TR, Key::BTN_TL2, Key::BTN_TR2,
            Key::BTN_SELECT, Key::BTN_START, Key::BTN_THUMBL, Key::BTN_THUMBR,
            Key::BTN_DPAD_UP, Key::BTN_DPAD_DOWN, Key::BTN_DPAD_LEFT, Key::BTN_DPAD_RIGHT,
            Key::BTN_MODE,
        ];
        for (expected, key) in keys.iter().enumerate() {
            assert_eq!(button_index(*key), Some(expected), "{:?}", key);
        }
        assert_eq!(button_index(Key::KEY_A), None);
    }

    #[test]
    fn test_analog_trigger_threshold() {
        let mut mapper = EventMapper::new(AxisRanges::default(), 0.5);

        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_Z, 100));
        assert!(!mapper.frame().buttons[buttons::LT].pressed);

        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_Z, 200));
        assert!(mapper.frame().buttons[buttons::LT].pressed);

        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_RZ, 255));
        assert!(mapper.frame().buttons[buttons::RT].pressed);
    }

    #[test]
    fn test_trigger_click_without_travel() {
        let mut mapper = EventMapper::default();
        mapper.process_event(&make_key_event(Key::BTN_TL2, true));
        assert!(mapper.frame().buttons[buttons::LT].pressed);
    }

    #[test]
    fn test_dpad_hat() {
        let mut mapper = EventMapper::default();

        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_HAT0Y, -1));
        assert_eq!(mapper.frame().pressed_labels(), vec!["Up"]);

        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_HAT0Y, 1));
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_HAT0X, -1));
        assert_eq!(mapper.frame().pressed_labels(), vec!["Down", "Left"]);

        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_HAT0X, 0));
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_HAT0Y, 0));
        assert!(mapper.frame().pressed_labels().is_empty());
    }

    #[test]
    fn test_ignores_other_axes() {
        let mut mapper = EventMapper::default();
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_PRESSURE, 100));
        assert_eq!(*mapper.state(), GamepadState::default());
    }
}
