//! # Controller Forwarder
//!
//! Decides which gamepad frames are worth sending to the robot.
//!
//! A frame is transmitted only when both hold:
//!
//! 1. at least `min_interval` has passed since the last transmission, and
//! 2. its payload differs from the last transmitted payload.
//!
//! Frames that fail either check are dropped, not queued. A changed frame that
//! arrives inside the window is picked up by the next frame after the window
//! closes, as long as the pad still reports it.

use tokio::time::{Duration, Instant};

use super::frame::{ControllerPayload, InputFrame};

/// Rate-limited, change-gated frame filter.
#[derive(Debug, Clone)]
pub struct ControllerForwarder {
    min_interval: Duration,
    last_sent: Option<(Instant, ControllerPayload)>,
}

impl ControllerForwarder {
    /// Creates a forwarder with the given minimum spacing between sends.
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval, last_sent: None }
    }

    /// Offers a frame sampled at `now`.
    ///
    /// Returns the payload to transmit, and records it as the last sent, or
    /// `None` if the frame is suppressed.
    ///
    /// # Examples
    ///
    /// ```
    /// use dogbot_teleop::controller::forwarder::ControllerForwarder;
    /// use dogbot_teleop::controller::frame::InputFrame;
    /// use tokio::time::{Duration, Instant};
    ///
    /// let mut fwd = ControllerForwarder::new(Duration::from_millis(50));
    /// let frame = InputFrame::from_raw(&[true], &[0.0]);
    /// let t0 = Instant::now();
    ///
    /// assert!(fwd.offer(&frame, t0).is_some());
    /// // Same frame again: suppressed even after the window.
    /// assert!(fwd.offer(&frame, t0 + Duration::from_millis(100)).is_none());
    /// ```
    pub fn offer(&mut self, frame: &InputFrame, now: Instant) -> Option<ControllerPayload> {
        if let Some((sent_at, _)) = &self.last_sent {
            if now.saturating_duration_since(*sent_at) < self.min_interval {
                return None;
            }
        }

        let payload = frame.to_payload();
        if matches!(&self.last_sent, Some((_, last)) if *last == payload) {
            return None;
        }

        self.last_sent = Some((now, payload.clone()));
        Some(payload)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn frame(pressed: bool, axis: f64) -> InputFrame {
        InputFrame::from_raw(&[pressed, false], &[axis, 0.0])
    }

    #[test]
    fn test_first_frame_is_sent() {
        let mut fwd = ControllerForwarder::new(ms(50));
        let sent = fwd.offer(&frame(false, 0.0), Instant::now());
        assert_eq!(sent, Some(frame(false, 0.0).to_payload()));
    }

    #[test]
    fn test_identical_frames_10ms_apart_send_once() {
        let mut fwd = ControllerForwarder::new(ms(50));
        let t0 = Instant::now();
        assert!(fwd.offer(&frame(true, 0.5), t0).is_some());
        assert!(fwd.offer(&frame(true, 0.5), t0 + ms(10)).is_none());
    }

    #[test]
    fn test_identical_frame_never_resent() {
        let mut fwd = ControllerForwarder::new(ms(50));
        let t0 = Instant::now();
        assert!(fwd.offer(&frame(true, 0.5), t0).is_some());
        for i in 1..20 {
            assert!(fwd.offer(&frame(true, 0.5), t0 + ms(i * 100)).is_none());
        }
    }

    #[test]
    fn test_changed_frame_inside_window_dropped() {
        let mut fwd = ControllerForwarder::new(ms(50));
        let t0 = Instant::now();
        assert!(fwd.offer(&frame(false, 0.0), t0).is_some());
        assert!(fwd.offer(&frame(true, 0.0), t0 + ms(49)).is_none());
        // The pad still reports the change once the window has passed.
        assert_eq!(
            fwd.offer(&frame(true, 0.0), t0 + ms(50)),
            Some(frame(true, 0.0).to_payload())
        );
    }

    #[test]
    fn test_changed_frame_at_exact_interval_sent() {
        let mut fwd = ControllerForwarder::new(ms(50));
        let t0 = Instant::now();
        fwd.offer(&frame(false, 0.0), t0);
        assert!(fwd.offer(&frame(false, 0.3), t0 + ms(50)).is_some());
    }

    #[test]
    fn test_jitter_below_resolution_not_sent() {
        let mut fwd = ControllerForwarder::new(ms(50));
        let t0 = Instant::now();
        fwd.offer(&frame(false, 0.2501), t0);
        assert!(fwd.offer(&frame(false, 0.2504), t0 + ms(100)).is_none());
    }

    #[test]
    fn test_suppressed_frame_does_not_move_window() {
        let mut fwd = ControllerForwarder::new(ms(50));
        let t0 = Instant::now();
        fwd.offer(&frame(false, 0.0), t0);
        fwd.offer(&frame(true, 0.0), t0 + ms(30));
        // 60ms after the last real send, not 30ms after the dropped one.
        assert!(fwd.offer(&frame(true, 0.0), t0 + ms(60)).is_some());
    }
}
