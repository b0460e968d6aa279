//! [`StallMonitor`] and [`SpeedRamp`] – creeping power increase when the
//! vehicle is commanded to move but does not.
//!
//! # Algorithm
//!
//! The monitor keeps a countdown.  Every `poll_period` cycles it reads the
//! motion sensor: travel in the commanded direction faster than
//! `threshold` resets the countdown to the full window, anything else
//! decrements it (stopping at zero).  A countdown of zero means "stalled".
//! Without a motion sensor the countdown is pinned at the full window and
//! the vehicle is never considered stalled.
//!
//! While stalled, with the direction unchanged and at least `interval`
//! since the last speed change, the ramp nudges the setpoint of the active
//! direction one `step` further from zero.
//!
//! # Example
//!
//! ```rust
//! use rover_control::stall::StallMonitor;
//! use rover_hal::sim::SimMotionSensor;
//! use rover_types::MotionDelta;
//!
//! // Polled every cycle, window of 2.
//! let wheel = SimMotionSensor::new(MotionDelta::ZERO);
//! let mut monitor = StallMonitor::new(Some(Box::new(wheel)), 2, 1, 50, true);
//!
//! assert_eq!(monitor.observe(true), 1);
//! assert_eq!(monitor.observe(true), 0);
//! assert!(monitor.is_stalled());
//! ```

use std::time::Duration;

use rover_hal::MotionSensor;
use rover_types::MotionDelta;
use tracing::{debug, trace};

use crate::params::LoopParams;

/// Counts down while the motion sensor sees no progress.
pub struct StallMonitor {
    sensor: Option<Box<dyn MotionSensor>>,
    window: u8,
    poll_period: u32,
    threshold: i32,
    forward_is_negative_dy: bool,
    counter: u8,
    cycles_since_poll: u32,
}

impl StallMonitor {
    pub fn new(
        sensor: Option<Box<dyn MotionSensor>>,
        window: u8,
        poll_period: u32,
        threshold: i32,
        forward_is_negative_dy: bool,
    ) -> Self {
        Self {
            sensor,
            window,
            poll_period: poll_period.max(1),
            threshold,
            forward_is_negative_dy,
            counter: window,
            cycles_since_poll: 0,
        }
    }

    pub fn from_params(sensor: Option<Box<dyn MotionSensor>>, params: &LoopParams) -> Self {
        Self::new(
            sensor,
            params.stall_window,
            params.motion_poll_period,
            params.motion_threshold,
            params.forward_is_negative_dy,
        )
    }

    /// Advance one cycle with the currently commanded direction and return
    /// the counter.
    pub fn observe(&mut self, forward: bool) -> u8 {
        let Some(sensor) = self.sensor.as_mut() else {
            return self.counter;
        };
        self.cycles_since_poll += 1;
        if self.cycles_since_poll < self.poll_period {
            return self.counter;
        }
        self.cycles_since_poll = 0;

        let delta = sensor.poll();
        if is_progress(delta, forward, self.threshold, self.forward_is_negative_dy) {
            self.counter = self.window;
        } else {
            self.counter = self.counter.saturating_sub(1);
            if self.counter == 0 {
                debug!(sensor = %sensor.id(), ?delta, forward, "stalled");
            }
        }
        trace!(?delta, counter = self.counter, "motion poll");
        self.counter
    }

    pub fn counter(&self) -> u8 {
        self.counter
    }

    pub fn is_stalled(&self) -> bool {
        self.counter == 0
    }

    pub fn has_sensor(&self) -> bool {
        self.sensor.is_some()
    }
}

/// Travel along the commanded direction faster than `threshold`.
fn is_progress(delta: MotionDelta, forward: bool, threshold: i32, forward_is_negative_dy: bool) -> bool {
    let along = if forward_is_negative_dy { -delta.dy } else { delta.dy };
    if forward {
        along > threshold
    } else {
        along < -threshold
    }
}

/// Per-direction speed setpoints and the rule that raises them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeedRamp {
    forward: i32,
    reverse: i32,
    step: i32,
    max: i32,
    interval: Duration,
}

impl SpeedRamp {
    pub fn new(min_speed: i32, step: i32, max_speed: i32, interval: Duration) -> Self {
        let max = max_speed.abs();
        let min = min_speed.abs().min(max);
        Self {
            forward: min,
            reverse: -min,
            step,
            max,
            interval,
        }
    }

    pub fn from_params(params: &LoopParams) -> Self {
        Self::new(
            params.min_speed,
            params.ramp_step,
            params.max_speed,
            params.ramp_interval(),
        )
    }

    /// Apply one ramp step to the active direction if every condition holds.
    ///
    /// `since_last_change` is `None` before the first speed command, which
    /// counts as "long enough ago".  Returns whether the setpoint changed.
    pub fn update(
        &mut self,
        forward: bool,
        stalled: bool,
        direction_unchanged: bool,
        since_last_change: Option<Duration>,
    ) -> bool {
        if !stalled || !direction_unchanged {
            return false;
        }
        if since_last_change.is_some_and(|elapsed| elapsed < self.interval) {
            return false;
        }
        if forward {
            self.forward = (self.forward + self.step).min(self.max);
        } else {
            self.reverse = (self.reverse - self.step).max(-self.max);
        }
        debug!(forward, setpoint = self.setpoint(forward), "speed ramp");
        true
    }

    /// Signed setpoint for the given direction.
    pub fn setpoint(&self, forward: bool) -> i32 {
        if forward { self.forward } else { self.reverse }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_hal::sim::SimMotionSensor;

    const MS_500: Duration = Duration::from_millis(500);

    fn monitor(delta: MotionDelta, poll_period: u32) -> (StallMonitor, SimMotionSensor) {
        let sensor = SimMotionSensor::new(delta);
        let probe = sensor.clone();
        (StallMonitor::new(Some(Box::new(sensor)), 10, poll_period, 50, true), probe)
    }

    #[test]
    fn no_sensor_pins_counter_at_window() {
        let mut monitor = StallMonitor::new(None, 10, 5, 50, true);
        for _ in 0..100 {
            assert_eq!(monitor.observe(true), 10);
        }
        assert!(!monitor.is_stalled());
        assert!(!monitor.has_sensor());
    }

    #[test]
    fn sensor_is_polled_every_nth_cycle() {
        let (mut monitor, probe) = monitor(MotionDelta::ZERO, 5);
        for _ in 0..4 {
            monitor.observe(true);
        }
        assert_eq!(probe.polls(), 0);
        assert_eq!(monitor.observe(true), 9);
        assert_eq!(probe.polls(), 1);
        for _ in 0..10 {
            monitor.observe(true);
        }
        assert_eq!(probe.polls(), 3);
    }

    #[test]
    fn counter_decays_to_zero_and_stays() {
        let (mut monitor, _probe) = monitor(MotionDelta::new(5, -20), 1);
        let counters: Vec<u8> = (0..12).map(|_| monitor.observe(true)).collect();
        assert_eq!(counters, vec![9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 0, 0]);
        assert!(monitor.is_stalled());
    }

    #[test]
    fn motion_in_commanded_direction_resets_counter() {
        let (mut monitor, probe) = monitor(MotionDelta::ZERO, 1);
        for _ in 0..10 {
            monitor.observe(true);
        }
        assert!(monitor.is_stalled());

        probe.set_delta(MotionDelta::new(0, -80));
        assert_eq!(monitor.observe(true), 10);

        // Same motion while reversing is not progress.
        assert_eq!(monitor.observe(false), 9);

        probe.set_delta(MotionDelta::new(0, 80));
        assert_eq!(monitor.observe(false), 10);
    }

    #[test]
    fn stall_is_reported_while_sensor_stays_attached() {
        let (mut monitor, probe) = monitor(MotionDelta::ZERO, 1);
        for _ in 0..10 {
            monitor.observe(false);
        }
        assert!(monitor.is_stalled());
        assert!(monitor.has_sensor());
        assert_eq!(probe.polls(), 10);
    }

    #[test]
    fn progress_depends_on_direction_and_sign() {
        let ahead = MotionDelta::new(0, -80);
        assert!(is_progress(ahead, true, 50, true));
        assert!(!is_progress(ahead, false, 50, true));
        assert!(!is_progress(ahead, true, 50, false));
        assert!(is_progress(ahead, false, 50, false));
    }

    #[test]
    fn threshold_is_strict() {
        let (mut monitor, _probe) = monitor(MotionDelta::new(0, -50), 1);
        assert_eq!(monitor.observe(true), 9);
    }

    #[test]
    fn sign_convention_is_configurable() {
        let sensor = SimMotionSensor::new(MotionDelta::new(0, 80));
        let mut monitor = StallMonitor::new(Some(Box::new(sensor)), 10, 1, 50, false);
        monitor.observe(true);
        assert_eq!(monitor.counter(), 10);
    }

    #[test]
    fn ramp_requires_stall_and_steady_direction() {
        let mut ramp = SpeedRamp::new(100, 2, 1000, MS_500);
        assert!(!ramp.update(true, false, true, Some(MS_500)));
        assert!(!ramp.update(true, true, false, Some(MS_500)));
        assert_eq!(ramp.setpoint(true), 100);
        assert!(ramp.update(true, true, true, Some(MS_500)));
        assert_eq!(ramp.setpoint(true), 102);
    }

    #[test]
    fn ramp_waits_for_interval() {
        let mut ramp = SpeedRamp::new(100, 2, 1000, MS_500);
        assert!(!ramp.update(true, true, true, Some(Duration::from_millis(499))));
        assert!(ramp.update(true, true, true, None));
        assert_eq!(ramp.setpoint(true), 102);
    }

    #[test]
    fn reverse_setpoint_grows_away_from_zero() {
        let mut ramp = SpeedRamp::new(100, 2, 1000, MS_500);
        assert_eq!(ramp.setpoint(false), -100);
        ramp.update(false, true, true, Some(MS_500));
        assert_eq!(ramp.setpoint(false), -102);
        assert_eq!(ramp.setpoint(true), 100);
    }

    #[test]
    fn setpoints_are_clamped() {
        let mut ramp = SpeedRamp::new(100, 2, 103, MS_500);
        for _ in 0..5 {
            ramp.update(true, true, true, None);
            ramp.update(false, true, true, None);
        }
        assert_eq!(ramp.setpoint(true), 103);
        assert_eq!(ramp.setpoint(false), -103);
    }
}
