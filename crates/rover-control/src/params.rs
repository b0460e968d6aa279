//! Tunable parameters of the control loop.
//!
//! Every field has a default, and both structs deserialize with
//! `#[serde(default)]`, so a configuration file only needs to name the
//! values it changes.

use std::time::Duration;

use rover_types::{Angle, Centimeters};
use serde::{Deserialize, Serialize};

/// Thresholds and sensor angles used by the
/// [`DecisionEngine`][crate::decision::DecisionEngine].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationParams {
    /// Forward-looking sensor.
    pub front_angle: Angle,
    /// Short-range side sensors (wide field of view).
    pub right_short_angle: Angle,
    pub left_short_angle: Angle,
    /// Long-range side sensors (narrow field of view).
    pub right_long_angle: Angle,
    pub left_long_angle: Angle,

    /// Front distance below which turns are doubled.
    pub caution_cm: Centimeters,
    pub caution_multiplier: i32,
    /// Front distance below which turns are quadrupled.
    pub danger_cm: Centimeters,
    pub danger_multiplier: i32,
    /// Front distance below which the vehicle backs off, steering the
    /// opposite way.
    pub reverse_cm: Centimeters,
    pub reverse_multiplier: i32,

    /// A long-range reading below this replaces the short-range one.
    pub right_long_override_cm: Centimeters,
    pub left_long_override_cm: Centimeters,

    /// Minimum left/right difference worth steering for.
    pub side_imbalance_cm: Centimeters,
    /// Side distances under which that side counts as obstructed.
    pub right_near_cm: Centimeters,
    pub left_near_cm: Centimeters,

    /// Base steering angle, before the front multiplier is applied.
    pub steer_angle: i32,
}

impl Default for NavigationParams {
    fn default() -> Self {
        Self {
            front_angle: Angle::FRONT,
            right_short_angle: Angle::wrapping(45),
            left_short_angle: Angle::wrapping(135),
            right_long_angle: Angle::wrapping(90),
            left_long_angle: Angle::wrapping(270),
            caution_cm: 80,
            caution_multiplier: 2,
            danger_cm: 50,
            danger_multiplier: 4,
            reverse_cm: 30,
            reverse_multiplier: -2,
            right_long_override_cm: 25,
            left_long_override_cm: 20,
            side_imbalance_cm: 20,
            right_near_cm: 50,
            left_near_cm: 70,
            steer_angle: 60,
        }
    }
}

/// Timing, stall detection and speed-ramp parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopParams {
    /// Sleep between iterations.  Only bounds CPU use.
    pub cycle_period_ms: u64,
    /// Samples kept per mounting angle.
    pub history_capacity: usize,
    /// The motion sensor is polled every this many cycles.
    pub motion_poll_period: u32,
    /// Value the stall counter resets to when motion is seen.
    pub stall_window: u8,
    /// Minimum |dy| counted as motion.
    pub motion_threshold: i32,
    /// `true` when the motion sensor reports forward travel as negative dy.
    pub forward_is_negative_dy: bool,
    /// Speed commanded when starting off in either direction.
    pub min_speed: i32,
    /// Setpoint increment applied by each ramp step.
    pub ramp_step: i32,
    /// Minimum time between two speed changes caused by the ramp.
    pub ramp_interval_ms: u64,
    /// Largest speed magnitude the ramp may reach.
    pub max_speed: i32,
}

impl Default for LoopParams {
    fn default() -> Self {
        Self {
            cycle_period_ms: 10,
            history_capacity: 10,
            motion_poll_period: 5,
            stall_window: 10,
            motion_threshold: 50,
            forward_is_negative_dy: true,
            min_speed: 100,
            ramp_step: 2,
            ramp_interval_ms: 500,
            max_speed: 1000,
        }
    }
}

impl LoopParams {
    pub fn cycle_period(&self) -> Duration {
        Duration::from_millis(self.cycle_period_ms)
    }

    pub fn ramp_interval(&self) -> Duration {
        Duration::from_millis(self.ramp_interval_ms)
    }
}
