//! [`EscMotor`] – drive motor behind a hobby electronic speed controller.
//!
//! # Brake sequence
//!
//! These controllers will not drop straight into reverse.  Reverse is only
//! engaged after a full-scale brake pulse followed by neutral, and jumping
//! directly between opposite speeds is mechanically unsafe anyway.
//! [`EscMotor::set_speed`] therefore emits
//!
//! ```text
//! opposite full scale  →  0  →  requested speed
//! ```
//!
//! whenever the requested speed enters reverse from forward or neutral, or
//! leaves reverse toward forward.  Each of the first two outputs is held for
//! [`MotorConfig::pulse_hold`].

use std::thread;
use std::time::Duration;

use rover_types::RoverError;
use tracing::debug;

use crate::actuator::{Motor, PwmChannel};

/// Tunables of an [`EscMotor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorConfig {
    /// Magnitude of a full-scale command.
    pub full_scale: i32,
    /// Speeds above this magnitude are actively braked by [`Motor::brake`].
    pub brake_threshold: i32,
    /// How long each pulse of the brake sequence is held.
    pub pulse_hold: Duration,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            full_scale: 1000,
            brake_threshold: 50,
            pulse_hold: Duration::from_millis(100),
        }
    }
}

/// Speed-controller driven motor.
pub struct EscMotor<C: PwmChannel> {
    channel: C,
    config: MotorConfig,
    speed: i32,
}

impl<C: PwmChannel> EscMotor<C> {
    /// Create the motor and drive its channel to neutral.
    pub fn new(mut channel: C, config: MotorConfig) -> Result<Self, RoverError> {
        channel.set_output(0)?;
        Ok(Self {
            channel,
            config,
            speed: 0,
        })
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    fn hold(&self) {
        if !self.config.pulse_hold.is_zero() {
            thread::sleep(self.config.pulse_hold);
        }
    }

    /// Full-scale pulse against `direction`, then neutral.
    fn pulse_then_neutral(&mut self, direction: i32) -> Result<(), RoverError> {
        let pulse = -direction.signum() * self.config.full_scale;
        debug!(channel = %self.channel.id(), pulse, "brake sequence");
        self.channel.set_output(pulse)?;
        self.hold();
        self.channel.set_output(0)?;
        self.hold();
        Ok(())
    }
}

impl<C: PwmChannel> Motor for EscMotor<C> {
    fn set_speed(&mut self, speed: i32) -> Result<(), RoverError> {
        let full = self.config.full_scale;
        let speed = speed.clamp(-full, full);
        let entering_reverse = speed < 0 && self.speed >= 0;
        let leaving_reverse = speed > 0 && self.speed < 0;
        if entering_reverse {
            // Pulse against forward motion (or neutral) to arm reverse.
            self.pulse_then_neutral(1)?;
        } else if leaving_reverse {
            self.pulse_then_neutral(-1)?;
        }
        self.channel.set_output(speed)?;
        self.speed = speed;
        Ok(())
    }

    fn brake(&mut self) -> Result<(), RoverError> {
        if self.speed.abs() > self.config.brake_threshold {
            let moving = self.speed;
            self.pulse_then_neutral(moving)?;
        } else {
            self.channel.set_output(0)?;
        }
        self.speed = 0;
        Ok(())
    }

    fn speed(&self) -> i32 {
        self.speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::RecordingChannel;

    fn motor() -> EscMotor<RecordingChannel> {
        let config = MotorConfig {
            pulse_hold: Duration::ZERO,
            ..MotorConfig::default()
        };
        let mut motor = EscMotor::new(RecordingChannel::new("esc"), config).unwrap();
        motor.channel().clear();
        motor
    }

    #[test]
    fn new_drives_channel_to_neutral() {
        let channel = RecordingChannel::new("esc");
        let log = channel.clone();
        let motor = EscMotor::new(channel, MotorConfig::default()).unwrap();
        assert_eq!(log.outputs(), vec![0]);
        assert_eq!(motor.speed(), 0);
    }

    #[test]
    fn forward_to_reverse_goes_through_brake_sequence() {
        let mut motor = motor();
        motor.set_speed(30).unwrap();
        motor.set_speed(-50).unwrap();
        assert_eq!(motor.channel().outputs(), vec![30, -1000, 0, -50]);
        assert_eq!(motor.speed(), -50);
    }

    #[test]
    fn reverse_from_neutral_arms_reverse_first() {
        let mut motor = motor();
        motor.set_speed(-20).unwrap();
        assert_eq!(motor.channel().outputs(), vec![-1000, 0, -20]);
    }

    #[test]
    fn reverse_to_forward_pulses_forward_first() {
        let mut motor = motor();
        motor.set_speed(-40).unwrap();
        motor.channel().clear();
        motor.set_speed(25).unwrap();
        assert_eq!(motor.channel().outputs(), vec![1000, 0, 25]);
    }

    #[test]
    fn same_sign_changes_are_direct() {
        let mut motor = motor();
        motor.set_speed(20).unwrap();
        motor.set_speed(22).unwrap();
        motor.set_speed(0).unwrap();
        assert_eq!(motor.channel().outputs(), vec![20, 22, 0]);

        motor.set_speed(-20).unwrap();
        motor.channel().clear();
        motor.set_speed(-22).unwrap();
        assert_eq!(motor.channel().outputs(), vec![-22]);
    }

    #[test]
    fn speed_is_clamped_to_full_scale() {
        let mut motor = motor();
        motor.set_speed(5000).unwrap();
        assert_eq!(motor.speed(), 1000);
    }

    #[test]
    fn brake_pulses_against_fast_motion() {
        let mut motor = motor();
        motor.set_speed(300).unwrap();
        motor.channel().clear();
        motor.brake().unwrap();
        assert_eq!(motor.channel().outputs(), vec![-1000, 0]);
        assert_eq!(motor.speed(), 0);
    }

    #[test]
    fn brake_at_low_speed_just_stops() {
        let mut motor = motor();
        motor.set_speed(40).unwrap();
        motor.channel().clear();
        motor.brake().unwrap();
        assert_eq!(motor.channel().outputs(), vec![0]);
    }

    #[test]
    fn failed_write_is_reported() {
        let mut motor = motor();
        motor.channel().fail_next_writes(true);
        assert!(matches!(
            motor.set_speed(10),
            Err(RoverError::HardwareFault { .. })
        ));
    }
}
