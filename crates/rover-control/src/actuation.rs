//! [`ActuationSequencer`] – turns decisions into motor and servo commands.
//!
//! Commands are only sent when something changed: the motor on a direction
//! change or a ramp step, the servo when the steering angle differs from
//! the one last sent.  A failed write is logged and not retried; the next
//! change will try again.

use std::time::Duration;

use rover_hal::{Motor, Steering};
use tracing::{debug, warn};

/// What [`ActuationSequencer::apply`] sent this cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Actuation {
    pub motor_sent: bool,
    pub steering_sent: bool,
}

/// Owns the drive motor and steering servo.
pub struct ActuationSequencer {
    motor: Box<dyn Motor>,
    steering: Box<dyn Steering>,
    /// Direction of the last motor command, `None` before the first one.
    last_forward: Option<bool>,
    /// Servo angle last sent; the servo starts centred.
    last_angle: i32,
    last_speed_change: Option<Duration>,
    motor_commands: u64,
    steering_commands: u64,
}

impl ActuationSequencer {
    pub fn new(motor: Box<dyn Motor>, steering: Box<dyn Steering>) -> Self {
        Self {
            motor,
            steering,
            last_forward: None,
            last_angle: 0,
            last_speed_change: None,
            motor_commands: 0,
            steering_commands: 0,
        }
    }

    /// Whether `forward` differs from the direction last sent to the motor.
    pub fn direction_changed(&self, forward: bool) -> bool {
        self.last_forward != Some(forward)
    }

    /// Time since the last motor command, `None` if none was sent yet.
    pub fn since_last_speed_change(&self, now: Duration) -> Option<Duration> {
        self.last_speed_change.map(|at| now.saturating_sub(at))
    }

    /// Send whatever changed.
    ///
    /// `setpoint` is the signed speed for `forward`; it is sent when the
    /// direction changed or `ramped` is set.  `angle` is sent when it
    /// differs from the last angle sent.
    pub fn apply(&mut self, forward: bool, setpoint: i32, ramped: bool, angle: i32, now: Duration) -> Actuation {
        let mut sent = Actuation::default();

        if self.direction_changed(forward) || ramped {
            debug!(forward, speed = setpoint, "motor command");
            if let Err(e) = self.motor.set_speed(setpoint) {
                warn!(error = %e, speed = setpoint, "motor command failed");
            }
            self.last_forward = Some(forward);
            self.last_speed_change = Some(now);
            self.motor_commands += 1;
            sent.motor_sent = true;
        }

        if self.last_angle != angle {
            debug!(angle, "steering command");
            if let Err(e) = self.steering.set_angle(angle) {
                warn!(error = %e, angle, "steering command failed");
            }
            self.last_angle = angle;
            self.steering_commands += 1;
            sent.steering_sent = true;
        }

        sent
    }

    /// Brake the motor and centre the steering.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.motor.brake() {
            warn!(error = %e, "brake failed");
        }
        if let Err(e) = self.steering.set_angle(0) {
            warn!(error = %e, "centring steering failed");
        }
        self.last_forward = None;
        self.last_angle = 0;
    }

    pub fn motor_commands(&self) -> u64 {
        self.motor_commands
    }

    pub fn steering_commands(&self) -> u64 {
        self.steering_commands
    }

    pub fn motor(&self) -> &dyn Motor {
        self.motor.as_ref()
    }

    pub fn steering(&self) -> &dyn Steering {
        self.steering.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_hal::sim::RecordingChannel;
    use rover_hal::{EscMotor, MotorConfig, ServoSteering};

    fn sequencer() -> (ActuationSequencer, RecordingChannel, RecordingChannel) {
        let esc = RecordingChannel::new("esc");
        let servo = RecordingChannel::new("servo");
        let config = MotorConfig {
            pulse_hold: Duration::ZERO,
            ..MotorConfig::default()
        };
        let motor = EscMotor::new(esc.clone(), config).unwrap();
        let steering = ServoSteering::new(servo.clone(), 100).unwrap();
        esc.clear();
        servo.clear();
        (ActuationSequencer::new(Box::new(motor), Box::new(steering)), esc, servo)
    }

    #[test]
    fn first_cycle_commands_motor_but_not_centred_servo() {
        let (mut seq, esc, servo) = sequencer();
        let sent = seq.apply(true, 100, false, 0, Duration::ZERO);
        assert_eq!(sent, Actuation { motor_sent: true, steering_sent: false });
        assert_eq!(esc.outputs(), vec![100]);
        assert!(servo.outputs().is_empty());
        assert_eq!(seq.steering_commands(), 0);
        assert_eq!(seq.since_last_speed_change(Duration::from_millis(30)), Some(Duration::from_millis(30)));
    }

    #[test]
    fn first_off_centre_angle_is_sent() {
        let (mut seq, _esc, servo) = sequencer();
        let sent = seq.apply(true, 100, false, -60, Duration::ZERO);
        assert!(sent.steering_sent);
        assert_eq!(servo.outputs(), vec![-60]);
    }

    #[test]
    fn unchanged_values_are_not_resent() {
        let (mut seq, esc, servo) = sequencer();
        seq.apply(true, 100, false, 60, Duration::ZERO);
        let sent = seq.apply(true, 100, false, 60, Duration::from_millis(10));
        assert_eq!(sent, Actuation::default());
        assert_eq!(esc.outputs().len(), 1);
        assert_eq!(servo.outputs().len(), 1);
        assert_eq!(seq.motor_commands(), 1);
        assert_eq!(seq.steering_commands(), 1);
    }

    #[test]
    fn direction_change_goes_through_brake_sequence() {
        let (mut seq, esc, _servo) = sequencer();
        seq.apply(true, 100, false, 0, Duration::ZERO);
        seq.apply(false, -100, false, 0, Duration::from_millis(10));
        assert_eq!(esc.outputs(), vec![100, -1000, 0, -100]);
        assert_eq!(seq.motor().speed(), -100);
    }

    #[test]
    fn ramp_resends_the_setpoint() {
        let (mut seq, esc, _servo) = sequencer();
        seq.apply(true, 100, false, 0, Duration::ZERO);
        let sent = seq.apply(true, 102, true, 0, Duration::from_millis(600));
        assert!(sent.motor_sent);
        assert_eq!(esc.last(), Some(102));
        assert_eq!(seq.since_last_speed_change(Duration::from_millis(600)), Some(Duration::ZERO));
    }

    #[test]
    fn elapsed_time_never_underflows() {
        let (mut seq, _esc, _servo) = sequencer();
        seq.apply(true, 100, false, 0, Duration::from_secs(5));
        assert_eq!(seq.since_last_speed_change(Duration::from_secs(1)), Some(Duration::ZERO));
    }

    #[test]
    fn failed_writes_are_not_retried() {
        let (mut seq, esc, servo) = sequencer();
        servo.fail_next_writes(true);
        let sent = seq.apply(true, 100, false, 60, Duration::ZERO);
        assert!(sent.steering_sent);
        servo.fail_next_writes(false);
        seq.apply(true, 100, false, 60, Duration::from_millis(10));
        assert!(servo.outputs().is_empty());
        assert_eq!(esc.outputs(), vec![100]);
    }

    #[test]
    fn shutdown_brakes_and_centres() {
        let (mut seq, esc, servo) = sequencer();
        seq.apply(true, 300, false, 60, Duration::ZERO);
        seq.shutdown();
        assert_eq!(esc.outputs(), vec![300, -1000, 0]);
        assert_eq!(servo.last(), Some(0));
        assert_eq!(seq.steering().angle(), 0);
        assert!(seq.direction_changed(true));
    }
}
