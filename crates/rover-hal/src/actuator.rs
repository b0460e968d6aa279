//! Actuator traits for the drive motor and the steering servo, plus the
//! [`PwmChannel`] seam both are driven through.
//!
//! Speeds and angles are signed values in the actuator's own scale:
//! positive is forward / right, negative is reverse / left.  Calibration
//! from these values to pulse widths belongs to the `PwmChannel`
//! implementation.

use rover_types::RoverError;

/// One output channel of a PWM driver.
pub trait PwmChannel: Send + Sync {
    /// Stable identifier, e.g. `"pwm0/ch1"`.
    fn id(&self) -> &str;

    /// Drive the channel to a signed output value.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::HardwareFault`] if the value cannot be written.
    fn set_output(&mut self, value: i32) -> Result<(), RoverError>;
}

/// The drive motor.
pub trait Motor: Send + Sync {
    /// Command a signed speed.
    ///
    /// Implementations are responsible for any sequencing the speed
    /// controller needs when the sign changes.
    fn set_speed(&mut self, speed: i32) -> Result<(), RoverError>;

    /// Bring the vehicle to a halt, actively braking when moving fast.
    fn brake(&mut self) -> Result<(), RoverError>;

    /// The last commanded speed.
    fn speed(&self) -> i32;
}

/// The steering servo.
pub trait Steering: Send + Sync {
    /// Command a signed steering angle in percent of full lock
    /// (`-100` = full left, `100` = full right).
    fn set_angle(&mut self, angle: i32) -> Result<(), RoverError>;

    /// The last commanded angle.
    fn angle(&self) -> i32;
}
