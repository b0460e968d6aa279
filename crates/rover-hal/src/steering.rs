//! [`ServoSteering`] – steering servo on a PWM channel.

use rover_types::RoverError;

use crate::actuator::{PwmChannel, Steering};

/// Steering servo.  Angles are clamped to ±`limit` percent before being
/// written to the channel.
pub struct ServoSteering<C: PwmChannel> {
    channel: C,
    limit: i32,
    angle: i32,
}

impl<C: PwmChannel> ServoSteering<C> {
    /// Create the servo and centre it.
    pub fn new(mut channel: C, limit: i32) -> Result<Self, RoverError> {
        channel.set_output(0)?;
        Ok(Self {
            channel,
            limit: limit.abs(),
            angle: 0,
        })
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }
}

impl<C: PwmChannel> Steering for ServoSteering<C> {
    fn set_angle(&mut self, angle: i32) -> Result<(), RoverError> {
        let angle = angle.clamp(-self.limit, self.limit);
        self.channel.set_output(angle)?;
        self.angle = angle;
        Ok(())
    }

    fn angle(&self) -> i32 {
        self.angle
    }
}
