//! Bench mode – builds the vehicle from simulated drivers so the full loop
//! can run without hardware.

use rover_control::Vehicle;
use rover_hal::sim::{RecordingChannel, SimMotionSensor, SimOutputLine, SimRegistry};
use rover_hal::{EscMotor, ServoSteering};
use rover_types::{MotionDelta, RoverError};
use tracing::{debug, info};

use crate::config::{Config, SensorConfig};

/// Handles for inspecting the simulated outputs after a run.
pub struct BenchProbes {
    pub esc: RecordingChannel,
    pub servo: RecordingChannel,
    pub status_led: SimOutputLine,
}

/// Build a [`Vehicle`] whose sensors and actuators are all simulated.
///
/// # Errors
///
/// Returns [`RoverError::DuplicateSensor`] if two sensors share an angle.
pub fn build_vehicle(cfg: &Config) -> Result<(Vehicle, BenchProbes), RoverError> {
    let mut registry = SimRegistry::new();
    for sensor in &cfg.sensors {
        debug!(?sensor, "adding simulated sensor");
        registry = match *sensor {
            SensorConfig::Ultrasonic {
                angle,
                address,
                sim_distance_cm,
            } => registry.with_ultrasonic(angle, address, sim_distance_cm),
            SensorConfig::Infrared {
                angle,
                channel,
                sim_distance_cm,
            } => registry.with_infrared(angle, channel, sim_distance_cm),
        };
    }
    let sensors = registry.build()?;

    let motion = cfg.motion.enabled.then(|| {
        Box::new(SimMotionSensor::new(MotionDelta::new(0, cfg.motion.sim_dy))) as Box<dyn rover_hal::MotionSensor>
    });

    let esc = RecordingChannel::new("sim-pwm/esc");
    let servo = RecordingChannel::new("sim-pwm/servo");
    let motor = EscMotor::new(esc.clone(), cfg.motor.to_motor_config())?;
    let steering = ServoSteering::new(servo.clone(), cfg.steering.limit)?;

    info!(
        sensors = sensors.len(),
        motion_sensor = motion.is_some(),
        "bench vehicle ready"
    );

    let vehicle = Vehicle {
        sensors,
        motion,
        motor: Box::new(motor),
        steering: Box::new(steering),
    };
    let probes = BenchProbes {
        esc,
        servo,
        status_led: SimOutputLine::new(),
    };
    Ok((vehicle, probes))
}
