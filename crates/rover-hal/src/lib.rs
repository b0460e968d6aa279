//! `rover-hal` – Device contracts and drivers
//!
//! Everything the control loop touches on the vehicle goes through one of
//! the traits in this crate.  Bus-level access (register reads, converter
//! multiplexing, PWM duty cycles, digital lines) sits behind narrow seams so
//! that the drivers here only carry the sequencing logic of each device.
//!
//! # Modules
//!
//! - [`ranging`] – [`RangingSensor`][ranging::RangingSensor]: the
//!   non-blocking `begin` / `is_ready` / `read` contract every distance
//!   sensor satisfies.
//! - [`ultrasonic`] – [`Srf08`][ultrasonic::Srf08]: an ultrasonic ranger on
//!   a private bus address ([`SensorAccess::Independent`]).
//! - [`infrared`] – [`InfraredSensor`][infrared::InfraredSensor]: an analog
//!   ranger sampled through a converter shared with other sensors
//!   ([`SensorAccess::Exclusive`]).
//! - [`motion`] – [`MotionSensor`][motion::MotionSensor]: relative motion
//!   since the previous poll.
//! - [`actuator`] – [`Motor`][actuator::Motor], [`Steering`][actuator::Steering]
//!   and the [`PwmChannel`][actuator::PwmChannel] output seam.
//! - [`motor`] – [`EscMotor`][motor::EscMotor]: a speed controller that
//!   enforces the brake sequence on direction reversal.
//! - [`steering`] – [`ServoSteering`][steering::ServoSteering].
//! - [`gpio`] – digital lines and the [`StopSignal`][gpio::StopSignal]
//!   contract.
//! - [`registry`] – [`SensorRegistry`][registry::SensorRegistry]: the angle
//!   registry populated at bring-up.
//! - [`sim`] – in-process drivers for tests and bench runs.
//!
//! [`SensorAccess::Independent`]: rover_types::SensorAccess::Independent
//! [`SensorAccess::Exclusive`]: rover_types::SensorAccess::Exclusive

pub mod actuator;
pub mod gpio;
pub mod infrared;
pub mod motion;
pub mod motor;
pub mod ranging;
pub mod registry;
pub mod sim;
pub mod steering;
pub mod ultrasonic;

pub use actuator::{Motor, PwmChannel, Steering};
pub use gpio::{InputLine, LineStop, OutputLine, StopFlag, StopSignal};
pub use infrared::{AnalogConverter, DistanceCurve, FullScale, InfraredSensor, PowerCurve, SharedConverter};
pub use motion::MotionSensor;
pub use motor::{EscMotor, MotorConfig};
pub use ranging::RangingSensor;
pub use registry::SensorRegistry;
pub use steering::ServoSteering;
pub use ultrasonic::{RegisterBus, Srf08};
