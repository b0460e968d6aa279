use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Range reading in whole centimetres.  `0` means "no reading yet".
pub type Centimeters = u16;

/// Mounting angle of a sensor in degrees, clockwise from the front of the
/// vehicle (`0` = straight ahead).  Always in `0..360`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Angle(u16);

impl Angle {
    /// Straight ahead.
    pub const FRONT: Angle = Angle(0);

    /// Build an angle, rejecting values outside `0..360`.
    pub fn new(degrees: u16) -> Result<Self, RoverError> {
        if degrees < 360 {
            Ok(Self(degrees))
        } else {
            Err(RoverError::InvalidAngle(degrees))
        }
    }

    /// Build an angle, reducing `degrees` modulo a full turn.
    pub const fn wrapping(degrees: u16) -> Self {
        Self(degrees % 360)
    }

    pub fn degrees(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for Angle {
    type Error = RoverError;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        Angle::new(degrees)
    }
}

impl From<Angle> for u16 {
    fn from(angle: Angle) -> Self {
        angle.0
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// Relative motion reported by a motion sensor since its previous poll.
/// Unitless; both components are zero when nothing moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionDelta {
    pub dx: i32,
    pub dy: i32,
}

impl MotionDelta {
    pub const ZERO: MotionDelta = MotionDelta { dx: 0, dy: 0 };

    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

/// Acquisition state of a ranging sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionState {
    /// No measurement in flight.
    #[default]
    Idle,
    /// A measurement was triggered and its result has not been consumed yet.
    Ranging,
}

/// How a ranging sensor reaches its transducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorAccess {
    /// Private bus address; may range concurrently with every other sensor.
    Independent,
    /// Shares a single converter with other sensors; only one may be in
    /// flight at a time.
    Exclusive,
}

/// Global error type for device bring-up, driver faults, and configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoverError {
    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Invalid mounting angle: {0} (expected 0..360)")]
    InvalidAngle(u16),

    #[error("A ranging sensor is already registered at {0}")]
    DuplicateSensor(Angle),

    #[error("Configuration Error: {0}")]
    Config(String),
}

impl RoverError {
    /// Shorthand for a [`RoverError::HardwareFault`].
    pub fn hardware(component: impl Into<String>, details: impl Into<String>) -> Self {
        RoverError::HardwareFault {
            component: component.into(),
            details: details.into(),
        }
    }
}
