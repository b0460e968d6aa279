//! Analog infrared rangers sampled through a shared analog-to-digital
//! converter.
//!
//! Several [`InfraredSensor`]s hold a handle to the same converter, which
//! can only convert one input channel at a time.  Each sensor claims the
//! converter on [`begin`][RangingSensor::begin] by selecting its own
//! channel, and checks on every later poll that the converter still points
//! at that channel.  If another sensor has claimed it in the meantime the
//! result would belong to the wrong transducer, so the sensor reports
//! not-ready and reads as `0`.
//!
//! The mutex around the converter only makes the handle shareable; it does
//! not serialise acquisitions.  Keeping a single sensor in flight is the
//! scheduler's job.

use std::sync::{Arc, Mutex};

use rover_types::{AcquisitionState, Centimeters, RoverError, SensorAccess};
use tracing::{trace, warn};

use crate::ranging::RangingSensor;

/// Converter full-scale range, in millivolts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullScale {
    Mv6144,
    Mv4096,
    Mv2048,
    Mv1024,
    Mv512,
    Mv256,
}

/// A multiplexed single-shot analog-to-digital converter.
pub trait AnalogConverter: Send {
    /// Route input `channel` to the converter.
    fn select_channel(&mut self, channel: u8) -> Result<(), RoverError>;

    /// The channel the converter currently points at.
    fn selected_channel(&mut self) -> Result<u8, RoverError>;

    fn set_full_scale(&mut self, scale: FullScale) -> Result<(), RoverError>;

    /// Switch to single-shot mode (one conversion per start).
    fn set_single_shot(&mut self) -> Result<(), RoverError>;

    fn start_conversion(&mut self) -> Result<(), RoverError>;

    /// `true` while a conversion is running.
    fn is_converting(&mut self) -> Result<bool, RoverError>;

    /// Result of the last conversion.
    fn millivolts(&mut self) -> Result<f32, RoverError>;
}

/// Converter handle shared by every sensor wired to it.
pub type SharedConverter = Arc<Mutex<dyn AnalogConverter>>;

/// Voltage-to-distance calibration of an analog ranger.
pub trait DistanceCurve: Send + Sync {
    fn distance_cm(&self, millivolts: f32) -> Centimeters;
}

/// `distance = scale * volts^exponent`, clamped to `max_cm`.
///
/// The defaults fit a Sharp GP2Y0A02 (20–150 cm).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerCurve {
    pub scale: f32,
    pub exponent: f32,
    pub max_cm: Centimeters,
}

impl Default for PowerCurve {
    fn default() -> Self {
        Self {
            scale: 60.374,
            exponent: -1.16,
            max_cm: 150,
        }
    }
}

impl PowerCurve {
    /// Inverse of [`distance_cm`][DistanceCurve::distance_cm], used by
    /// simulated converters to produce a voltage for a wanted distance.
    pub fn millivolts_for(&self, cm: Centimeters) -> f32 {
        let cm = f32::from(cm.max(1));
        (cm / self.scale).powf(1.0 / self.exponent) * 1000.0
    }
}

impl DistanceCurve for PowerCurve {
    fn distance_cm(&self, millivolts: f32) -> Centimeters {
        // No signal means nothing within range.
        if millivolts <= 0.0 {
            return self.max_cm;
        }
        let cm = self.scale * (millivolts / 1000.0).powf(self.exponent);
        cm.round().clamp(0.0, f32::from(self.max_cm)) as Centimeters
    }
}

/// Infrared ranger on one input channel of a [`SharedConverter`].
pub struct InfraredSensor {
    id: String,
    channel: u8,
    full_scale: FullScale,
    converter: SharedConverter,
    curve: Box<dyn DistanceCurve>,
    state: AcquisitionState,
    last_range: Centimeters,
}

impl InfraredSensor {
    pub fn new(
        channel: u8,
        full_scale: FullScale,
        converter: SharedConverter,
        curve: Box<dyn DistanceCurve>,
    ) -> Self {
        Self {
            id: format!("infrared@ch{channel}"),
            channel,
            full_scale,
            converter,
            curve,
            state: AcquisitionState::Idle,
            last_range: 0,
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    fn start(&self, adc: &mut dyn AnalogConverter) -> Result<(), RoverError> {
        adc.select_channel(self.channel)?;
        adc.set_single_shot()?;
        adc.set_full_scale(self.full_scale)?;
        adc.start_conversion()
    }

    fn owns(&self, adc: &mut dyn AnalogConverter) -> bool {
        matches!(adc.selected_channel(), Ok(ch) if ch == self.channel)
    }
}

impl RangingSensor for InfraredSensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn access(&self) -> SensorAccess {
        SensorAccess::Exclusive
    }

    fn begin(&mut self) {
        let Ok(mut adc) = self.converter.lock() else {
            warn!(sensor = %self.id, "converter lock poisoned");
            return;
        };
        let result = self.start(&mut *adc);
        drop(adc);
        match result {
            Ok(()) => self.state = AcquisitionState::Ranging,
            Err(e) => {
                warn!(sensor = %self.id, error = %e, "failed to start conversion");
                self.state = AcquisitionState::Idle;
            }
        }
    }

    fn is_ready(&mut self) -> bool {
        if self.state != AcquisitionState::Ranging {
            return false;
        }
        let Ok(mut adc) = self.converter.lock() else {
            return false;
        };
        if !self.owns(&mut *adc) {
            if self.state == AcquisitionState::Ranging {
                trace!(sensor = %self.id, "converter reassigned to another channel");
                self.state = AcquisitionState::Idle;
            }
            return false;
        }
        matches!(adc.is_converting(), Ok(false))
    }

    fn read(&mut self) -> Centimeters {
        let Ok(mut adc) = self.converter.lock() else {
            return 0;
        };
        if !self.owns(&mut *adc) {
            return 0;
        }
        match adc.millivolts() {
            Ok(mv) => self.last_range = self.curve.distance_cm(mv),
            Err(e) => trace!(sensor = %self.id, error = %e, "conversion read failed, keeping stale value"),
        }
        self.state = AcquisitionState::Idle;
        self.last_range
    }

    fn state(&self) -> AcquisitionState {
        self.state
    }
}
