//! In-process simulation drivers for tests and bench runs without hardware.
//!
//! Every simulated driver is cheap to [`Clone`]; clones share state, so a
//! test can hand one clone to the code under test and keep another to set
//! distances or inspect recorded commands.
//!
//! [`SimRegistry`] builds a [`SensorRegistry`] whose ultrasonic and infrared
//! sensors are the real [`Srf08`] and [`InfraredSensor`] drivers running on
//! top of simulated buses.
//!
//! # Example
//!
//! ```rust
//! use rover_hal::sim::SimRegistry;
//! use rover_types::Angle;
//!
//! let registry = SimRegistry::new()
//!     .with_ultrasonic(Angle::FRONT, 0x70, 120)
//!     .with_infrared(Angle::new(45).unwrap(), 0, 80)
//!     .build()
//!     .expect("angles are distinct");
//! assert_eq!(registry.len(), 2);
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rover_types::{
    AcquisitionState, Angle, Centimeters, MotionDelta, RoverError, SensorAccess,
};

use crate::actuator::PwmChannel;
use crate::gpio::{InputLine, OutputLine};
use crate::infrared::{AnalogConverter, FullScale, InfraredSensor, PowerCurve};
use crate::motion::MotionSensor;
use crate::ranging::RangingSensor;
use crate::registry::SensorRegistry;
use crate::ultrasonic::{RegisterBus, Srf08};

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking test thread must not hide the recorded state from others.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ────────────────────────────────────────────────────────────────────────────
// Ranging sensor
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct RangeState {
    distance: Centimeters,
    latency: u32,
    polls: u32,
    state: AcquisitionState,
    begins: u32,
    reads: u32,
}

/// A ranging sensor that reports a settable distance `latency` polls after
/// each `begin`.
#[derive(Clone)]
pub struct SimRangingSensor {
    id: String,
    access: SensorAccess,
    shared: Arc<Mutex<RangeState>>,
}

impl SimRangingSensor {
    fn new(id: impl Into<String>, access: SensorAccess, distance: Centimeters) -> Self {
        Self {
            id: id.into(),
            access,
            shared: Arc::new(Mutex::new(RangeState {
                distance,
                latency: 0,
                polls: 0,
                state: AcquisitionState::Idle,
                begins: 0,
                reads: 0,
            })),
        }
    }

    pub fn independent(id: impl Into<String>, distance: Centimeters) -> Self {
        Self::new(id, SensorAccess::Independent, distance)
    }

    pub fn exclusive(id: impl Into<String>, distance: Centimeters) -> Self {
        Self::new(id, SensorAccess::Exclusive, distance)
    }

    /// Number of not-ready polls after each `begin`.
    pub fn with_latency(self, polls: u32) -> Self {
        locked(&self.shared).latency = polls;
        self
    }

    pub fn set_distance(&self, distance: Centimeters) {
        locked(&self.shared).distance = distance;
    }

    pub fn begins(&self) -> u32 {
        locked(&self.shared).begins
    }

    pub fn reads(&self) -> u32 {
        locked(&self.shared).reads
    }
}

impl RangingSensor for SimRangingSensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn access(&self) -> SensorAccess {
        self.access
    }

    fn begin(&mut self) {
        let mut s = locked(&self.shared);
        s.state = AcquisitionState::Ranging;
        s.polls = 0;
        s.begins += 1;
    }

    fn is_ready(&mut self) -> bool {
        let mut s = locked(&self.shared);
        if s.state != AcquisitionState::Ranging {
            return false;
        }
        s.polls += 1;
        s.polls > s.latency
    }

    fn read(&mut self) -> Centimeters {
        let mut s = locked(&self.shared);
        s.state = AcquisitionState::Idle;
        s.reads += 1;
        s.distance
    }

    fn state(&self) -> AcquisitionState {
        locked(&self.shared).state
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Register-bus device (SRF08 register map)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct DeviceState {
    range: Centimeters,
    light: u8,
    busy_reads: u32,
    remaining: u32,
    failing_writes: u32,
}

/// Simulated SRF08 register file: stays silent for `busy_reads` reads after
/// every write, then serves the configured range.
#[derive(Clone)]
pub struct SimRegisterDevice {
    shared: Arc<Mutex<DeviceState>>,
}

impl SimRegisterDevice {
    pub fn new(range: Centimeters, busy_reads: u32) -> Self {
        Self {
            shared: Arc::new(Mutex::new(DeviceState {
                range,
                light: 0,
                busy_reads,
                remaining: 0,
                failing_writes: 0,
            })),
        }
    }

    pub fn set_range(&self, range: Centimeters) {
        locked(&self.shared).range = range;
    }

    /// Refuse the next `count` register writes.
    pub fn fail_writes(&self, count: u32) {
        locked(&self.shared).failing_writes = count;
    }
}

impl RegisterBus for SimRegisterDevice {
    fn write_u8(&mut self, _register: u8, _value: u8) -> Result<(), RoverError> {
        let mut s = locked(&self.shared);
        if s.failing_writes > 0 {
            s.failing_writes -= 1;
            return Err(RoverError::hardware("sim-srf08", "write not acknowledged"));
        }
        s.remaining = s.busy_reads;
        Ok(())
    }

    fn read_u8(&mut self, register: u8) -> Result<u8, RoverError> {
        let mut s = locked(&self.shared);
        if s.remaining > 0 {
            s.remaining -= 1;
            return Err(RoverError::hardware("sim-srf08", "ranging in progress"));
        }
        let [high, low] = s.range.to_be_bytes();
        Ok(match register {
            1 => s.light,
            2 => high,
            3 => low,
            _ => 1,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Analog converter
// ────────────────────────────────────────────────────────────────────────────

/// Simulated multiplexed converter.  Each conversion takes `latency` polls
/// of [`AnalogConverter::is_converting`].
#[derive(Debug, Default)]
pub struct SimConverter {
    millivolts: BTreeMap<u8, f32>,
    channel: u8,
    full_scale: Option<FullScale>,
    single_shot: bool,
    latency: u32,
    remaining: u32,
    started: u32,
    failing_starts: u32,
}

impl SimConverter {
    pub fn new(latency: u32) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn set_millivolts(&mut self, channel: u8, millivolts: f32) {
        self.millivolts.insert(channel, millivolts);
    }

    pub fn current_channel(&self) -> u8 {
        self.channel
    }

    pub fn full_scale(&self) -> Option<FullScale> {
        self.full_scale
    }

    pub fn is_single_shot(&self) -> bool {
        self.single_shot
    }

    pub fn conversions_started(&self) -> u32 {
        self.started
    }

    /// Refuse the next `count` conversion starts.
    pub fn fail_next_starts(&mut self, count: u32) {
        self.failing_starts = count;
    }
}

impl AnalogConverter for SimConverter {
    fn select_channel(&mut self, channel: u8) -> Result<(), RoverError> {
        self.channel = channel;
        Ok(())
    }

    fn selected_channel(&mut self) -> Result<u8, RoverError> {
        Ok(self.channel)
    }

    fn set_full_scale(&mut self, scale: FullScale) -> Result<(), RoverError> {
        self.full_scale = Some(scale);
        Ok(())
    }

    fn set_single_shot(&mut self) -> Result<(), RoverError> {
        self.single_shot = true;
        Ok(())
    }

    fn start_conversion(&mut self) -> Result<(), RoverError> {
        if self.failing_starts > 0 {
            self.failing_starts -= 1;
            return Err(RoverError::hardware("sim-adc", "conversion start refused"));
        }
        self.remaining = self.latency;
        self.started += 1;
        Ok(())
    }

    fn is_converting(&mut self) -> Result<bool, RoverError> {
        if self.remaining > 0 {
            self.remaining -= 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn millivolts(&mut self) -> Result<f32, RoverError> {
        Ok(self.millivolts.get(&self.channel).copied().unwrap_or(0.0))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Motion sensor
// ────────────────────────────────────────────────────────────────────────────

/// Motion sensor that reports the same delta on every poll until changed.
#[derive(Clone)]
pub struct SimMotionSensor {
    shared: Arc<Mutex<(MotionDelta, u32)>>,
}

impl SimMotionSensor {
    pub fn new(delta: MotionDelta) -> Self {
        Self {
            shared: Arc::new(Mutex::new((delta, 0))),
        }
    }

    pub fn set_delta(&self, delta: MotionDelta) {
        locked(&self.shared).0 = delta;
    }

    pub fn polls(&self) -> u32 {
        locked(&self.shared).1
    }
}

impl MotionSensor for SimMotionSensor {
    fn id(&self) -> &str {
        "sim-motion"
    }

    fn poll(&mut self) -> MotionDelta {
        let mut s = locked(&self.shared);
        s.1 += 1;
        s.0
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PWM channel
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ChannelLog {
    outputs: Vec<i32>,
    fail: bool,
}

/// PWM channel that records every output value written to it.
#[derive(Clone)]
pub struct RecordingChannel {
    id: String,
    log: Arc<Mutex<ChannelLog>>,
}

impl RecordingChannel {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            log: Arc::new(Mutex::new(ChannelLog::default())),
        }
    }

    /// Every value written so far, oldest first.
    pub fn outputs(&self) -> Vec<i32> {
        locked(&self.log).outputs.clone()
    }

    pub fn last(&self) -> Option<i32> {
        locked(&self.log).outputs.last().copied()
    }

    pub fn clear(&self) {
        locked(&self.log).outputs.clear();
    }

    /// Make subsequent writes fail with a hardware fault.
    pub fn fail_next_writes(&self, fail: bool) {
        locked(&self.log).fail = fail;
    }
}

impl PwmChannel for RecordingChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_output(&mut self, value: i32) -> Result<(), RoverError> {
        let mut log = locked(&self.log);
        if log.fail {
            return Err(RoverError::hardware(&self.id, "simulated write failure"));
        }
        log.outputs.push(value);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Digital lines
// ────────────────────────────────────────────────────────────────────────────

/// Input line with a settable level.
#[derive(Debug, Clone)]
pub struct SimInputLine(Arc<AtomicBool>);

impl SimInputLine {
    pub fn new(high: bool) -> Self {
        Self(Arc::new(AtomicBool::new(high)))
    }

    pub fn set_level(&self, high: bool) {
        self.0.store(high, Ordering::SeqCst);
    }
}

impl InputLine for SimInputLine {
    fn is_high(&mut self) -> Result<bool, RoverError> {
        Ok(self.0.load(Ordering::SeqCst))
    }
}

/// Output line recording every level written.
#[derive(Debug, Clone, Default)]
pub struct SimOutputLine(Arc<Mutex<Vec<bool>>>);

impl SimOutputLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> Option<bool> {
        locked(&self.0).last().copied()
    }

    pub fn history(&self) -> Vec<bool> {
        locked(&self.0).clone()
    }
}

impl OutputLine for SimOutputLine {
    fn set_high(&mut self, high: bool) -> Result<(), RoverError> {
        locked(&self.0).push(high);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimRegistry builder
// ────────────────────────────────────────────────────────────────────────────

/// Polls an ultrasonic ranger stays busy for after each ping.
const SIM_PING_POLLS: u32 = 6;

/// Polls one infrared conversion takes.
const SIM_CONVERSION_POLLS: u32 = 1;

/// Builder for a [`SensorRegistry`] populated with simulated sensors.
///
/// All infrared sensors share one [`SimConverter`], exactly as they would
/// share one physical converter.
pub struct SimRegistry {
    converter: Arc<Mutex<SimConverter>>,
    curve: PowerCurve,
    sensors: Vec<(Angle, Box<dyn RangingSensor>)>,
}

impl Default for SimRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRegistry {
    pub fn new() -> Self {
        Self {
            converter: Arc::new(Mutex::new(SimConverter::new(SIM_CONVERSION_POLLS))),
            curve: PowerCurve::default(),
            sensors: Vec::new(),
        }
    }

    /// Add an SRF08 driver at `address` over a simulated register device
    /// that always measures `distance`.
    pub fn with_ultrasonic(mut self, angle: Angle, address: u8, distance: Centimeters) -> Self {
        let device = SimRegisterDevice::new(distance, SIM_PING_POLLS);
        self.sensors
            .push((angle, Box::new(Srf08::new(address, device))));
        self
    }

    /// Add an infrared driver on `channel` of the shared simulated converter,
    /// with the channel voltage set to read back as `distance`.
    pub fn with_infrared(mut self, angle: Angle, channel: u8, distance: Centimeters) -> Self {
        locked(&self.converter).set_millivolts(channel, self.curve.millivolts_for(distance));
        let sensor = InfraredSensor::new(
            channel,
            FullScale::Mv4096,
            self.converter.clone(),
            Box::new(self.curve),
        );
        self.sensors.push((angle, Box::new(sensor)));
        self
    }

    /// Add an arbitrary sensor.
    pub fn with_sensor(mut self, angle: Angle, sensor: Box<dyn RangingSensor>) -> Self {
        self.sensors.push((angle, sensor));
        self
    }

    /// Handle to the shared converter, for changing infrared voltages.
    pub fn converter(&self) -> Arc<Mutex<SimConverter>> {
        self.converter.clone()
    }

    /// Consume the builder and return the populated registry.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::DuplicateSensor`] if two sensors share an angle.
    pub fn build(self) -> Result<SensorRegistry, RoverError> {
        let mut registry = SensorRegistry::new();
        for (angle, sensor) in self.sensors {
            registry.register(angle, sensor)?;
        }
        Ok(registry)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
