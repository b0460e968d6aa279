//! SRF08-style ultrasonic ranger.
//!
//! The device sits on its own bus address, so any number of them may range
//! at the same time.  While a ping is in flight the device does not answer
//! register reads; the first successful read of the command register is the
//! completion signal.

use rover_types::{AcquisitionState, Centimeters, RoverError, SensorAccess};
use tracing::{trace, warn};

use crate::ranging::RangingSensor;

const COMMAND_REGISTER: u8 = 0;
const LIGHT_REGISTER: u8 = 1;
const RANGE_HIGH_REGISTER: u8 = 2;
const RANGE_LOW_REGISTER: u8 = 3;

/// Start ranging, report the result in centimetres.
const RANGE_IN_CM: u8 = 0x51;

/// Handle to one device on a register-addressed bus.
///
/// Implementations own the device address; the driver only names registers.
pub trait RegisterBus: Send + Sync {
    /// Write an 8-bit register.
    fn write_u8(&mut self, register: u8, value: u8) -> Result<(), RoverError>;

    /// Read an 8-bit register.  Fails while the device is busy.
    fn read_u8(&mut self, register: u8) -> Result<u8, RoverError>;
}

/// Ultrasonic ranger driver.
pub struct Srf08<B: RegisterBus> {
    id: String,
    bus: B,
    state: AcquisitionState,
    last_range: Centimeters,
}

impl<B: RegisterBus> Srf08<B> {
    /// Wrap a bus handle already bound to the device at `address`.
    pub fn new(address: u8, bus: B) -> Self {
        Self {
            id: format!("srf08@{address:#04x}"),
            bus,
            state: AcquisitionState::Idle,
            last_range: 0,
        }
    }

    /// Ambient light level measured during the last ping, `0` when the
    /// device does not answer.
    pub fn light_level(&mut self) -> u8 {
        self.bus.read_u8(LIGHT_REGISTER).unwrap_or(0)
    }

    fn read_range(&mut self) -> Result<Centimeters, RoverError> {
        let high = self.bus.read_u8(RANGE_HIGH_REGISTER)?;
        let low = self.bus.read_u8(RANGE_LOW_REGISTER)?;
        Ok(u16::from_be_bytes([high, low]))
    }
}

impl<B: RegisterBus> RangingSensor for Srf08<B> {
    fn id(&self) -> &str {
        &self.id
    }

    fn access(&self) -> SensorAccess {
        SensorAccess::Independent
    }

    fn begin(&mut self) {
        match self.bus.write_u8(COMMAND_REGISTER, RANGE_IN_CM) {
            Ok(()) => self.state = AcquisitionState::Ranging,
            Err(e) => {
                warn!(sensor = %self.id, error = %e, "failed to start ranging");
                self.state = AcquisitionState::Idle;
            }
        }
    }

    fn is_ready(&mut self) -> bool {
        self.state == AcquisitionState::Ranging && self.bus.read_u8(COMMAND_REGISTER).is_ok()
    }

    fn read(&mut self) -> Centimeters {
        match self.read_range() {
            Ok(range) => self.last_range = range,
            Err(e) => trace!(sensor = %self.id, error = %e, "range read failed, keeping stale value"),
        }
        self.state = AcquisitionState::Idle;
        self.last_range
    }

    fn state(&self) -> AcquisitionState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Register file that stays busy for `busy_reads` reads after a ping.
    struct FakeDevice {
        registers: [u8; 4],
        busy_reads: u8,
        remaining: u8,
        writes: Vec<(u8, u8)>,
        fail_writes: bool,
    }

    impl FakeDevice {
        fn new(range: u16, busy_reads: u8) -> Self {
            let [high, low] = range.to_be_bytes();
            Self {
                registers: [0, 7, high, low],
                busy_reads,
                remaining: 0,
                writes: Vec::new(),
                fail_writes: false,
            }
        }
    }

    impl RegisterBus for FakeDevice {
        fn write_u8(&mut self, register: u8, value: u8) -> Result<(), RoverError> {
            if self.fail_writes {
                return Err(RoverError::hardware("fake", "nack"));
            }
            self.writes.push((register, value));
            self.remaining = self.busy_reads;
            Ok(())
        }

        fn read_u8(&mut self, register: u8) -> Result<u8, RoverError> {
            if self.remaining > 0 {
                self.remaining -= 1;
                return Err(RoverError::hardware("fake", "busy"));
            }
            Ok(self.registers[register as usize])
        }
    }

    #[test]
    fn begin_writes_range_command() {
        let mut sensor = Srf08::new(0x70, FakeDevice::new(120, 0));
        sensor.begin();
        assert_eq!(sensor.bus.writes, vec![(COMMAND_REGISTER, RANGE_IN_CM)]);
        assert_eq!(sensor.state(), AcquisitionState::Ranging);
        assert_eq!(sensor.id(), "srf08@0x70");
    }

    #[test]
    fn not_ready_while_device_is_busy() {
        let mut sensor = Srf08::new(0x70, FakeDevice::new(300, 2));
        sensor.begin();
        assert!(!sensor.is_ready());
        assert!(!sensor.is_ready());
        assert!(sensor.is_ready());
        assert_eq!(sensor.read(), 300);
        assert_eq!(sensor.state(), AcquisitionState::Idle);
    }

    #[test]
    fn failed_begin_leaves_sensor_idle() {
        let mut device = FakeDevice::new(50, 0);
        device.fail_writes = true;
        let mut sensor = Srf08::new(0x71, device);
        sensor.begin();
        assert_eq!(sensor.state(), AcquisitionState::Idle);
        assert!(!sensor.is_ready());
    }

    #[test]
    fn never_started_sensor_is_not_ready() {
        let mut sensor = Srf08::new(0x70, FakeDevice::new(77, 0));
        assert!(!sensor.is_ready());
        sensor.begin();
        assert!(sensor.is_ready());
        assert_eq!(sensor.read(), 77);
        assert!(!sensor.is_ready());
    }

    #[test]
    fn light_level_reads_register_one() {
        let mut sensor = Srf08::new(0x70, FakeDevice::new(10, 0));
        assert_eq!(sensor.light_level(), 7);
    }

    #[test]
    fn read_before_any_completion_is_zero() {
        let mut sensor = Srf08::new(0x70, FakeDevice::new(99, 0));
        sensor.bus.remaining = 5;
        assert_eq!(sensor.read(), 0);
    }
}
