//! Generic `RangingSensor` trait for distance sensors.
//!
//! Every operation is a non-blocking poll.  A measurement is requested with
//! [`RangingSensor::begin`], its completion is discovered by calling
//! [`RangingSensor::is_ready`] on later loop iterations, and the result is
//! fetched with [`RangingSensor::read`].  No transducer failure is fatal: a
//! sensor that cannot range simply never reports ready, and the caller
//! retries naturally on the next cycle.

use rover_types::{AcquisitionState, Centimeters, SensorAccess};

/// A non-blocking distance sensor.
///
/// Drivers register with a [`SensorRegistry`][crate::registry::SensorRegistry]
/// under their mounting angle; the scheduler only ever talks to this trait.
pub trait RangingSensor: Send + Sync {
    /// Stable identifier used in logs, e.g. `"srf08@0x70"`.
    fn id(&self) -> &str;

    /// Whether this sensor owns its transducer or shares it with others.
    fn access(&self) -> SensorAccess;

    /// Request a new measurement.
    ///
    /// Re-issuing while a measurement is in flight restarts acquisition.
    /// Sensors on a shared converter also claim the converter's input
    /// channel here.
    fn begin(&mut self);

    /// Return `true` once the measurement requested by the last
    /// [`begin`][Self::begin] has completed and may be read.
    ///
    /// Sensors on a shared converter report `false` when the converter has
    /// been reassigned to another channel since `begin`.
    fn is_ready(&mut self) -> bool;

    /// Return the most recent converted distance.
    ///
    /// Only meaningful after [`is_ready`][Self::is_ready] returned `true`;
    /// otherwise the value is stale or zero.  Never panics.
    fn read(&mut self) -> Centimeters;

    /// Current acquisition state.
    fn state(&self) -> AcquisitionState;
}
