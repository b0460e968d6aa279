//! Generic `MotionSensor` trait for relative-motion sensors (optical
//! flow, a mouse sensor pointed at the floor, …).

use rover_types::MotionDelta;

/// A sensor reporting how far the vehicle moved since the previous poll.
///
/// Values are unitless and only their sign and rough magnitude matter.  A
/// poll that finds no new data returns [`MotionDelta::ZERO`].
pub trait MotionSensor: Send + Sync {
    fn id(&self) -> &str;

    /// Consume the motion accumulated since the previous call.
    fn poll(&mut self) -> MotionDelta;
}
