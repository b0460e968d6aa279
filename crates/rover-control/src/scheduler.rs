//! [`SensorScheduler`] – polls every ranging sensor once per cycle.
//!
//! # Independent sensors
//!
//! Sensors with a private bus address are all kept ranging continuously:
//! whenever one reports ready its sample is recorded and it is immediately
//! re-armed.  One whose start failed is started again on the next poll.
//!
//! # Exclusive group
//!
//! Sensors sharing one converter are held in an arena together with a
//! single cursor naming the sensor that currently owns the converter.  Only
//! that sensor is ever in flight.  When it reports ready its sample is
//! recorded, the cursor advances (wrapping around) and the next sensor is
//! started.  A cursor sensor that is neither ready nor ranging (its start
//! failed) is simply started again.

use rover_hal::RangingSensor;
use rover_hal::registry::SensorRegistry;
use rover_types::{AcquisitionState, Angle};
use tracing::trace;

use crate::history::HistoryStore;

/// Round-robin poller over the registered ranging sensors.
pub struct SensorScheduler {
    independent: Vec<(Angle, Box<dyn RangingSensor>)>,
    exclusive: Vec<(Angle, Box<dyn RangingSensor>)>,
    /// Index into `exclusive` of the sensor owning the converter.
    cursor: Option<usize>,
    armed: bool,
}

impl SensorScheduler {
    pub fn new(registry: SensorRegistry) -> Self {
        let groups = registry.into_groups();
        Self {
            independent: groups.independent,
            exclusive: groups.exclusive,
            cursor: None,
            armed: false,
        }
    }

    /// Poll every sensor once, recording completed samples into `history`.
    ///
    /// The first call also starts every independent sensor.  Returns the
    /// number of samples recorded.
    pub fn poll(&mut self, history: &mut HistoryStore) -> usize {
        if !self.armed {
            for (_, sensor) in &mut self.independent {
                sensor.begin();
            }
            self.armed = true;
        }

        let mut recorded = 0;
        for (angle, sensor) in &mut self.independent {
            if sensor.is_ready() {
                let cm = sensor.read();
                trace!(%angle, sensor = %sensor.id(), cm, "sample");
                history.push(*angle, cm);
                sensor.begin();
                recorded += 1;
            } else if sensor.state() == AcquisitionState::Idle {
                trace!(sensor = %sensor.id(), "not in flight, restarting");
                sensor.begin();
            }
        }

        if self.poll_exclusive(history) {
            recorded += 1;
        }
        recorded
    }

    fn poll_exclusive(&mut self, history: &mut HistoryStore) -> bool {
        if self.exclusive.is_empty() {
            return false;
        }
        let Some(index) = self.cursor else {
            self.cursor = Some(0);
            self.exclusive[0].1.begin();
            return false;
        };

        let (angle, sensor) = &mut self.exclusive[index];
        if !sensor.is_ready() {
            if sensor.state() == AcquisitionState::Idle {
                trace!(sensor = %sensor.id(), "not in flight, restarting");
                sensor.begin();
            }
            return false;
        }

        let cm = sensor.read();
        trace!(%angle, sensor = %sensor.id(), cm, "sample");
        history.push(*angle, cm);

        let next = (index + 1) % self.exclusive.len();
        self.cursor = Some(next);
        self.exclusive[next].1.begin();
        true
    }

    /// Angle of the exclusive sensor currently owning the converter.
    pub fn active_exclusive(&self) -> Option<Angle> {
        self.cursor.map(|i| self.exclusive[i].0)
    }

    /// Number of exclusive sensors currently ranging.
    pub fn exclusive_in_flight(&self) -> usize {
        self.exclusive
            .iter()
            .filter(|(_, s)| s.state() == AcquisitionState::Ranging)
            .count()
    }

    pub fn sensor_count(&self) -> usize {
        self.independent.len() + self.exclusive.len()
    }
}
