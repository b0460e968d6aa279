//! [`SensorRegistry`] – the angle registry.
//!
//! Bring-up code registers every ranging sensor under its mounting angle.
//! The registry splits them by [`SensorAccess`] so the scheduler can poll
//! independent sensors in parallel and walk the exclusive group one sensor
//! at a time.  Both groups iterate in ascending angle order.

use std::collections::BTreeMap;

use rover_types::{Angle, RoverError, SensorAccess};
use tracing::debug;

use crate::ranging::RangingSensor;

/// Ranging sensors keyed by mounting angle.
#[derive(Default)]
pub struct SensorRegistry {
    independent: BTreeMap<Angle, Box<dyn RangingSensor>>,
    exclusive: BTreeMap<Angle, Box<dyn RangingSensor>>,
}

/// A registry split into its two access groups, in ascending angle order.
pub struct SensorGroups {
    pub independent: Vec<(Angle, Box<dyn RangingSensor>)>,
    pub exclusive: Vec<(Angle, Box<dyn RangingSensor>)>,
}

impl SensorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `sensor` at `angle`.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::DuplicateSensor`] when any sensor is already
    /// mounted at `angle`; the registry is left unchanged.
    pub fn register(
        &mut self,
        angle: Angle,
        sensor: Box<dyn RangingSensor>,
    ) -> Result<(), RoverError> {
        if self.contains(angle) {
            return Err(RoverError::DuplicateSensor(angle));
        }
        debug!(%angle, sensor = %sensor.id(), access = ?sensor.access(), "registered ranging sensor");
        match sensor.access() {
            SensorAccess::Independent => self.independent.insert(angle, sensor),
            SensorAccess::Exclusive => self.exclusive.insert(angle, sensor),
        };
        Ok(())
    }

    pub fn contains(&self, angle: Angle) -> bool {
        self.independent.contains_key(&angle) || self.exclusive.contains_key(&angle)
    }

    /// Every registered angle, ascending.
    pub fn angles(&self) -> Vec<Angle> {
        let mut angles: Vec<Angle> = self
            .independent
            .keys()
            .chain(self.exclusive.keys())
            .copied()
            .collect();
        angles.sort();
        angles
    }

    pub fn len(&self) -> usize {
        self.independent.len() + self.exclusive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_groups(self) -> SensorGroups {
        SensorGroups {
            independent: self.independent.into_iter().collect(),
            exclusive: self.exclusive.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimRangingSensor;

    fn angle(deg: u16) -> Angle {
        Angle::new(deg).unwrap()
    }

    #[test]
    fn sensors_are_grouped_by_access() {
        let mut registry = SensorRegistry::new();
        registry
            .register(angle(90), Box::new(SimRangingSensor::independent("us90", 100)))
            .unwrap();
        registry
            .register(angle(45), Box::new(SimRangingSensor::exclusive("ir45", 100)))
            .unwrap();
        registry
            .register(angle(0), Box::new(SimRangingSensor::independent("us0", 100)))
            .unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.angles(), vec![angle(0), angle(45), angle(90)]);

        let groups = registry.into_groups();
        let independent: Vec<Angle> = groups.independent.iter().map(|(a, _)| *a).collect();
        assert_eq!(independent, vec![angle(0), angle(90)]);
        assert_eq!(groups.exclusive.len(), 1);
        assert_eq!(groups.exclusive[0].1.id(), "ir45");
    }

    #[test]
    fn duplicate_angle_is_rejected_across_groups() {
        let mut registry = SensorRegistry::new();
        registry
            .register(angle(135), Box::new(SimRangingSensor::exclusive("ir", 80)))
            .unwrap();
        let result = registry.register(angle(135), Box::new(SimRangingSensor::independent("us", 80)));
        assert_eq!(result, Err(RoverError::DuplicateSensor(angle(135))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn empty_registry() {
        let registry = SensorRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.angles().is_empty());
    }
}
