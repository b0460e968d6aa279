//! Per-angle history of recent range samples.
//!
//! A [`HistoryBuffer`] keeps the last *N* samples of one sensor, evicting
//! the oldest on overflow.  [`HistoryStore`] owns one buffer per mounting
//! angle and creates it on the first sample for that angle, so "no buffer"
//! and "empty buffer" both read as "no signal" and never as `0 cm`.
//!
//! # Example
//!
//! ```rust
//! use rover_control::history::HistoryStore;
//! use rover_types::Angle;
//!
//! let mut store = HistoryStore::new(3);
//! assert_eq!(store.latest(Angle::FRONT), None);
//!
//! for cm in [90, 80, 70, 60] {
//!     store.push(Angle::FRONT, cm);
//! }
//! assert_eq!(store.latest(Angle::FRONT), Some(60));
//! assert_eq!(store.buffer(Angle::FRONT).unwrap().len(), 3);
//! ```

use std::collections::{BTreeMap, VecDeque};

use rover_types::{Angle, Centimeters};

/// Fixed-capacity FIFO of range samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryBuffer {
    capacity: usize,
    samples: VecDeque<Centimeters>,
}

impl HistoryBuffer {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Append `sample`, evicting the oldest one when full.
    pub fn push(&mut self, sample: Centimeters) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<Centimeters> {
        self.samples.back().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = Centimeters> + '_ {
        self.samples.iter().copied()
    }
}

/// One [`HistoryBuffer`] per mounting angle, created lazily.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    capacity: usize,
    buffers: BTreeMap<Angle, HistoryBuffer>,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffers: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, angle: Angle, sample: Centimeters) {
        let capacity = self.capacity;
        self.buffers
            .entry(angle)
            .or_insert_with(|| HistoryBuffer::new(capacity))
            .push(sample);
    }

    /// Most recent sample at `angle`, `None` when nothing was recorded.
    pub fn latest(&self, angle: Angle) -> Option<Centimeters> {
        self.buffers.get(&angle).and_then(HistoryBuffer::latest)
    }

    pub fn buffer(&self, angle: Angle) -> Option<&HistoryBuffer> {
        self.buffers.get(&angle)
    }

    /// Angles with at least one sample, ascending.
    pub fn angles(&self) -> impl Iterator<Item = Angle> + '_ {
        self.buffers.keys().copied()
    }
}
