//! Digital I/O lines and the [`StopSignal`] contract.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rover_types::RoverError;

/// A digital input (push button, limit switch, …).
pub trait InputLine: Send + Sync {
    fn is_high(&mut self) -> Result<bool, RoverError>;
}

/// A digital output (status LED, …).
pub trait OutputLine: Send + Sync {
    fn set_high(&mut self, high: bool) -> Result<(), RoverError>;
}

/// An externally settable condition the control loop checks once per cycle.
pub trait StopSignal: Send {
    fn stop_requested(&mut self) -> bool;
}

/// Stop flag shared between a signal handler and the control loop.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop at its next check.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl StopSignal for StopFlag {
    fn stop_requested(&mut self) -> bool {
        self.is_set()
    }
}

/// Stop requested while an active-low input (a button with pull-up) is held.
/// Read failures do not stop the loop.
pub struct LineStop<L: InputLine> {
    line: L,
}

impl<L: InputLine> LineStop<L> {
    pub fn new(line: L) -> Self {
        Self { line }
    }
}

impl<L: InputLine> StopSignal for LineStop<L> {
    fn stop_requested(&mut self) -> bool {
        matches!(self.line.is_high(), Ok(false))
    }
}

/// Either signal stops the loop.
impl<A: StopSignal, B: StopSignal> StopSignal for (A, B) {
    fn stop_requested(&mut self) -> bool {
        self.0.stop_requested() || self.1.stop_requested()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimInputLine;

    #[test]
    fn stop_flag_is_shared_between_clones() {
        let flag = StopFlag::new();
        let mut loop_side = flag.clone();
        assert!(!loop_side.stop_requested());
        flag.request();
        assert!(loop_side.stop_requested());
    }

    #[test]
    fn line_stop_triggers_on_low_level() {
        let line = SimInputLine::new(true);
        let level = line.clone();
        let mut stop = LineStop::new(line);
        assert!(!stop.stop_requested());
        level.set_level(false);
        assert!(stop.stop_requested());
    }

    #[test]
    fn combined_stop_fires_on_either() {
        let flag = StopFlag::new();
        let mut stop = (flag.clone(), LineStop::new(SimInputLine::new(true)));
        assert!(!stop.stop_requested());
        flag.request();
        assert!(stop.stop_requested());
    }
}
