//! [`DecisionEngine`] – reactive steering and direction choice.
//!
//! The engine is a pure function of the latest samples in the
//! [`HistoryStore`]: evaluating the same store twice gives the same
//! [`Decision`].
//!
//! # Front response
//!
//! The latest front sample scales every turn: below `caution_cm` turns are
//! doubled, below `danger_cm` quadrupled, and below `reverse_cm` the vehicle
//! backs off with the turn inverted.  No front sample means open road.
//!
//! # Side balance
//!
//! A turn is only considered when all four side buffers hold a sample.  The
//! effective distance on each side is the short-range reading, unless the
//! long-range sensor on that side sees something closer than its override
//! threshold.  The vehicle steers away from the nearer side when the two
//! sides differ by more than `side_imbalance_cm` and that side is actually
//! close, or whenever the front response is active.

use rover_types::Centimeters;
use tracing::trace;

use crate::history::HistoryStore;
use crate::params::NavigationParams;

/// Output of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// `false` when the vehicle should back off.
    pub forward: bool,
    /// Factor applied to the base steering angle.
    pub turn_multiplier: i32,
    /// Signed steering angle in percent of full lock.
    pub steering_angle: i32,
}

impl Default for Decision {
    /// Straight ahead, no turn.
    fn default() -> Self {
        Self {
            forward: true,
            turn_multiplier: 1,
            steering_angle: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Sides {
    left: Centimeters,
    right: Centimeters,
}

/// Maps recent range history to a [`Decision`].
#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    params: NavigationParams,
}

impl DecisionEngine {
    pub fn new(params: NavigationParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &NavigationParams {
        &self.params
    }

    pub fn evaluate(&self, history: &HistoryStore) -> Decision {
        let (forward, turn_multiplier) = self.front_response(history.latest(self.params.front_angle));
        let base = self
            .sides(history)
            .map_or(0, |sides| self.base_steering(sides, turn_multiplier != 1));
        let decision = Decision {
            forward,
            turn_multiplier,
            steering_angle: base * turn_multiplier,
        };
        trace!(?decision, "evaluated");
        decision
    }

    /// `(forward, turn multiplier)` for the latest front sample.
    fn front_response(&self, front: Option<Centimeters>) -> (bool, i32) {
        let p = &self.params;
        match front {
            Some(cm) if cm < p.reverse_cm => (false, p.reverse_multiplier),
            Some(cm) if cm < p.danger_cm => (true, p.danger_multiplier),
            Some(cm) if cm < p.caution_cm => (true, p.caution_multiplier),
            _ => (true, 1),
        }
    }

    /// Effective side distances, `None` unless every side buffer has data.
    fn sides(&self, history: &HistoryStore) -> Option<Sides> {
        let p = &self.params;
        let right_short = history.latest(p.right_short_angle)?;
        let left_short = history.latest(p.left_short_angle)?;
        let right_long = history.latest(p.right_long_angle)?;
        let left_long = history.latest(p.left_long_angle)?;

        let right = if right_long < p.right_long_override_cm {
            right_long
        } else {
            right_short
        };
        let left = if left_long < p.left_long_override_cm {
            left_long
        } else {
            left_short
        };
        Some(Sides { left, right })
    }

    /// Steering angle before the front multiplier.  Negative steers left,
    /// away from an obstruction on the right.
    fn base_steering(&self, sides: Sides, front_active: bool) -> i32 {
        let p = &self.params;
        let Sides { left, right } = sides;
        if left.abs_diff(right) <= p.side_imbalance_cm && !front_active {
            return 0;
        }
        if u32::from(left) > u32::from(right) + u32::from(p.side_imbalance_cm) {
            if right < p.right_near_cm || front_active {
                return -p.steer_angle;
            }
        } else if left < p.left_near_cm || front_active {
            return p.steer_angle;
        }
        0
    }
}
