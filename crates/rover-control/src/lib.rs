//! `rover-control` – Reactive navigation loop
//!
//! A single-threaded, cooperative control loop for a small wheeled vehicle:
//! distance sensors are polled without blocking, their samples feed a pure
//! decision function, and the motor and steering servo are only commanded
//! when the decision changes.
//!
//! # Modules
//!
//! - [`history`] – [`HistoryStore`][history::HistoryStore]: bounded
//!   per-angle sample buffers.
//! - [`scheduler`] – [`SensorScheduler`][scheduler::SensorScheduler]:
//!   continuous re-arming of independent sensors and strict round-robin
//!   over the sensors sharing one converter.
//! - [`decision`] – [`DecisionEngine`][decision::DecisionEngine]: front
//!   response and side-balance steering.
//! - [`stall`] – [`StallMonitor`][stall::StallMonitor] and
//!   [`SpeedRamp`][stall::SpeedRamp]: creeping power increase when the
//!   vehicle does not move.
//! - [`actuation`] – [`ActuationSequencer`][actuation::ActuationSequencer]:
//!   change-only motor and servo commands.
//! - [`control_loop`] – [`ControlLoop`][control_loop::ControlLoop]: the
//!   cycle that wires the above together.
//! - [`context`] – [`RunContext`][context::RunContext]: stop signal, start
//!   button and status LED.
//! - [`clock`] – the monotonic [`Clock`][clock::Clock] seam.
//! - [`params`] – tunable thresholds and timings.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing].

pub mod actuation;
pub mod clock;
pub mod context;
pub mod control_loop;
pub mod decision;
pub mod history;
pub mod params;
pub mod scheduler;
pub mod stall;
pub mod telemetry;

pub use actuation::{Actuation, ActuationSequencer};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use context::RunContext;
pub use control_loop::{ControlLoop, CycleOutput, RunSummary, Vehicle};
pub use decision::{Decision, DecisionEngine};
pub use history::{HistoryBuffer, HistoryStore};
pub use params::{LoopParams, NavigationParams};
pub use scheduler::SensorScheduler;
pub use stall::{SpeedRamp, StallMonitor};
