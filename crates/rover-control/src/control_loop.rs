//! [`ControlLoop`] – the cooperative sense / decide / act cycle.
//!
//! One call to [`ControlLoop::step`] runs a full cycle on the calling
//! thread without blocking:
//!
//! 1. **Sense** – [`SensorScheduler::poll`] records every completed range
//!    sample into the [`HistoryStore`].
//! 2. **Decide** – the [`DecisionEngine`] evaluates the history.
//! 3. **Stall** – the [`StallMonitor`] updates its countdown and the
//!    [`SpeedRamp`] may nudge the active setpoint.
//! 4. **Act** – the [`ActuationSequencer`] sends whatever changed.
//!
//! [`ControlLoop::run`] repeats `step` with a fixed sleep between cycles,
//! checking the [`RunContext`] stop signal once at the top of each cycle.
//! Time is read once per cycle from the [`Clock`].

use std::thread;

use rover_hal::{MotionSensor, Motor, SensorRegistry, Steering};
use tracing::{debug, info};

use crate::actuation::{Actuation, ActuationSequencer};
use crate::clock::{Clock, MonotonicClock};
use crate::context::RunContext;
use crate::decision::{Decision, DecisionEngine};
use crate::history::HistoryStore;
use crate::params::{LoopParams, NavigationParams};
use crate::scheduler::SensorScheduler;
use crate::stall::{SpeedRamp, StallMonitor};

// ─────────────────────────────────────────────────────────────────────────────
// Inputs and outputs
// ─────────────────────────────────────────────────────────────────────────────

/// Devices handed to the loop by the bring-up code.
pub struct Vehicle {
    pub sensors: SensorRegistry,
    pub motion: Option<Box<dyn MotionSensor>>,
    pub motor: Box<dyn Motor>,
    pub steering: Box<dyn Steering>,
}

/// Everything one cycle decided and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutput {
    pub decision: Decision,
    /// Signed setpoint for the active direction.
    pub speed_setpoint: i32,
    pub stall_counter: u8,
    /// Range samples recorded this cycle.
    pub samples: usize,
    pub actuation: Actuation,
}

/// Totals reported when a run ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub samples: u64,
    pub motor_commands: u64,
    pub steering_commands: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// ControlLoop
// ─────────────────────────────────────────────────────────────────────────────

pub struct ControlLoop<C: Clock = MonotonicClock> {
    params: LoopParams,
    scheduler: SensorScheduler,
    history: HistoryStore,
    engine: DecisionEngine,
    stall: StallMonitor,
    ramp: SpeedRamp,
    actuation: ActuationSequencer,
    clock: C,
    last_decision: Option<Decision>,
    cycles: u64,
    samples: u64,
}

impl<C: Clock> ControlLoop<C> {
    pub fn new(vehicle: Vehicle, navigation: NavigationParams, params: LoopParams, clock: C) -> Self {
        Self {
            scheduler: SensorScheduler::new(vehicle.sensors),
            history: HistoryStore::new(params.history_capacity),
            engine: DecisionEngine::new(navigation),
            stall: StallMonitor::from_params(vehicle.motion, &params),
            ramp: SpeedRamp::from_params(&params),
            actuation: ActuationSequencer::new(vehicle.motor, vehicle.steering),
            clock,
            last_decision: None,
            cycles: 0,
            samples: 0,
            params,
        }
    }

    /// Run one cycle.
    pub fn step(&mut self) -> CycleOutput {
        let now = self.clock.now();

        let samples = self.scheduler.poll(&mut self.history);
        let decision = self.engine.evaluate(&self.history);
        if self.last_decision != Some(decision) {
            debug!(
                forward = decision.forward,
                multiplier = decision.turn_multiplier,
                angle = decision.steering_angle,
                "decision changed"
            );
        }

        let forward = decision.forward;
        let stall_counter = self.stall.observe(forward);
        let ramped = self.ramp.update(
            forward,
            self.stall.is_stalled(),
            !self.actuation.direction_changed(forward),
            self.actuation.since_last_speed_change(now),
        );
        let speed_setpoint = self.ramp.setpoint(forward);
        let actuation = self
            .actuation
            .apply(forward, speed_setpoint, ramped, decision.steering_angle, now);

        self.last_decision = Some(decision);
        self.cycles += 1;
        self.samples += samples as u64;

        CycleOutput {
            decision,
            speed_setpoint,
            stall_counter,
            samples,
            actuation,
        }
    }

    /// Step until a stop is requested or `max_cycles` cycles have run.
    ///
    /// Actuators are left as they are; call [`ControlLoop::shutdown`]
    /// afterwards.
    pub fn run(&mut self, ctx: &mut RunContext, max_cycles: Option<u64>) -> RunSummary {
        info!(
            sensors = self.scheduler.sensor_count(),
            motion_sensor = self.stall.has_sensor(),
            cycle_ms = self.params.cycle_period_ms,
            "control loop started"
        );
        ctx.set_running(true);

        let period = self.params.cycle_period();
        let mut executed = 0u64;
        loop {
            if ctx.stop_requested() {
                info!("stop requested");
                break;
            }
            if max_cycles.is_some_and(|max| executed >= max) {
                info!(cycles = executed, "cycle limit reached");
                break;
            }
            self.step();
            executed += 1;
            if !period.is_zero() {
                thread::sleep(period);
            }
        }

        let summary = self.summary();
        info!(
            cycles = summary.cycles,
            samples = summary.samples,
            motor_commands = summary.motor_commands,
            steering_commands = summary.steering_commands,
            "control loop stopped"
        );
        summary
    }

    /// Brake, centre the steering and switch the status LED off.
    pub fn shutdown(&mut self, ctx: &mut RunContext) {
        ctx.teardown(&mut self.actuation);
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            cycles: self.cycles,
            samples: self.samples,
            motor_commands: self.actuation.motor_commands(),
            steering_commands: self.actuation.steering_commands(),
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn actuation(&self) -> &ActuationSequencer {
        &self.actuation
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use rover_hal::sim::{RecordingChannel, SimMotionSensor, SimRangingSensor, SimRegistry};
    use rover_hal::{EscMotor, MotorConfig, ServoSteering, StopFlag};
    use rover_types::{Angle, MotionDelta};

    struct Rig {
        control: ControlLoop<ManualClock>,
        clock: ManualClock,
        esc: RecordingChannel,
        servo: RecordingChannel,
    }

    fn rig(sensors: SensorRegistry, motion: Option<SimMotionSensor>, params: LoopParams) -> Rig {
        let esc = RecordingChannel::new("esc");
        let servo = RecordingChannel::new("servo");
        let motor_config = MotorConfig {
            pulse_hold: Duration::ZERO,
            ..MotorConfig::default()
        };
        let vehicle = Vehicle {
            sensors,
            motion: motion.map(|m| Box::new(m) as Box<dyn MotionSensor>),
            motor: Box::new(EscMotor::new(esc.clone(), motor_config).unwrap()),
            steering: Box::new(ServoSteering::new(servo.clone(), 100).unwrap()),
        };
        esc.clear();
        servo.clear();
        let clock = ManualClock::new();
        let control = ControlLoop::new(vehicle, NavigationParams::default(), params, clock.clone());
        Rig {
            control,
            clock,
            esc,
            servo,
        }
    }

    fn fast_params() -> LoopParams {
        LoopParams {
            cycle_period_ms: 0,
            ..LoopParams::default()
        }
    }

    fn angle(deg: u16) -> Angle {
        Angle::new(deg).unwrap()
    }

    #[test]
    fn ramp_steps_once_per_interval_while_stalled() {
        let params = LoopParams {
            motion_poll_period: 1,
            stall_window: 1,
            ..fast_params()
        };
        let wheel = SimMotionSensor::new(MotionDelta::ZERO);
        let mut r = rig(SensorRegistry::new(), Some(wheel), params);

        let first = r.control.step();
        assert!(first.actuation.motor_sent);
        assert_eq!(first.stall_counter, 0);

        r.clock.advance(Duration::from_millis(100));
        assert!(!r.control.step().actuation.motor_sent);

        r.clock.set(Duration::from_millis(500));
        let ramped = r.control.step();
        assert!(ramped.actuation.motor_sent);
        assert_eq!(ramped.speed_setpoint, 102);

        for ms in [600, 800, 999] {
            r.clock.set(Duration::from_millis(ms));
            assert_eq!(r.control.step().speed_setpoint, 102);
        }

        r.clock.set(Duration::from_millis(1000));
        assert_eq!(r.control.step().speed_setpoint, 104);
        assert_eq!(r.esc.outputs(), vec![100, 102, 104]);
    }

    #[test]
    fn moving_vehicle_never_ramps() {
        let params = LoopParams {
            motion_poll_period: 1,
            ..fast_params()
        };
        let wheel = SimMotionSensor::new(MotionDelta::new(0, -120));
        let mut r = rig(SensorRegistry::new(), Some(wheel), params);
        for _ in 0..20 {
            r.control.step();
            r.clock.advance(Duration::from_secs(1));
        }
        assert_eq!(r.esc.outputs(), vec![100]);
    }

    #[test]
    fn no_motion_sensor_never_ramps() {
        let mut r = rig(SensorRegistry::new(), None, fast_params());
        for _ in 0..20 {
            let out = r.control.step();
            assert_eq!(out.stall_counter, 10);
            r.clock.advance(Duration::from_secs(1));
        }
        assert_eq!(r.esc.outputs(), vec![100]);
    }

    #[test]
    fn close_front_obstacle_reverses_through_brake_sequence() {
        let front = SimRangingSensor::independent("front", 100);
        let probe = front.clone();
        let sensors = SimRegistry::new()
            .with_sensor(Angle::FRONT, Box::new(front))
            .build()
            .unwrap();
        let mut r = rig(sensors, None, fast_params());

        assert!(r.control.step().decision.forward);
        probe.set_distance(20);
        let out = r.control.step();
        assert!(!out.decision.forward);
        assert_eq!(out.speed_setpoint, -100);
        assert_eq!(r.esc.outputs(), vec![100, -1000, 0, -100]);
    }

    #[test]
    fn steering_is_only_sent_on_change() {
        let right_short = SimRangingSensor::independent("right", 40);
        let probe = right_short.clone();
        let sensors = SimRegistry::new()
            .with_sensor(angle(135), Box::new(SimRangingSensor::independent("left", 150)))
            .with_sensor(angle(45), Box::new(right_short))
            .with_sensor(angle(270), Box::new(SimRangingSensor::independent("left-long", 200)))
            .with_sensor(angle(90), Box::new(SimRangingSensor::independent("right-long", 200)))
            .build()
            .unwrap();
        let mut r = rig(sensors, None, fast_params());

        for _ in 0..3 {
            assert_eq!(r.control.step().decision.steering_angle, -60);
        }
        assert_eq!(r.servo.outputs(), vec![-60]);

        probe.set_distance(150);
        r.control.step();
        r.control.step();
        assert_eq!(r.servo.outputs(), vec![-60, 0]);
        assert_eq!(r.control.summary().steering_commands, 2);
    }

    #[test]
    fn run_honours_cycle_limit_and_stop_flag() {
        let mut r = rig(SensorRegistry::new(), None, fast_params());
        let flag = StopFlag::new();
        let mut ctx = RunContext::new(Box::new(flag.clone()));

        let summary = r.control.run(&mut ctx, Some(5));
        assert_eq!(summary.cycles, 5);
        assert_eq!(summary.motor_commands, 1);

        flag.request();
        let summary = r.control.run(&mut ctx, Some(5));
        assert_eq!(summary.cycles, 5);
    }

    #[test]
    fn shutdown_leaves_actuators_neutral() {
        let mut r = rig(SensorRegistry::new(), None, fast_params());
        let mut ctx = RunContext::new(Box::new(StopFlag::new()));
        r.control.run(&mut ctx, Some(2));
        r.control.shutdown(&mut ctx);
        assert_eq!(r.esc.outputs(), vec![100, -1000, 0]);
        assert_eq!(r.servo.last(), Some(0));
        assert_eq!(r.control.actuation().motor().speed(), 0);
    }
}
