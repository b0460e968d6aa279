//! [`RunContext`] – process-level I/O owned by the entry point: the stop
//! signal, an optional start button and an optional status LED.

use std::thread;
use std::time::Duration;

use rover_hal::{InputLine, OutputLine, StopSignal};
use tracing::{info, warn};

use crate::actuation::ActuationSequencer;

const DEFAULT_BUTTON_POLL: Duration = Duration::from_millis(20);

pub struct RunContext {
    stop: Box<dyn StopSignal>,
    /// Active-low: pressed reads low.
    start_button: Option<Box<dyn InputLine>>,
    status_led: Option<Box<dyn OutputLine>>,
    button_poll: Duration,
}

impl RunContext {
    pub fn new(stop: Box<dyn StopSignal>) -> Self {
        Self {
            stop,
            start_button: None,
            status_led: None,
            button_poll: DEFAULT_BUTTON_POLL,
        }
    }

    pub fn with_start_button(mut self, button: Box<dyn InputLine>) -> Self {
        self.start_button = Some(button);
        self
    }

    pub fn with_status_led(mut self, led: Box<dyn OutputLine>) -> Self {
        self.status_led = Some(led);
        self
    }

    pub fn with_button_poll(mut self, interval: Duration) -> Self {
        self.button_poll = interval;
        self
    }

    /// Switch the status LED off.
    pub fn init(&mut self) {
        self.set_running(false);
    }

    /// Block until the start button is pressed.
    ///
    /// Returns `false` if a stop was requested first.  Without a button the
    /// run starts immediately.
    pub fn wait_for_start(&mut self) -> bool {
        let Some(button) = self.start_button.as_mut() else {
            return !self.stop.stop_requested();
        };
        info!("waiting for start button");
        loop {
            if self.stop.stop_requested() {
                return false;
            }
            match button.is_high() {
                Ok(false) => return true,
                Ok(true) => {}
                Err(e) => warn!(error = %e, "start button read failed"),
            }
            if !self.button_poll.is_zero() {
                thread::sleep(self.button_poll);
            }
        }
    }

    pub fn stop_requested(&mut self) -> bool {
        self.stop.stop_requested()
    }

    pub fn set_running(&mut self, running: bool) {
        if let Some(led) = self.status_led.as_mut()
            && let Err(e) = led.set_high(running)
        {
            warn!(error = %e, "status LED write failed");
        }
    }

    /// Final stop: brake, centre the steering, LED off.
    pub fn teardown(&mut self, actuation: &mut ActuationSequencer) {
        actuation.shutdown();
        self.set_running(false);
        info!("actuators stopped");
    }
}
