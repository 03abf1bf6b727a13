//! Event trigger wiring
//!
//! Each event owns one static control block. The device arms and disarms
//! them through [`Triggers`], and the runner tasks in `tasks::events`
//! fire the event whenever the trigger elapses.

use harp_core::{EventId, Trigger, TriggerBinder};
use harp_hal::{EdgeInterrupt, PeriodicTimer};
use harp_hal_rp2040::{EdgeControl, EdgeHandle, TimerControl, TimerHandle};

use crate::device::{HEARTBEAT, INPUT_EDGE, STATUS};

/// Heartbeat timer, runs on the interrupt executor
pub static HEARTBEAT_TIMER: TimerControl = TimerControl::new();

/// Edge watcher for the configured input pin
pub static INPUT_WATCH: EdgeControl = EdgeControl::new();

/// Recurring status event timer
pub static STATUS_TIMER: TimerControl = TimerControl::new();

/// `TriggerBinder` over the static control blocks
pub struct Triggers {
    heartbeat: TimerHandle,
    input: EdgeHandle,
    status: TimerHandle,
}

impl Default for Triggers {
    fn default() -> Self {
        Self::new()
    }
}

impl Triggers {
    pub fn new() -> Self {
        Self {
            heartbeat: HEARTBEAT_TIMER.handle(),
            input: INPUT_WATCH.handle(),
            status: STATUS_TIMER.handle(),
        }
    }
}

impl TriggerBinder for Triggers {
    fn arm(&mut self, id: EventId, trigger: Trigger) {
        match (id, trigger) {
            (HEARTBEAT, Trigger::Timer { period_ms }) => self.heartbeat.arm(period_ms),
            (STATUS, Trigger::Recurring { period_ms }) => self.status.arm(period_ms),
            (INPUT_EDGE, Trigger::Edge(edge)) => self.input.listen(edge),
            _ => defmt::warn!("no trigger wired for event {}", id),
        }
    }

    fn disarm(&mut self, id: EventId, _trigger: Trigger) {
        match id {
            HEARTBEAT => self.heartbeat.disarm(),
            STATUS => self.status.disarm(),
            INPUT_EDGE => self.input.unlisten(),
            _ => {}
        }
    }
}
