//! Event trigger runners
//!
//! One task per trigger. Each waits on its control block in
//! `crate::triggers` and fires the matching event while armed.

use defmt::*;
use embassy_rp::gpio::Input;
use harp_core::RegisterValue;

use crate::device::{HarpDevice, HEARTBEAT, INPUT_EDGE, INPUT_STATE, STATUS};
use crate::triggers::{HEARTBEAT_TIMER, INPUT_WATCH, STATUS_TIMER};

/// Heartbeat timer runner (interrupt executor)
#[embassy_executor::task]
pub async fn heartbeat_task(device: &'static HarpDevice) {
    info!("Heartbeat task started");
    HEARTBEAT_TIMER.run(|| device.fire(HEARTBEAT)).await
}

/// Edge watcher (interrupt executor)
///
/// Publishes the new input level before firing, so the event reports it.
#[embassy_executor::task]
pub async fn input_edge_task(pin: Input<'static>, device: &'static HarpDevice) {
    info!("Input edge task started");
    INPUT_WATCH
        .run(pin, |level| {
            let stored = device
                .with_registers_mut(|map| map.store(INPUT_STATE, RegisterValue::u8(level as u8)));
            if let Err(e) = stored {
                warn!("input state not stored: {:?}", e);
            }
            device.fire(INPUT_EDGE);
        })
        .await
}

/// Recurring status runner
///
/// The event is deferred: firing only marks it pending and the dispatch
/// task renders it.
#[embassy_executor::task]
pub async fn status_task(device: &'static HarpDevice) {
    info!("Status task started");
    STATUS_TIMER.run(|| device.fire(STATUS)).await
}
