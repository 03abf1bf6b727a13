//! Request dispatch task
//!
//! Handles one request per iteration and yields in between, so a burst
//! of requests cannot starve the transport tasks. Deferred events are
//! rendered here too.

use defmt::*;
use embassy_futures::yield_now;
use embassy_time::{Duration, Ticker};

use crate::device::HarpDevice;

/// Idle poll interval when no request is waiting
const IDLE_POLL_MS: u64 = 1;

#[embassy_executor::task]
pub async fn dispatch_task(device: &'static HarpDevice) {
    info!("Dispatch task started");

    let mut ticker = Ticker::every(Duration::from_millis(IDLE_POLL_MS));

    loop {
        let handled = device.dispatch_next();
        let emitted = device.service_events();
        if emitted > 0 {
            trace!("{} deferred events emitted", emitted);
        }
        if handled {
            yield_now().await;
        } else {
            ticker.next().await;
        }
    }
}
