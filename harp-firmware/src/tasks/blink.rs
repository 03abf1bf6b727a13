//! Status indicator task

use defmt::*;
use embassy_time::Timer;

use crate::device::HarpDevice;

/// Toggle the indicator at the rate of the current operation mode
#[embassy_executor::task]
pub async fn blink_task(device: &'static HarpDevice) {
    info!("Blink task started");

    loop {
        let interval_ms = device.indicator_step();
        Timer::after_millis(interval_ms as u64).await;
    }
}
