//! Host link transmit task
//!
//! Drains the outgoing queue in order: replies and event frames share it.

use defmt::*;
use embassy_rp::uart::BufferedUartTx;
use embassy_time::{Duration, Ticker};
use embedded_io_async::Write;

use crate::device::HarpDevice;

/// Poll interval for the outgoing queue
const TX_POLL_MS: u64 = 1;

#[embassy_executor::task]
pub async fn serial_tx_task(mut tx: BufferedUartTx, device: &'static HarpDevice) {
    info!("Serial TX task started");

    let mut ticker = Ticker::every(Duration::from_millis(TX_POLL_MS));

    loop {
        let mut sent = false;
        while let Some(frame) = device.next_outgoing() {
            if let Err(e) = tx.write_all(frame.as_bytes()).await {
                warn!("UART write error: {:?}", e);
            }
            sent = true;
        }
        if sent {
            if let Err(e) = tx.flush().await {
                warn!("UART flush error: {:?}", e);
            }
        }
        ticker.next().await;
    }
}
