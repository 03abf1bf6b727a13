//! Host link receive task
//!
//! Reads at most what the parser still needs, so a request is queued as
//! soon as its last byte arrives.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;
use harp_protocol::{FrameParser, MAX_FRAME_SIZE};

use crate::device::HarpDevice;

#[embassy_executor::task]
pub async fn serial_rx_task(mut rx: BufferedUartRx, device: &'static HarpDevice) {
    info!("Serial RX task started");

    let mut parser = FrameParser::new();
    let mut buf = [0u8; MAX_FRAME_SIZE];

    loop {
        let want = parser.needed().min(buf.len());
        match rx.read(&mut buf[..want]).await {
            Ok(n) if n > 0 => {
                trace!("RX: {} bytes", n);
                device.receive(&buf[..n], &mut parser);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("UART read error: {:?}", e);
                parser.reset();
            }
        }
    }
}
