//! Tick source over the embassy time driver

use embassy_time::Instant;
use harp_hal::{TickSource, TICK_MAX};

/// Reads the RP2040 timer through `embassy_time::Instant`
///
/// Both counters are taken from the same 64-bit microsecond timer, reduced
/// to the 30-bit wrapping range the clock expects.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyTicks;

impl TickSource for EmbassyTicks {
    fn ticks_ms(&self) -> u32 {
        Instant::now().as_millis() as u32 & TICK_MAX
    }

    fn ticks_us(&self) -> u32 {
        Instant::now().as_micros() as u32 & TICK_MAX
    }
}
