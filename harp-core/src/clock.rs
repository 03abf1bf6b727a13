//! Device clock
//!
//! Harp timestamps are derived from a free-running [`TickSource`] whose
//! millisecond and microsecond counters both wrap at [`TICK_MAX`]. The
//! millisecond counter gives the coarse position and the microsecond
//! counter refines it within one millisecond, so the merged count only
//! wraps when the millisecond counter does (about every 12 days).
//!
//! A rebase stores an offset that is added to every later reading. The
//! offset is a single atomic, so reads from interrupt context never see a
//! torn value.

use harp_hal::timer::{ticks_diff, TickSource, TICK_MAX, TICK_PERIOD};
use harp_protocol::Timestamp;
use portable_atomic::{AtomicI64, Ordering};

use crate::config::ClockConfig;

const MICROS_PER_SECOND: i64 = 1_000_000;

/// Harp device clock over a wrapping tick source
pub struct Clock<T> {
    source: T,
    offset_us: AtomicI64,
    config: ClockConfig,
}

impl<T: TickSource> Clock<T> {
    /// Create a clock reading zero at tick zero
    pub const fn new(source: T, config: ClockConfig) -> Self {
        Self {
            source,
            offset_us: AtomicI64::new(0),
            config,
        }
    }

    /// Underlying tick source
    pub fn source(&self) -> &T {
        &self.source
    }

    /// Merge the two hardware counters into one microsecond count
    fn raw_micros(&self) -> i64 {
        let ms = self.source.ticks_ms() & TICK_MAX;
        let us = self.source.ticks_us() & TICK_MAX;
        let coarse = ms as i64 * 1000;
        let fine = ticks_diff(us, (coarse % TICK_PERIOD as i64) as u32);
        coarse + fine as i64
    }

    /// Current device time in microseconds
    pub fn micros(&self) -> u64 {
        let now = self.raw_micros()
            + self.offset_us.load(Ordering::Relaxed)
            + self.config.read_compensation_us as i64;
        now.max(0) as u64
    }

    /// Current Harp timestamp
    pub fn read(&self) -> Timestamp {
        Timestamp::from_micros(self.micros())
    }

    /// Rebase so the next reading's seconds equal `seconds`
    ///
    /// The sub-second part restarts from zero (plus the write compensation)
    /// at the instant of the write.
    pub fn write(&self, seconds: u32) {
        let target = seconds as i64 * MICROS_PER_SECOND + self.config.write_compensation_us as i64;
        let now = self.raw_micros() + self.config.read_compensation_us as i64;
        self.offset_us.store(target - now, Ordering::Relaxed);
    }
}
