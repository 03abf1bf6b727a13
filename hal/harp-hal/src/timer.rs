//! Timer and tick source abstractions
//!
//! A [`TickSource`] is the free-running counter the Harp clock derives its
//! timestamps from. A [`PeriodicTimer`] is the trigger behind timer-driven
//! events.

/// Largest value a tick counter reaches before wrapping to zero (30 bits)
pub const TICK_MAX: u32 = 0x3FFF_FFFF;

/// Number of distinct tick values, the modulus of all tick arithmetic
pub const TICK_PERIOD: u32 = TICK_MAX + 1;

/// Free-running, wrapping tick counter
///
/// Both counters run from device start and wrap from [`TICK_MAX`] to zero.
/// Implementations must be callable from interrupt context.
pub trait TickSource {
    /// Current millisecond count, modulo [`TICK_PERIOD`]
    fn ticks_ms(&self) -> u32;

    /// Current microsecond count, modulo [`TICK_PERIOD`]
    fn ticks_us(&self) -> u32;
}

/// Signed distance from `start` to `end` on the wrapping tick circle
///
/// The result lies in `-(TICK_PERIOD / 2)..TICK_PERIOD / 2`, so a counter
/// that wrapped between the two samples yields a small positive distance
/// instead of a large negative jump.
pub fn ticks_diff(end: u32, start: u32) -> i32 {
    let half = TICK_PERIOD / 2;
    let diff = end.wrapping_sub(start) & TICK_MAX;
    if diff >= half {
        diff as i32 - TICK_PERIOD as i32
    } else {
        diff as i32
    }
}

/// Periodic hardware timer
///
/// While armed, the implementation invokes its bound callback once every
/// period. The callback binding is fixed when the timer is created.
pub trait PeriodicTimer {
    /// Start firing every `period_ms` milliseconds
    fn arm(&mut self, period_ms: u32);

    /// Stop firing
    fn disarm(&mut self);

    /// Check if the timer is currently armed
    fn is_armed(&self) -> bool;
}
