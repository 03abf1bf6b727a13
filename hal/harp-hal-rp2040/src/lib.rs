//! RP2040-specific HAL for Harp devices
//!
//! Implements the `harp-hal` traits on top of embassy-rp:
//!
//! - Tick source over the embassy time driver
//! - GPIO wrappers for the indicator and pin-mapped registers
//! - Signal-driven periodic timers and edge watchers for events
//! - UART configuration mapping
//! - Config-driven pin allocation

#![no_std]

pub mod edge;
pub mod gpio;
pub mod pins;
pub mod tick;
pub mod timer;
pub mod uart;

pub use edge::{EdgeControl, EdgeHandle};
pub use gpio::{DigitalIo, Indicator};
pub use pins::{Board, PinBank, PinError};
pub use tick::EmbassyTicks;
pub use timer::{TimerControl, TimerHandle};
