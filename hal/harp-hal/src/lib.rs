//! Harp Hardware Abstraction Layer
//!
//! This crate defines the collaborator traits the Harp protocol engine
//! consumes. Chip-specific crates (e.g. `harp-hal-rp2040`) implement them,
//! and host tests implement them with mocks, so the same core runs on both.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  harp-core (clock, registers, device)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  harp-hal (this crate - traits)         │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  harp-hal-    │       │  host mocks   │
//! │    rp2040     │       │  (tests)      │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`], [`gpio::InputPin`], [`gpio::EdgeInterrupt`] - Digital I/O
//! - [`uart::UartTx`], [`uart::UartRx`] - Byte-oriented duplex transport
//! - [`timer::PeriodicTimer`] - Periodic trigger source for events
//! - [`timer::TickSource`] - Wrapping free-running tick counter

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod timer;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use gpio::{Edge, EdgeInterrupt, InputPin, IoPin, OutputPin};
pub use timer::{PeriodicTimer, TickSource, TICK_MAX, TICK_PERIOD};
pub use uart::{UartRx, UartTx};
