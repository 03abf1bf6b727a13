//! Board-agnostic Harp device engine
//!
//! This crate contains everything a Harp device does that does not depend
//! on specific hardware:
//!
//! - Device clock with wrap-aware tick merging and rebasing
//! - Typed register map with the common Harp register set
//! - Event engine for timer, edge and recurring notifications
//! - Bounded frame queues shared between tasks and interrupts
//! - Device orchestrator: request dispatch and reply synthesis
//!
//! Hardware is reached only through the `harp-hal` traits.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod clock;
pub mod config;
pub mod device;
pub mod event;
pub mod queue;
pub mod register;

pub use clock::Clock;
pub use config::{ClockConfig, DeviceConfig, Version};
pub use device::{Device, SetupError};
pub use event::{EventClass, EventId, EventSource, Trigger, TriggerBinder};
pub use queue::FrameQueue;
pub use register::{
    MapError, NoPin, OperationControl, OperationMode, Register, RegisterError, RegisterMap,
    RegisterValue,
};
