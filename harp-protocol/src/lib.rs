//! Harp Binary Protocol
//!
//! This crate defines the wire format spoken between a Harp host and a
//! Harp device over a serial link. Every message is a self-describing
//! frame addressed to one register:
//! ```text
//! ┌──────┬────────┬─────────┬──────┬──────────────┬────────────┬──────────┬──────────┐
//! │ TYPE │ LENGTH │ ADDRESS │ PORT │ PAYLOAD TYPE │ TIMESTAMP  │ PAYLOAD  │ CHECKSUM │
//! │ 1B   │ 1B     │ 1B      │ 1B   │ 1B           │ 0B or 6B   │ 0–251B   │ 1B       │
//! └──────┴────────┴─────────┴──────┴──────────────┴────────────┴──────────┴──────────┘
//! ```
//!
//! LENGTH counts every byte after itself. The checksum is the sum of all
//! preceding bytes modulo 256. The timestamp is present iff the payload
//! type carries [`PayloadType::HAS_TIMESTAMP`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod frame;
pub mod message;
pub mod types;

pub use frame::{
    checksum, decode_header, decode_payload, finalize_checksum, payload_offset, validate_checksum,
    Frame, FrameError, FrameParser, Timestamp, Values, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE,
};
pub use message::{validate_message_type, MessageType};
pub use types::{ElementType, PayloadType, Value};
