//! Message types
//!
//! The first byte of every frame. Requests from the host are READ or
//! WRITE; the device answers with the same type, and emits EVENT frames
//! on its own. A device reply that failed carries the ERROR flag.

/// Message type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MessageType {
    /// Read a register
    Read = 1,
    /// Write a register, then read it back
    Write = 2,
    /// Unsolicited notification from the device
    Event = 3,
}

impl MessageType {
    /// Flag OR'd into a reply's message type when the request failed
    pub const ERROR: u8 = 0x08;

    /// Parse an inbound message type byte
    ///
    /// Returns `None` for unknown codes and for codes carrying the ERROR flag.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(MessageType::Read),
            2 => Some(MessageType::Write),
            3 => Some(MessageType::Event),
            _ => None,
        }
    }

    /// Wire code of this message type
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Wire code with the ERROR flag set
    pub const fn error_code(self) -> u8 {
        self as u8 | Self::ERROR
    }
}

/// Check that an inbound message type byte is exactly READ, WRITE or EVENT
pub fn validate_message_type(byte: u8) -> bool {
    MessageType::from_byte(byte).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_message_types() {
        assert!(validate_message_type(1));
        assert!(validate_message_type(2));
        assert!(validate_message_type(3));
    }

    #[test]
    fn test_error_flag_fails_validation() {
        assert!(!validate_message_type(MessageType::Read.error_code()));
        assert!(!validate_message_type(0x0A));
    }

    #[test]
    fn test_unknown_codes_fail_validation() {
        for byte in [0u8, 4, 7, 0x10, 0xFF] {
            assert!(!validate_message_type(byte), "byte {:#x}", byte);
        }
    }
}
