//! Frame encoding and decoding for the Harp protocol.
//!
//! Frame format:
//! - TYPE (1 byte): READ, WRITE or EVENT, optionally OR'd with ERROR
//! - LENGTH (1 byte): number of bytes following this one, checksum included
//! - ADDRESS (1 byte): register address
//! - PORT (1 byte): 0xFF on device-originated frames
//! - PAYLOAD TYPE (1 byte): element type code, bit 4 flags a timestamp
//! - TIMESTAMP (6 bytes, optional): u32 seconds + u16 ticks of 32 µs, little-endian
//! - PAYLOAD (variable): little-endian elements
//! - CHECKSUM (1 byte): sum of all preceding bytes, modulo 256

use core::fmt;
use core::slice::ChunksExact;

use heapless::Vec;

use crate::message::validate_message_type;
use crate::types::{ElementType, PayloadType, Value};

/// TYPE + LENGTH, the bytes not counted by LENGTH
pub const HEADER_SIZE: usize = 2;

/// TYPE, LENGTH, ADDRESS, PORT and PAYLOAD TYPE
pub const FIXED_HEADER_SIZE: usize = 5;

/// Encoded timestamp size in bytes
pub const TIMESTAMP_SIZE: usize = 6;

/// Maximum complete frame size (LENGTH is a single byte)
pub const MAX_FRAME_SIZE: usize = u8::MAX as usize + HEADER_SIZE;

/// Maximum payload size in bytes (no timestamp)
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - FIXED_HEADER_SIZE - 1;

/// Port byte stamped on every device-originated frame
pub const DEVICE_PORT: u8 = 0xFF;

/// Smallest LENGTH that still covers ADDRESS, PORT, PAYLOAD TYPE and CHECKSUM
pub const MIN_LENGTH: u8 = (FIXED_HEADER_SIZE - HEADER_SIZE + 1) as u8;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Message type byte is not exactly READ, WRITE or EVENT
    InvalidMessageType,
    /// Checksum mismatch
    InvalidChecksum,
    /// LENGTH disagrees with the frame layout
    InvalidLength,
    /// Payload type code names no element type
    UnknownPayloadType,
    /// Value does not match the frame's element type
    ElementMismatch,
    /// Frame carries no timestamp field
    MissingTimestamp,
    /// Payload exceeds the space LENGTH provides
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// Harp timestamp: whole seconds plus ticks of 32 µs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp {
    /// Whole seconds
    pub seconds: u32,
    /// Sub-second part in units of [`Timestamp::TICK_US`] (0..31250)
    pub ticks: u16,
}

impl Timestamp {
    /// Microseconds per tick
    pub const TICK_US: u32 = 32;

    /// Ticks in one second
    pub const TICKS_PER_SECOND: u32 = 1_000_000 / Self::TICK_US;

    /// Create a timestamp
    pub const fn new(seconds: u32, ticks: u16) -> Self {
        Self { seconds, ticks }
    }

    /// Decompose a microsecond count
    pub const fn from_micros(total_us: u64) -> Self {
        Self {
            seconds: (total_us / 1_000_000) as u32,
            ticks: ((total_us % 1_000_000) / Self::TICK_US as u64) as u16,
        }
    }

    /// Total microseconds, truncated to tick resolution
    pub const fn as_micros(self) -> u64 {
        self.seconds as u64 * 1_000_000 + self.ticks as u64 * Self::TICK_US as u64
    }

    /// Wire encoding: u32 seconds then u16 ticks, little-endian, no padding
    pub fn to_le_bytes(self) -> [u8; TIMESTAMP_SIZE] {
        let mut out = [0u8; TIMESTAMP_SIZE];
        out[..4].copy_from_slice(&self.seconds.to_le_bytes());
        out[4..].copy_from_slice(&self.ticks.to_le_bytes());
        out
    }

    /// Decode the wire encoding
    pub fn from_le_bytes(bytes: &[u8; TIMESTAMP_SIZE]) -> Self {
        Self {
            seconds: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            ticks: u16::from_le_bytes([bytes[4], bytes[5]]),
        }
    }
}

/// Sum of `bytes` modulo 256
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Check that the last byte is the checksum of every byte before it
pub fn validate_checksum(frame: &[u8]) -> bool {
    match frame.split_last() {
        Some((&last, rest)) => checksum(rest) == last,
        None => false,
    }
}

/// Write the checksum of every preceding byte into the last byte
pub fn finalize_checksum(frame: &mut [u8]) {
    if let Some((last, rest)) = frame.split_last_mut() {
        *last = checksum(rest);
    }
}

/// Split the two header bytes into (message type, length)
pub fn decode_header(bytes: &[u8; HEADER_SIZE]) -> (u8, u8) {
    (bytes[0], bytes[1])
}

/// Offset of the first payload byte
pub fn payload_offset(payload_type: PayloadType) -> usize {
    if payload_type.has_timestamp() {
        FIXED_HEADER_SIZE + TIMESTAMP_SIZE
    } else {
        FIXED_HEADER_SIZE
    }
}

/// Number of payload elements a frame of `length` carries
///
/// `(length - offset + 1) / size`: LENGTH counts the checksum and excludes
/// the two header bytes, so the `+ 1` lines the two up.
pub fn element_count(payload_type: PayloadType, length: u8) -> Result<usize, FrameError> {
    let element = payload_type
        .element()
        .ok_or(FrameError::UnknownPayloadType)?;
    let span = (length as usize + 1)
        .checked_sub(payload_offset(payload_type))
        .ok_or(FrameError::InvalidLength)?;
    Ok(span / element.size())
}

/// Decode the payload elements of a raw frame
pub fn decode_payload(
    frame: &[u8],
    payload_type: PayloadType,
    length: u8,
) -> Result<Values<'_>, FrameError> {
    let element = payload_type
        .element()
        .ok_or(FrameError::UnknownPayloadType)?;
    let offset = payload_offset(payload_type);
    let count = element_count(payload_type, length)?;
    let bytes = frame
        .get(offset..offset + count * element.size())
        .ok_or(FrameError::InvalidLength)?;
    Ok(Values {
        element,
        chunks: bytes.chunks_exact(element.size()),
    })
}

/// Iterator over the typed elements of a payload
#[derive(Debug, Clone)]
pub struct Values<'a> {
    element: ElementType,
    chunks: ChunksExact<'a, u8>,
}

impl Values<'_> {
    /// Element type being decoded
    pub fn element(&self) -> ElementType {
        self.element
    }
}

impl Iterator for Values<'_> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let chunk = self.chunks.next()?;
        Value::read_le(self.element, chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for Values<'_> {}

/// A complete frame, stored in its wire encoding
///
/// The buffer always holds exactly `length + 2` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    buffer: Vec<u8, MAX_FRAME_SIZE>,
}

impl Frame {
    /// Create a zero-filled frame of `length + 2` bytes
    ///
    /// The port is set to [`DEVICE_PORT`] and the timestamp flag of
    /// `payload_type` follows whether a timestamp is supplied. The payload
    /// and checksum are left for the caller.
    pub fn new(
        message_type: u8,
        length: u8,
        address: u8,
        payload_type: PayloadType,
        timestamp: Option<Timestamp>,
    ) -> Result<Self, FrameError> {
        let payload_type = match timestamp {
            Some(_) => payload_type.with_timestamp(),
            None => payload_type.base(),
        };
        if (length as usize + 1) < payload_offset(payload_type) {
            return Err(FrameError::InvalidLength);
        }

        let mut buffer = Vec::new();
        buffer
            .resize(length as usize + HEADER_SIZE, 0)
            .map_err(|_| FrameError::BufferTooSmall)?;
        buffer[0] = message_type;
        buffer[1] = length;
        buffer[2] = address;
        buffer[3] = DEVICE_PORT;
        buffer[4] = payload_type.raw();

        let mut frame = Self { buffer };
        if let Some(ts) = timestamp {
            frame.set_timestamp(ts)?;
        }
        Ok(frame)
    }

    /// Create a frame and pack `payload` into it
    ///
    /// The checksum is not computed; call [`Frame::finalize_checksum`].
    pub fn encode(
        message_type: u8,
        length: u8,
        address: u8,
        payload_type: PayloadType,
        timestamp: Option<Timestamp>,
        payload: &[Value],
    ) -> Result<Self, FrameError> {
        let mut frame = Self::new(message_type, length, address, payload_type, timestamp)?;
        frame.set_values(payload)?;
        Ok(frame)
    }

    /// Parse and validate a complete raw frame
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        let header: &[u8; HEADER_SIZE] = bytes
            .get(..HEADER_SIZE)
            .and_then(|h| h.try_into().ok())
            .ok_or(FrameError::InvalidLength)?;
        let (message_type, length) = decode_header(header);

        if !validate_message_type(message_type) {
            return Err(FrameError::InvalidMessageType);
        }
        if length < MIN_LENGTH || bytes.len() != length as usize + HEADER_SIZE {
            return Err(FrameError::InvalidLength);
        }
        if !validate_checksum(bytes) {
            return Err(FrameError::InvalidChecksum);
        }

        let buffer = Vec::from_slice(bytes).map_err(|_| FrameError::BufferTooSmall)?;
        Ok(Self { buffer })
    }

    /// Message type byte (ERROR flag included)
    pub fn message_type(&self) -> u8 {
        self.buffer[0]
    }

    /// LENGTH byte
    pub fn length(&self) -> u8 {
        self.buffer[1]
    }

    /// Register address
    pub fn address(&self) -> u8 {
        self.buffer[2]
    }

    /// Port byte
    pub fn port(&self) -> u8 {
        self.buffer[3]
    }

    /// Payload type byte (timestamp flag included)
    pub fn payload_type(&self) -> PayloadType {
        PayloadType(self.buffer[4])
    }

    /// Checksum byte as stored
    pub fn checksum(&self) -> u8 {
        self.buffer[self.buffer.len() - 1]
    }

    /// Timestamp, if the frame carries one
    pub fn timestamp(&self) -> Option<Timestamp> {
        if !self.payload_type().has_timestamp() {
            return None;
        }
        let bytes: &[u8; TIMESTAMP_SIZE] = self
            .buffer
            .get(FIXED_HEADER_SIZE..FIXED_HEADER_SIZE + TIMESTAMP_SIZE)?
            .try_into()
            .ok()?;
        Some(Timestamp::from_le_bytes(bytes))
    }

    /// Overwrite the timestamp field
    pub fn set_timestamp(&mut self, timestamp: Timestamp) -> Result<(), FrameError> {
        if !self.payload_type().has_timestamp() {
            return Err(FrameError::MissingTimestamp);
        }
        self.buffer
            .get_mut(FIXED_HEADER_SIZE..FIXED_HEADER_SIZE + TIMESTAMP_SIZE)
            .ok_or(FrameError::InvalidLength)?
            .copy_from_slice(&timestamp.to_le_bytes());
        Ok(())
    }

    /// Decode the payload elements
    pub fn payload(&self) -> Result<Values<'_>, FrameError> {
        decode_payload(&self.buffer, self.payload_type(), self.length())
    }

    /// Raw bytes of the decoded payload elements
    ///
    /// For an unknown payload type this is the whole region between the
    /// header and the checksum.
    pub fn payload_bytes(&self) -> &[u8] {
        let region = self.payload_region();
        match element_count(self.payload_type(), self.length()) {
            Ok(count) => &region[..count * self.payload_type().size()],
            Err(_) => region,
        }
    }

    /// Bytes between the header (and timestamp) and the checksum
    fn payload_region(&self) -> &[u8] {
        let offset = payload_offset(self.payload_type()).min(self.buffer.len() - 1);
        &self.buffer[offset..self.buffer.len() - 1]
    }

    /// Copy raw payload bytes to the start of the payload region
    pub fn set_payload_bytes(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        let offset = payload_offset(self.payload_type());
        let end = self.buffer.len() - 1;
        let region = self
            .buffer
            .get_mut(offset..end)
            .ok_or(FrameError::InvalidLength)?;
        region
            .get_mut(..bytes.len())
            .ok_or(FrameError::PayloadTooLarge)?
            .copy_from_slice(bytes);
        Ok(())
    }

    /// Pack typed values into the payload region
    ///
    /// Every value must match the frame's element type.
    pub fn set_values(&mut self, values: &[Value]) -> Result<(), FrameError> {
        let element = self
            .payload_type()
            .element()
            .ok_or(FrameError::UnknownPayloadType)?;
        let offset = payload_offset(self.payload_type());
        let end = self.buffer.len() - 1;
        let mut region = self
            .buffer
            .get_mut(offset..end)
            .ok_or(FrameError::InvalidLength)?;

        for value in values {
            if value.element_type() != element {
                return Err(FrameError::ElementMismatch);
            }
            let written = value
                .write_le(region)
                .ok_or(FrameError::PayloadTooLarge)?;
            region = &mut core::mem::take(&mut region)[written..];
        }
        Ok(())
    }

    /// Compute and store the checksum
    pub fn finalize_checksum(&mut self) {
        finalize_checksum(&mut self.buffer);
    }

    /// Check the stored checksum
    pub fn has_valid_checksum(&self) -> bool {
        validate_checksum(&self.buffer)
    }

    /// Wire encoding
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Total size in bytes (`length + 2`)
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Always false; a frame holds at least its header
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Dash-separated hex dump, e.g. `01-04-00-ff-02-06`
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.buffer.iter().enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Frame {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=[u8]:02x}", self.as_bytes())
    }
}

/// Two-stage frame reassembly
///
/// Stage one collects the two header bytes and validates the message type.
/// Stage two collects exactly LENGTH further bytes and validates the
/// checksum. Any failure discards the partial frame and restarts at stage
/// one with the next byte; there is no scan for a lost frame boundary.
#[derive(Debug, Clone)]
pub struct FrameParser {
    state: ParseState,
    buffer: Vec<u8, MAX_FRAME_SIZE>,
    remaining: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Collecting TYPE and LENGTH
    Header,
    /// Collecting the LENGTH bytes that follow
    Body,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Create a new frame parser
    pub fn new() -> Self {
        Self {
            state: ParseState::Header,
            buffer: Vec::new(),
            remaining: HEADER_SIZE,
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ParseState::Header;
        self.buffer.clear();
        self.remaining = HEADER_SIZE;
    }

    /// Bytes still needed to complete the current stage
    pub fn needed(&self) -> usize {
        self.remaining
    }

    /// Check if no byte of the next frame has arrived yet
    pub fn is_idle(&self) -> bool {
        self.state == ParseState::Header && self.buffer.is_empty()
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(frame))` when a complete valid frame is parsed,
    /// `Ok(None)` when more bytes are needed, or `Err` on a validation
    /// failure (the partial frame has then been discarded).
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        if self.buffer.push(byte).is_err() {
            self.reset();
            return Err(FrameError::InvalidLength);
        }
        self.remaining -= 1;
        if self.remaining > 0 {
            return Ok(None);
        }

        match self.state {
            ParseState::Header => {
                let (message_type, length) = decode_header(&[self.buffer[0], self.buffer[1]]);
                if !validate_message_type(message_type) {
                    self.reset();
                    return Err(FrameError::InvalidMessageType);
                }
                if length < MIN_LENGTH {
                    self.reset();
                    return Err(FrameError::InvalidLength);
                }
                self.state = ParseState::Body;
                self.remaining = length as usize;
                Ok(None)
            }
            ParseState::Body => {
                if !validate_checksum(&self.buffer) {
                    self.reset();
                    return Err(FrameError::InvalidChecksum);
                }
                let frame = Frame {
                    buffer: core::mem::take(&mut self.buffer),
                };
                self.reset();
                Ok(Some(frame))
            }
        }
    }

    /// Feed multiple bytes to the parser
    ///
    /// Stops at the first complete frame or error. Returns the number of
    /// bytes consumed alongside the outcome; bytes past that point are left
    /// to the caller.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> (usize, Result<Option<Frame>, FrameError>) {
        for (i, &byte) in bytes.iter().enumerate() {
            match self.feed(byte) {
                Ok(None) => {}
                outcome => return (i + 1, outcome),
            }
        }
        (bytes.len(), Ok(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageType;
    use proptest::prelude::*;

    fn with_checksum(bytes: &[u8]) -> heapless::Vec<u8, MAX_FRAME_SIZE> {
        let mut v = heapless::Vec::from_slice(bytes).unwrap();
        v.push(checksum(bytes)).unwrap();
        v
    }

    #[test]
    fn test_who_am_i_read_request() {
        let raw = with_checksum(&[0x01, 0x04, 0x00, 0xFF, 0x02]);
        let frame = Frame::from_bytes(&raw).unwrap();

        assert_eq!(frame.message_type(), MessageType::Read.code());
        assert_eq!(frame.length(), 4);
        assert_eq!(frame.address(), 0);
        assert_eq!(frame.port(), DEVICE_PORT);
        assert_eq!(frame.payload_type(), PayloadType::U16);
        assert_eq!(frame.timestamp(), None);
        assert_eq!(frame.payload().unwrap().len(), 0);
        assert!(frame.has_valid_checksum());
    }

    #[test]
    fn test_element_count_includes_checksum_slot() {
        // u16 payload with timestamp: 1 element → LENGTH 12
        assert_eq!(element_count(PayloadType::U16.with_timestamp(), 12), Ok(1));
        // odd spare byte is not an element
        assert_eq!(element_count(PayloadType::U16, 5), Ok(0));
        assert_eq!(element_count(PayloadType::U8, 5), Ok(1));
        assert_eq!(
            element_count(PayloadType::U8.with_timestamp(), 4),
            Err(FrameError::InvalidLength)
        );
        assert_eq!(
            element_count(PayloadType(0x03), 10),
            Err(FrameError::UnknownPayloadType)
        );
    }

    #[test]
    fn test_payload_offset() {
        assert_eq!(payload_offset(PayloadType::U32), 5);
        assert_eq!(payload_offset(PayloadType::U32.with_timestamp()), 11);
    }

    #[test]
    fn test_encode_with_timestamp() {
        let ts = Timestamp::new(0x0102_0304, 0x0506);
        let mut frame = Frame::encode(
            MessageType::Event.code(),
            12,
            8,
            PayloadType::U16,
            Some(ts),
            &[Value::U16(0xBEEF)],
        )
        .unwrap();
        frame.finalize_checksum();

        assert_eq!(frame.len(), 14);
        assert_eq!(
            &frame.as_bytes()[..13],
            &[0x03, 12, 8, 0xFF, 0x12, 0x04, 0x03, 0x02, 0x01, 0x06, 0x05, 0xEF, 0xBE]
        );
        assert_eq!(frame.timestamp(), Some(ts));
        assert!(frame.has_valid_checksum());
    }

    #[test]
    fn test_new_clears_timestamp_flag_without_timestamp() {
        let frame = Frame::new(1, 6, 0, PayloadType::U16.with_timestamp(), None).unwrap();
        assert_eq!(frame.payload_type(), PayloadType::U16);
        assert_eq!(frame.len(), 8);
    }

    #[test]
    fn test_new_rejects_length_shorter_than_header() {
        assert_eq!(
            Frame::new(1, 8, 0, PayloadType::U8, Some(Timestamp::default())),
            Err(FrameError::InvalidLength)
        );
    }

    #[test]
    fn test_set_values_rejects_overflow_and_mismatch() {
        let mut frame = Frame::new(2, 6, 0, PayloadType::U16, None).unwrap();
        assert_eq!(
            frame.set_values(&[Value::U16(1), Value::U16(2)]),
            Err(FrameError::PayloadTooLarge)
        );
        assert_eq!(
            frame.set_values(&[Value::U8(1)]),
            Err(FrameError::ElementMismatch)
        );
    }

    #[test]
    fn test_set_timestamp_requires_flag() {
        let mut frame = Frame::new(1, 4, 0, PayloadType::U8, None).unwrap();
        assert_eq!(
            frame.set_timestamp(Timestamp::default()),
            Err(FrameError::MissingTimestamp)
        );
    }

    #[test]
    fn test_from_bytes_rejections() {
        let mut raw = with_checksum(&[0x01, 0x04, 0x00, 0xFF, 0x02]);
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        assert_eq!(Frame::from_bytes(&raw), Err(FrameError::InvalidChecksum));

        let raw = with_checksum(&[0x09, 0x04, 0x00, 0xFF, 0x02]);
        assert_eq!(Frame::from_bytes(&raw), Err(FrameError::InvalidMessageType));

        let raw = with_checksum(&[0x01, 0x05, 0x00, 0xFF, 0x02]);
        assert_eq!(Frame::from_bytes(&raw), Err(FrameError::InvalidLength));

        assert_eq!(Frame::from_bytes(&[0x01]), Err(FrameError::InvalidLength));
    }

    #[test]
    fn test_display_hex() {
        let raw = with_checksum(&[0x01, 0x04, 0x00, 0xFF, 0x02]);
        let frame = Frame::from_bytes(&raw).unwrap();
        let mut out = heapless::String::<32>::new();
        core::fmt::write(&mut out, format_args!("{}", frame)).unwrap();
        assert_eq!(out.as_str(), "01-04-00-ff-02-06");
    }

    #[test]
    fn test_parser_two_stages() {
        let raw = with_checksum(&[0x02, 0x06, 0x0D, 0xFF, 0x02, 0x34, 0x12]);
        let mut parser = FrameParser::new();

        assert_eq!(parser.needed(), 2);
        assert_eq!(parser.feed(raw[0]), Ok(None));
        assert_eq!(parser.feed(raw[1]), Ok(None));
        assert_eq!(parser.needed(), 6);

        let (consumed, outcome) = parser.feed_bytes(&raw[2..]);
        assert_eq!(consumed, 6);
        let frame = outcome.unwrap().unwrap();
        assert_eq!(frame.address(), 13);
        let values: heapless::Vec<Value, 4> = frame.payload().unwrap().collect();
        assert_eq!(values.as_slice(), &[Value::U16(0x1234)]);
        assert!(parser.is_idle());
    }

    #[test]
    fn test_parser_rejects_error_flag_in_header() {
        let mut parser = FrameParser::new();
        assert_eq!(parser.feed(0x09), Ok(None));
        assert_eq!(parser.feed(0x04), Err(FrameError::InvalidMessageType));
        assert!(parser.is_idle());
    }

    #[test]
    fn test_parser_does_not_resynchronise() {
        // A stray byte before a valid frame shifts the framing; the frame
        // that follows is consumed as garbage rather than found by scanning.
        let raw = with_checksum(&[0x01, 0x04, 0x00, 0xFF, 0x02]);
        let mut data = heapless::Vec::<u8, 16>::new();
        data.push(0x01).unwrap();
        data.extend_from_slice(&raw).unwrap();

        let mut parser = FrameParser::new();
        let (consumed, outcome) = parser.feed_bytes(&data);
        assert_eq!(consumed, 2);
        assert_eq!(outcome, Err(FrameError::InvalidLength));
    }

    #[test]
    fn test_parser_checksum_failure_restarts() {
        let mut bad = with_checksum(&[0x01, 0x04, 0x00, 0xFF, 0x02]);
        let last = bad.len() - 1;
        bad[last] = bad[last].wrapping_add(1);
        let good = with_checksum(&[0x01, 0x04, 0x01, 0xFF, 0x01]);

        let mut parser = FrameParser::new();
        let (_, outcome) = parser.feed_bytes(&bad);
        assert_eq!(outcome, Err(FrameError::InvalidChecksum));

        let (_, outcome) = parser.feed_bytes(&good);
        assert_eq!(outcome.unwrap().unwrap().address(), 1);
    }

    fn element_values(ty: ElementType) -> BoxedStrategy<Value> {
        match ty {
            ElementType::U8 => any::<u8>().prop_map(Value::U8).boxed(),
            ElementType::S8 => any::<i8>().prop_map(Value::S8).boxed(),
            ElementType::U16 => any::<u16>().prop_map(Value::U16).boxed(),
            ElementType::S16 => any::<i16>().prop_map(Value::S16).boxed(),
            ElementType::U32 => any::<u32>().prop_map(Value::U32).boxed(),
            ElementType::S32 => any::<i32>().prop_map(Value::S32).boxed(),
            ElementType::U64 => any::<u64>().prop_map(Value::U64).boxed(),
            ElementType::S64 => any::<i64>().prop_map(Value::S64).boxed(),
            ElementType::Float => proptest::num::f32::NORMAL.prop_map(Value::Float).boxed(),
        }
    }

    fn typed_payload() -> impl Strategy<Value = (ElementType, std::vec::Vec<Value>)> {
        proptest::sample::select(ElementType::ALL.to_vec()).prop_flat_map(|ty| {
            let max = MAX_PAYLOAD_SIZE / ty.size();
            (
                Just(ty),
                proptest::collection::vec(element_values(ty), 0..=max.min(24)),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_checksum_validates_after_finalize(
            (ty, values) in typed_payload(),
            address in any::<u8>(),
            seconds in any::<u32>(),
            ticks in 0u16..31250,
            stamped in any::<bool>(),
        ) {
            let timestamp = stamped.then_some(Timestamp::new(seconds, ticks));
            let pt = PayloadType::from(ty);
            let length = values.len() * ty.size() + payload_offset(if stamped { pt.with_timestamp() } else { pt }) - 1;
            let mut frame = Frame::encode(3, length as u8, address, pt, timestamp, &values).unwrap();
            frame.finalize_checksum();
            prop_assert!(validate_checksum(frame.as_bytes()));
            prop_assert_eq!(frame.len(), length + 2);
        }

        #[test]
        fn prop_payload_decodes_to_original((ty, values) in typed_payload(), stamped in any::<bool>()) {
            let pt = PayloadType::from(ty);
            let timestamp = stamped.then_some(Timestamp::new(7, 9));
            let length = values.len() * ty.size() + payload_offset(if stamped { pt.with_timestamp() } else { pt }) - 1;
            let mut frame = Frame::encode(2, length as u8, 0x20, pt, timestamp, &values).unwrap();
            frame.finalize_checksum();

            let parsed = Frame::from_bytes(frame.as_bytes()).unwrap();
            let decoded: std::vec::Vec<Value> =
                decode_payload(parsed.as_bytes(), parsed.payload_type(), parsed.length())
                    .unwrap()
                    .collect();
            prop_assert_eq!(decoded, values);
            prop_assert_eq!(parsed.timestamp(), timestamp);
        }
    }
}
