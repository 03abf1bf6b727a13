//! Register abstraction
//!
//! A register is an addressable, typed tuple of elements. The variants
//! differ in where the value lives and which operations are allowed:
//!
//! | Variant | Read | Write |
//! |---|---|---|
//! | `ReadOnly` | stored value | `ReadOnly` error |
//! | `ReadWrite` | stored value | replaces stored value |
//! | `OperationControl` | control byte | replaces control byte (one U8) |
//! | `TimestampSeconds` | clock seconds (U32) | rebases the clock |
//! | `TimestampMicros` | clock ticks (U16) | `ReadOnly` error |
//! | `Pin` | input level (U8) | drives output level |
//!
//! Every access names the element type it expects; a request whose type
//! differs from the register's fails with `TypeMismatch`. The timestamp
//! flag of the request's payload type is not part of the comparison.

mod control;
mod map;

pub use control::{OperationControl, OperationMode};
pub use map::{address, MapError, RegisterMap, MAX_REGISTERS};

use harp_hal::{InputPin, IoPin, OutputPin, TickSource};
use harp_protocol::{ElementType, PayloadType, Value};
use heapless::Vec;

use crate::clock::Clock;

/// Largest register value in bytes
pub const MAX_REGISTER_SIZE: usize = 64;

/// Register access errors
///
/// All of these are answered with an ERROR reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterError {
    /// Request type differs from the register type
    TypeMismatch,
    /// Register cannot be written
    ReadOnly,
    /// No register at this address
    UnknownAddress,
    /// Payload is empty, too large or the wrong shape for the register
    OutOfRange,
}

/// Typed register value: element type plus little-endian element bytes
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterValue {
    element: ElementType,
    bytes: Vec<u8, MAX_REGISTER_SIZE>,
}

impl RegisterValue {
    /// Build from raw little-endian bytes
    ///
    /// `bytes` must hold at least one element and a whole number of them.
    pub fn from_bytes(element: ElementType, bytes: &[u8]) -> Result<Self, RegisterError> {
        if bytes.is_empty() || bytes.len() % element.size() != 0 {
            return Err(RegisterError::OutOfRange);
        }
        let bytes = Vec::from_slice(bytes).map_err(|_| RegisterError::OutOfRange)?;
        Ok(Self { element, bytes })
    }

    /// Build from typed values, all of one element type
    pub fn from_values(values: &[Value]) -> Result<Self, RegisterError> {
        let element = values
            .first()
            .ok_or(RegisterError::OutOfRange)?
            .element_type();
        let mut bytes: Vec<u8, MAX_REGISTER_SIZE> = Vec::new();
        let mut buf = [0u8; 8];
        for value in values {
            if value.element_type() != element {
                return Err(RegisterError::TypeMismatch);
            }
            let n = value.write_le(&mut buf).ok_or(RegisterError::OutOfRange)?;
            bytes
                .extend_from_slice(&buf[..n])
                .map_err(|_| RegisterError::OutOfRange)?;
        }
        Ok(Self { element, bytes })
    }

    pub fn u8(value: u8) -> Self {
        Self::scalar(ElementType::U8, &[value])
    }

    pub fn u16(value: u16) -> Self {
        Self::scalar(ElementType::U16, &value.to_le_bytes())
    }

    pub fn u32(value: u32) -> Self {
        Self::scalar(ElementType::U32, &value.to_le_bytes())
    }

    fn scalar(element: ElementType, bytes: &[u8]) -> Self {
        let mut buf = Vec::new();
        // A scalar is at most eight bytes
        let _ = buf.extend_from_slice(bytes);
        Self {
            element,
            bytes: buf,
        }
    }

    /// Element type
    pub fn element(&self) -> ElementType {
        self.element
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.bytes.len() / self.element.size()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Little-endian element bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<Value> {
        let size = self.element.size();
        let bytes = self.bytes.get(index * size..(index + 1) * size)?;
        Value::read_le(self.element, bytes)
    }
}

/// Placeholder pin type for devices without pin-mapped registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoPin {}

impl OutputPin for NoPin {
    fn set_high(&mut self) {
        match *self {}
    }

    fn set_low(&mut self) {
        match *self {}
    }

    fn toggle(&mut self) {
        match *self {}
    }

    fn is_set_high(&self) -> bool {
        match *self {}
    }
}

impl InputPin for NoPin {
    fn is_high(&self) -> bool {
        match *self {}
    }
}

/// A register in the map
pub enum Register<P = NoPin> {
    ReadOnly(RegisterValue),
    ReadWrite(RegisterValue),
    OperationControl(OperationControl),
    TimestampSeconds,
    TimestampMicros,
    Pin(P),
}

impl<P: IoPin> Register<P> {
    /// Element type of the register
    pub fn element_type(&self) -> ElementType {
        match self {
            Register::ReadOnly(value) | Register::ReadWrite(value) => value.element(),
            Register::OperationControl(_) | Register::Pin(_) => ElementType::U8,
            Register::TimestampSeconds => ElementType::U32,
            Register::TimestampMicros => ElementType::U16,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            Register::ReadOnly(value) | Register::ReadWrite(value) => value.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether writes can succeed
    pub fn is_writable(&self) -> bool {
        !matches!(self, Register::ReadOnly(_) | Register::TimestampMicros)
    }

    fn check_type(&self, ty: PayloadType) -> Result<(), RegisterError> {
        match ty.element() {
            Some(element) if element == self.element_type() => Ok(()),
            _ => Err(RegisterError::TypeMismatch),
        }
    }

    /// Read the current value as `ty`
    pub fn read<T: TickSource>(
        &self,
        ty: PayloadType,
        clock: &Clock<T>,
    ) -> Result<RegisterValue, RegisterError> {
        self.check_type(ty)?;
        let value = match self {
            Register::ReadOnly(value) | Register::ReadWrite(value) => value.clone(),
            Register::OperationControl(ctrl) => RegisterValue::u8(ctrl.bits()),
            Register::TimestampSeconds => RegisterValue::u32(clock.read().seconds),
            Register::TimestampMicros => RegisterValue::u16(clock.read().ticks),
            Register::Pin(pin) => RegisterValue::u8(pin.is_high() as u8),
        };
        Ok(value)
    }

    /// Write little-endian `payload` bytes as `ty`
    pub fn write<T: TickSource>(
        &mut self,
        ty: PayloadType,
        payload: &[u8],
        clock: &Clock<T>,
    ) -> Result<(), RegisterError> {
        if !self.is_writable() {
            return Err(RegisterError::ReadOnly);
        }
        self.check_type(ty)?;
        let value = RegisterValue::from_bytes(self.element_type(), payload)?;

        match self {
            Register::ReadWrite(stored) => *stored = value,
            Register::OperationControl(ctrl) => {
                if value.len() != 1 {
                    return Err(RegisterError::OutOfRange);
                }
                *ctrl = OperationControl(value.as_bytes()[0]);
            }
            Register::TimestampSeconds => {
                let seconds = match value.get(0) {
                    Some(Value::U32(seconds)) => seconds,
                    _ => return Err(RegisterError::OutOfRange),
                };
                clock.write(seconds);
            }
            Register::Pin(pin) => pin.set_state(value.as_bytes()[0] != 0),
            Register::ReadOnly(_) | Register::TimestampMicros => {
                return Err(RegisterError::ReadOnly)
            }
        }
        Ok(())
    }
}
