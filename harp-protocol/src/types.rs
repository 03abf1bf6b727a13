//! Payload type codes and typed element values
//!
//! A payload type byte packs the element width into its low nibble and the
//! signedness into bit 7. Float is the fixed code `0x44`. Bit 4 marks a
//! frame that carries a timestamp and is not part of the element type.

/// Raw payload type byte, as carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PayloadType(pub u8);

impl PayloadType {
    const SIGNED: u8 = 0x80;
    const SIZE_MASK: u8 = 0x0F;

    pub const U8: Self = Self(1);
    pub const S8: Self = Self(1 | Self::SIGNED);
    pub const U16: Self = Self(2);
    pub const S16: Self = Self(2 | Self::SIGNED);
    pub const U32: Self = Self(4);
    pub const S32: Self = Self(4 | Self::SIGNED);
    pub const U64: Self = Self(8);
    pub const S64: Self = Self(8 | Self::SIGNED);
    pub const FLOAT: Self = Self(0x44);

    /// Frame carries a 6-byte timestamp after the payload type byte
    pub const HAS_TIMESTAMP: u8 = 0x10;

    /// Raw byte
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Element width in bytes (low nibble)
    pub const fn size(self) -> usize {
        (self.0 & Self::SIZE_MASK) as usize
    }

    /// Signed integer element
    pub const fn is_signed(self) -> bool {
        self.0 & Self::SIGNED != 0
    }

    /// IEEE-754 single precision element
    pub const fn is_float(self) -> bool {
        self.base().0 == Self::FLOAT.0
    }

    /// Timestamp flag is set
    pub const fn has_timestamp(self) -> bool {
        self.0 & Self::HAS_TIMESTAMP != 0
    }

    /// Same type with the timestamp flag set
    pub const fn with_timestamp(self) -> Self {
        Self(self.0 | Self::HAS_TIMESTAMP)
    }

    /// Element type code with the timestamp flag cleared
    pub const fn base(self) -> Self {
        Self(self.0 & !Self::HAS_TIMESTAMP)
    }

    /// Element type, if the code names one
    pub fn element(self) -> Option<ElementType> {
        ElementType::from_code(self.base().0)
    }
}

impl From<ElementType> for PayloadType {
    fn from(ty: ElementType) -> Self {
        PayloadType(ty.code())
    }
}

/// Supported element types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ElementType {
    U8,
    S8,
    U16,
    S16,
    U32,
    S32,
    U64,
    S64,
    Float,
}

impl ElementType {
    /// All element types, in code order
    pub const ALL: [ElementType; 9] = [
        ElementType::U8,
        ElementType::S8,
        ElementType::U16,
        ElementType::S16,
        ElementType::U32,
        ElementType::S32,
        ElementType::U64,
        ElementType::S64,
        ElementType::Float,
    ];

    /// Parse a payload type code (timestamp flag must already be cleared)
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.code() == code)
    }

    /// Wire code
    pub const fn code(self) -> u8 {
        match self {
            ElementType::U8 => PayloadType::U8.0,
            ElementType::S8 => PayloadType::S8.0,
            ElementType::U16 => PayloadType::U16.0,
            ElementType::S16 => PayloadType::S16.0,
            ElementType::U32 => PayloadType::U32.0,
            ElementType::S32 => PayloadType::S32.0,
            ElementType::U64 => PayloadType::U64.0,
            ElementType::S64 => PayloadType::S64.0,
            ElementType::Float => PayloadType::FLOAT.0,
        }
    }

    /// Width in bytes
    pub const fn size(self) -> usize {
        PayloadType(self.code()).size()
    }
}

/// A single typed payload element
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Value {
    U8(u8),
    S8(i8),
    U16(u16),
    S16(i16),
    U32(u32),
    S32(i32),
    U64(u64),
    S64(i64),
    Float(f32),
}

impl Value {
    /// Element type of this value
    pub const fn element_type(&self) -> ElementType {
        match self {
            Value::U8(_) => ElementType::U8,
            Value::S8(_) => ElementType::S8,
            Value::U16(_) => ElementType::U16,
            Value::S16(_) => ElementType::S16,
            Value::U32(_) => ElementType::U32,
            Value::S32(_) => ElementType::S32,
            Value::U64(_) => ElementType::U64,
            Value::S64(_) => ElementType::S64,
            Value::Float(_) => ElementType::Float,
        }
    }

    /// Decode one little-endian element
    ///
    /// `bytes` must be exactly `ty.size()` long.
    pub fn read_le(ty: ElementType, bytes: &[u8]) -> Option<Self> {
        let value = match ty {
            ElementType::U8 => Value::U8(bytes.first().copied()?),
            ElementType::S8 => Value::S8(i8::from_le_bytes(bytes.try_into().ok()?)),
            ElementType::U16 => Value::U16(u16::from_le_bytes(bytes.try_into().ok()?)),
            ElementType::S16 => Value::S16(i16::from_le_bytes(bytes.try_into().ok()?)),
            ElementType::U32 => Value::U32(u32::from_le_bytes(bytes.try_into().ok()?)),
            ElementType::S32 => Value::S32(i32::from_le_bytes(bytes.try_into().ok()?)),
            ElementType::U64 => Value::U64(u64::from_le_bytes(bytes.try_into().ok()?)),
            ElementType::S64 => Value::S64(i64::from_le_bytes(bytes.try_into().ok()?)),
            ElementType::Float => Value::Float(f32::from_le_bytes(bytes.try_into().ok()?)),
        };
        Some(value)
    }

    /// Encode as little-endian into the front of `out`
    ///
    /// Returns the number of bytes written, or `None` if `out` is too short.
    pub fn write_le(&self, out: &mut [u8]) -> Option<usize> {
        let size = self.element_type().size();
        let dst = out.get_mut(..size)?;
        match *self {
            Value::U8(v) => dst.copy_from_slice(&v.to_le_bytes()),
            Value::S8(v) => dst.copy_from_slice(&v.to_le_bytes()),
            Value::U16(v) => dst.copy_from_slice(&v.to_le_bytes()),
            Value::S16(v) => dst.copy_from_slice(&v.to_le_bytes()),
            Value::U32(v) => dst.copy_from_slice(&v.to_le_bytes()),
            Value::S32(v) => dst.copy_from_slice(&v.to_le_bytes()),
            Value::U64(v) => dst.copy_from_slice(&v.to_le_bytes()),
            Value::S64(v) => dst.copy_from_slice(&v.to_le_bytes()),
            Value::Float(v) => dst.copy_from_slice(&v.to_le_bytes()),
        }
        Some(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_and_sign() {
        assert_eq!(PayloadType::U8.size(), 1);
        assert_eq!(PayloadType::S16.size(), 2);
        assert_eq!(PayloadType::U64.size(), 8);
        assert_eq!(PayloadType::FLOAT.size(), 4);
        assert!(PayloadType::S32.is_signed());
        assert!(!PayloadType::U32.is_signed());
        assert!(!PayloadType::FLOAT.is_signed());
        assert!(PayloadType::FLOAT.is_float());
    }

    #[test]
    fn test_timestamp_flag_is_not_part_of_element() {
        let ty = PayloadType::U16.with_timestamp();
        assert_eq!(ty.raw(), 0x12);
        assert!(ty.has_timestamp());
        assert_eq!(ty.base(), PayloadType::U16);
        assert_eq!(ty.element(), Some(ElementType::U16));
        assert_eq!(ty.size(), 2);
    }

    #[test]
    fn test_unknown_codes() {
        assert_eq!(PayloadType(0x03).element(), None);
        assert_eq!(PayloadType(0x00).element(), None);
        assert_eq!(PayloadType(0x84 | 0x40).element(), None);
    }

    #[test]
    fn test_element_codes_round_trip() {
        for ty in ElementType::ALL {
            assert_eq!(ElementType::from_code(ty.code()), Some(ty));
            assert_eq!(PayloadType::from(ty).element(), Some(ty));
        }
    }

    #[test]
    fn test_signed_values_are_little_endian() {
        let mut buf = [0u8; 4];
        assert_eq!(Value::S16(-2).write_le(&mut buf), Some(2));
        assert_eq!(&buf[..2], &[0xFE, 0xFF]);
        assert_eq!(Value::read_le(ElementType::S16, &buf[..2]), Some(Value::S16(-2)));
    }

    #[test]
    fn test_write_le_rejects_short_buffer() {
        let mut buf = [0u8; 3];
        assert_eq!(Value::U32(1).write_le(&mut buf), None);
    }
}
