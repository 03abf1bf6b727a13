//! Register map
//!
//! Addresses 0 to 13 are reserved for the common register set every Harp
//! device exposes. Device-specific registers start at 32.

use harp_hal::{IoPin, TickSource};
use harp_protocol::{ElementType, PayloadType};
use heapless::FnvIndexMap;

use super::{OperationControl, Register, RegisterError, RegisterValue};
use crate::clock::Clock;
use crate::config::{DeviceConfig, MAX_NAME_LEN};

/// Maximum number of registers in one map
pub const MAX_REGISTERS: usize = 32;

/// Common register addresses
pub mod address {
    pub const WHO_AM_I: u8 = 0;
    pub const HW_VERSION_H: u8 = 1;
    pub const HW_VERSION_L: u8 = 2;
    pub const ASSEMBLY_VERSION: u8 = 3;
    pub const HARP_VERSION_H: u8 = 4;
    pub const HARP_VERSION_L: u8 = 5;
    pub const FW_VERSION_H: u8 = 6;
    pub const FW_VERSION_L: u8 = 7;
    pub const TIMESTAMP_SECOND: u8 = 8;
    pub const TIMESTAMP_MICRO: u8 = 9;
    pub const OPERATION_CTRL: u8 = 10;
    pub const RESET_DEV: u8 = 11;
    pub const DEVICE_NAME: u8 = 12;
    pub const SERIAL_NUMBER: u8 = 13;

    /// First address free for device-specific registers
    pub const APP_BASE: u8 = 32;
}

/// Register map construction errors
///
/// These are configuration mistakes and fatal at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MapError {
    /// Address already holds a register
    AddressInUse,
    /// Map capacity exhausted
    MapFull,
    /// Device name longer than the name register allows
    NameTooLong,
}

/// Address to register table
pub struct RegisterMap<P = super::NoPin> {
    registers: FnvIndexMap<u8, Register<P>, MAX_REGISTERS>,
}

impl<P: IoPin> Default for RegisterMap<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: IoPin> RegisterMap<P> {
    /// Create an empty map
    pub fn new() -> Self {
        Self {
            registers: FnvIndexMap::new(),
        }
    }

    /// Create a map holding the common register set
    pub fn with_common(config: &DeviceConfig) -> Result<Self, MapError> {
        use address::*;

        let name = config.device_name.as_bytes();
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(MapError::NameTooLong);
        }
        let name = RegisterValue::from_bytes(ElementType::U8, name)
            .map_err(|_| MapError::NameTooLong)?;

        let mut map = Self::new();
        map.insert(WHO_AM_I, Register::ReadOnly(RegisterValue::u16(config.who_am_i)))?;
        map.insert(HW_VERSION_H, Register::ReadOnly(RegisterValue::u8(config.hw_version.major)))?;
        map.insert(HW_VERSION_L, Register::ReadOnly(RegisterValue::u8(config.hw_version.minor)))?;
        map.insert(
            ASSEMBLY_VERSION,
            Register::ReadOnly(RegisterValue::u8(config.assembly_version)),
        )?;
        map.insert(
            HARP_VERSION_H,
            Register::ReadOnly(RegisterValue::u8(config.harp_version.major)),
        )?;
        map.insert(
            HARP_VERSION_L,
            Register::ReadOnly(RegisterValue::u8(config.harp_version.minor)),
        )?;
        map.insert(FW_VERSION_H, Register::ReadOnly(RegisterValue::u8(config.fw_version.major)))?;
        map.insert(FW_VERSION_L, Register::ReadOnly(RegisterValue::u8(config.fw_version.minor)))?;
        map.insert(TIMESTAMP_SECOND, Register::TimestampSeconds)?;
        map.insert(TIMESTAMP_MICRO, Register::TimestampMicros)?;
        map.insert(
            OPERATION_CTRL,
            Register::OperationControl(OperationControl(config.operation_control)),
        )?;
        map.insert(RESET_DEV, Register::ReadWrite(RegisterValue::u8(0)))?;
        map.insert(DEVICE_NAME, Register::ReadWrite(name))?;
        map.insert(
            SERIAL_NUMBER,
            Register::ReadWrite(RegisterValue::u16(config.serial_number)),
        )?;
        Ok(map)
    }

    /// Add a register at a free address
    pub fn insert(&mut self, address: u8, register: Register<P>) -> Result<(), MapError> {
        if self.registers.contains_key(&address) {
            return Err(MapError::AddressInUse);
        }
        self.registers
            .insert(address, register)
            .map_err(|_| MapError::MapFull)?;
        Ok(())
    }

    pub fn get(&self, address: u8) -> Result<&Register<P>, RegisterError> {
        self.registers
            .get(&address)
            .ok_or(RegisterError::UnknownAddress)
    }

    pub fn get_mut(&mut self, address: u8) -> Result<&mut Register<P>, RegisterError> {
        self.registers
            .get_mut(&address)
            .ok_or(RegisterError::UnknownAddress)
    }

    pub fn contains(&self, address: u8) -> bool {
        self.registers.contains_key(&address)
    }

    /// Number of registers
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Read the register at `address` as `ty`
    pub fn read<T: TickSource>(
        &self,
        address: u8,
        ty: PayloadType,
        clock: &Clock<T>,
    ) -> Result<RegisterValue, RegisterError> {
        self.get(address)?.read(ty, clock)
    }

    /// Write the register at `address` as `ty`
    pub fn write<T: TickSource>(
        &mut self,
        address: u8,
        ty: PayloadType,
        payload: &[u8],
        clock: &Clock<T>,
    ) -> Result<(), RegisterError> {
        self.get_mut(address)?.write(ty, payload, clock)
    }

    /// Replace a stored value from device-side code
    ///
    /// Skips the read-only check, so firmware can publish state through
    /// read-only registers. The element type must not change.
    pub fn store(&mut self, address: u8, value: RegisterValue) -> Result<(), RegisterError> {
        match self.get_mut(address)? {
            Register::ReadOnly(stored) | Register::ReadWrite(stored) => {
                if stored.element() != value.element() {
                    return Err(RegisterError::TypeMismatch);
                }
                *stored = value;
                Ok(())
            }
            _ => Err(RegisterError::ReadOnly),
        }
    }

    /// Current operational control value
    pub fn operation_control(&self) -> OperationControl {
        match self.registers.get(&address::OPERATION_CTRL) {
            Some(Register::OperationControl(ctrl)) => *ctrl,
            _ => OperationControl::default(),
        }
    }
}
