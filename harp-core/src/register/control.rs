//! Operational control register (address 10)
//!
//! ```text
//!   7          6            5           4          3     2    1   0
//! ┌──────────┬────────────┬───────────┬──────────┬──────┬───┬───────┐
//! │ ALIVE_EN │ OPLEDEN    │ VISUALEN  │ MUTE_RPL │ DUMP │ - │ MODE  │
//! └──────────┴────────────┴───────────┴──────────┴──────┴───┴───────┘
//! ```

/// Operating mode (bits 0-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OperationMode {
    Standby = 0,
    Active = 1,
    /// Undefined by the protocol
    Reserved = 2,
    Speed = 3,
}

impl OperationMode {
    /// Indicator blink interval for this mode
    pub const fn blink_interval_ms(self) -> u32 {
        match self {
            OperationMode::Standby => 2000,
            OperationMode::Active => 1000,
            OperationMode::Reserved => 50,
            OperationMode::Speed => 500,
        }
    }
}

/// Operational control bit field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OperationControl(pub u8);

impl OperationControl {
    const MODE_MASK: u8 = 0x03;
    pub const DUMP: u8 = 0x08;
    pub const MUTE_REPLY: u8 = 0x10;
    pub const VISUAL_ENABLE: u8 = 0x20;
    pub const INDICATOR_ENABLE: u8 = 0x40;
    pub const HEARTBEAT_ENABLE: u8 = 0x80;

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn mode(self) -> OperationMode {
        match self.0 & Self::MODE_MASK {
            0 => OperationMode::Standby,
            1 => OperationMode::Active,
            2 => OperationMode::Reserved,
            _ => OperationMode::Speed,
        }
    }

    /// Any mode other than standby
    pub const fn is_running(self) -> bool {
        !matches!(self.mode(), OperationMode::Standby)
    }

    pub const fn dump(self) -> bool {
        self.0 & Self::DUMP != 0
    }

    /// Successful replies are suppressed
    pub const fn mute_reply(self) -> bool {
        self.0 & Self::MUTE_REPLY != 0
    }

    /// Indicator blinks to show the mode
    pub const fn visual_enable(self) -> bool {
        self.0 & Self::VISUAL_ENABLE != 0
    }

    /// Indicator output is driven at all
    pub const fn indicator_enable(self) -> bool {
        self.0 & Self::INDICATOR_ENABLE != 0
    }

    pub const fn heartbeat_enable(self) -> bool {
        self.0 & Self::HEARTBEAT_ENABLE != 0
    }
}
