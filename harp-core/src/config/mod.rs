//! Device configuration
//!
//! Identity and tunables for a Harp device. The firmware builds one of
//! these at compile time from its `device.toml`.

/// Maximum device name length in bytes
pub const MAX_NAME_LEN: usize = 25;

/// Default heartbeat period
pub const DEFAULT_HEARTBEAT_PERIOD_MS: u32 = 1000;

/// Two-byte version number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

/// Transport latency compensation applied by the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    /// Added to every reading (µs)
    pub read_compensation_us: u32,
    /// Added to the target of a rebase, covering the time the request
    /// spent on the wire (µs)
    pub write_compensation_us: u32,
}

impl ClockConfig {
    /// No compensation
    pub const fn exact() -> Self {
        Self {
            read_compensation_us: 0,
            write_compensation_us: 0,
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            read_compensation_us: 161,
            write_compensation_us: 170,
        }
    }
}

/// Device identity and behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    /// Device type identifier (register 0)
    pub who_am_i: u16,
    /// Hardware version (registers 1-2)
    pub hw_version: Version,
    /// Assembly version (register 3)
    pub assembly_version: u8,
    /// Harp protocol version (registers 4-5)
    pub harp_version: Version,
    /// Firmware version (registers 6-7)
    pub fw_version: Version,
    /// Serial number (register 13)
    pub serial_number: u16,
    /// Device name (register 12), at most [`MAX_NAME_LEN`] bytes
    pub device_name: &'static str,
    /// Operational control value at power-up (register 10)
    pub operation_control: u8,
    /// Heartbeat event period
    pub heartbeat_period_ms: u32,
    /// Clock latency compensation
    pub clock: ClockConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            who_am_i: 0,
            hw_version: Version::new(1, 0),
            assembly_version: 0,
            harp_version: Version::new(1, 0),
            fw_version: Version::new(0, 1),
            serial_number: 0,
            device_name: "Harp Device",
            operation_control: 0,
            heartbeat_period_ms: DEFAULT_HEARTBEAT_PERIOD_MS,
            clock: ClockConfig::default(),
        }
    }
}
