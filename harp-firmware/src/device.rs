//! Device assembly
//!
//! Builds the Harp device from the generated configuration. Event ids
//! follow registration order, so the constants below must match the
//! order of the calls in [`build`].

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use harp_core::register::address::APP_BASE;
use harp_core::{Device, EventClass, EventId, Register, RegisterValue, SetupError, Trigger};
use harp_hal_rp2040::{DigitalIo, EmbassyTicks, Indicator};
use harp_protocol::PayloadType;

use crate::config;
use crate::triggers::Triggers;

pub type HarpDevice =
    Device<CriticalSectionRawMutex, EmbassyTicks, Indicator, Triggers, DigitalIo>;

/// Pin-mapped digital output
pub const DIGITAL_IO: u8 = APP_BASE;

/// Level of the edge input, refreshed before every edge event
pub const INPUT_STATE: u8 = APP_BASE + 1;

/// Heartbeat, registered by `Device::new`
pub const HEARTBEAT: EventId = 0;
pub const INPUT_EDGE: EventId = 1;
/// Only present when a status period is configured
pub const STATUS: EventId = 2;

pub fn build(
    indicator: Indicator,
    digital_io: DigitalIo,
    input_level: bool,
) -> Result<HarpDevice, SetupError> {
    let mut device = Device::new(&config::DEVICE, EmbassyTicks, indicator, Triggers::new())?;

    device.add_register(DIGITAL_IO, Register::Pin(digital_io))?;
    device.add_register(
        INPUT_STATE,
        Register::ReadOnly(RegisterValue::u8(input_level as u8)),
    )?;

    let edge = device.add_event(
        INPUT_STATE,
        Trigger::Edge(config::EDGE_TRIGGER),
        EventClass::Standard,
    )?;
    debug_assert_eq!(edge, INPUT_EDGE);

    if config::STATUS_PERIOD_MS > 0 {
        let status = device.add_fixed_event(
            INPUT_STATE,
            PayloadType::U8,
            Trigger::Recurring {
                period_ms: config::STATUS_PERIOD_MS,
            },
            EventClass::Standard,
        )?;
        debug_assert_eq!(status, STATUS);
    }

    Ok(device)
}
