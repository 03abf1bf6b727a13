//! Pin allocation for config-driven hardware setup
//!
//! Pin numbers come from the firmware's `device.toml`, so pins are handed
//! out by number at runtime instead of by peripheral name.

use embassy_rp::gpio::AnyPin;
use embassy_rp::peripherals::{PIN_0, PIN_1, UART0};
use embassy_rp::{Peri, Peripherals};

/// Number of user GPIOs on the RP2040
pub const PIN_COUNT: usize = 30;

/// Error when requesting a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError {
    /// Pin number out of range (0-29 valid)
    InvalidPin,
    /// Pin already taken
    AlreadyTaken,
}

/// Peripherals kept out of the bank: the host link UART and its pins
pub struct Board {
    pub uart0: Peri<'static, UART0>,
    pub uart0_tx: Peri<'static, PIN_0>,
    pub uart0_rx: Peri<'static, PIN_1>,
}

macro_rules! bank {
    ($p:ident: $($pin:ident),* $(,)?) => {
        [None, None, $(Some($p.$pin.into::<AnyPin>())),*]
    };
}

/// All GPIO pins, taken by number
pub struct PinBank {
    pins: [Option<Peri<'static, AnyPin>>; PIN_COUNT],
}

impl PinBank {
    /// Move every GPIO except the host link pins into a bank
    pub fn split(p: Peripherals) -> (Self, Board) {
        let pins = bank!(p:
            PIN_2, PIN_3, PIN_4, PIN_5, PIN_6, PIN_7, PIN_8, PIN_9,
            PIN_10, PIN_11, PIN_12, PIN_13, PIN_14, PIN_15, PIN_16, PIN_17, PIN_18, PIN_19,
            PIN_20, PIN_21, PIN_22, PIN_23, PIN_24, PIN_25, PIN_26, PIN_27, PIN_28, PIN_29,
        );
        let board = Board {
            uart0: p.UART0,
            uart0_tx: p.PIN_0,
            uart0_rx: p.PIN_1,
        };
        (Self { pins }, board)
    }

    /// Take a pin by number
    pub fn take(&mut self, pin: u8) -> Result<Peri<'static, AnyPin>, PinError> {
        self.pins
            .get_mut(pin as usize)
            .ok_or(PinError::InvalidPin)?
            .take()
            .ok_or(PinError::AlreadyTaken)
    }
}
