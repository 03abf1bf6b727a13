//! GPIO wrappers implementing the `harp-hal` pin traits

use embassy_rp::gpio::{Flex, Level, Output};
use harp_hal::{InputPin, OutputPin};

/// Indicator LED
pub struct Indicator {
    pin: Output<'static>,
}

impl Indicator {
    pub fn new(pin: Output<'static>) -> Self {
        Self { pin }
    }
}

impl OutputPin for Indicator {
    fn set_high(&mut self) {
        self.pin.set_high();
    }

    fn set_low(&mut self) {
        self.pin.set_low();
    }

    fn toggle(&mut self) {
        self.pin.toggle();
    }

    fn is_set_high(&self) -> bool {
        self.pin.is_set_high()
    }
}

/// Bidirectional pin behind a pin-mapped register
///
/// Driven as an output; reads return the pad level.
pub struct DigitalIo {
    pin: Flex<'static>,
}

impl DigitalIo {
    pub fn new(mut pin: Flex<'static>, initial: bool) -> Self {
        pin.set_level(Level::from(initial));
        pin.set_as_output();
        Self { pin }
    }
}

impl OutputPin for DigitalIo {
    fn set_high(&mut self) {
        self.pin.set_high();
    }

    fn set_low(&mut self) {
        self.pin.set_low();
    }

    fn toggle(&mut self) {
        self.pin.toggle();
    }

    fn is_set_high(&self) -> bool {
        self.pin.is_set_high()
    }
}

impl InputPin for DigitalIo {
    fn is_high(&self) -> bool {
        self.pin.is_high()
    }
}
