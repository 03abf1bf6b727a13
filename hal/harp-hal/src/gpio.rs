//! GPIO pin abstractions
//!
//! Provides traits for digital input and output pins, and for edge
//! interrupt registration, that can be implemented by chip-specific HALs.

/// Digital output pin
///
/// Implementations should handle the actual hardware register manipulation
/// for the specific chip.
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Toggle the pin state
    fn toggle(&mut self);

    /// Set the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Check if the pin is currently set high
    fn is_set_high(&self) -> bool;

    /// Check if the pin is currently set low
    fn is_set_low(&self) -> bool {
        !self.is_set_high()
    }
}

/// Digital input pin
///
/// Implementations should handle the actual hardware register reading
/// for the specific chip.
pub trait InputPin {
    /// Check if the pin reads high (logic 1)
    fn is_high(&self) -> bool;

    /// Check if the pin reads low (logic 0)
    fn is_low(&self) -> bool {
        !self.is_high()
    }
}

/// Pin that can be used for both input and output
///
/// Pin-mapped registers read the input level and drive the output level
/// through the same pin.
pub trait IoPin: OutputPin + InputPin {}

// Blanket implementation for types that implement both traits
impl<T: OutputPin + InputPin> IoPin for T {}

/// Signal edge that raises a pin interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Rising,
    Falling,
    Any,
}

/// Edge interrupt registration
///
/// The interrupt handler itself is owned by the implementation; this trait
/// only controls whether edges on the pin are delivered.
pub trait EdgeInterrupt {
    /// Start delivering interrupts for the given edge
    fn listen(&mut self, edge: Edge);

    /// Stop delivering interrupts
    fn unlisten(&mut self);

    /// Check if interrupts are currently delivered
    fn is_listening(&self) -> bool;
}
