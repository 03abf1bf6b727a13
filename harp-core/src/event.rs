//! Event engine
//!
//! An event owns a prebuilt EVENT frame template and an enable flag. When
//! its trigger fires, the bound register is read, the value and the
//! current timestamp are stored into a copy of the template, and the frame
//! is queued for transmission.
//!
//! Timer and edge events do this in the context of the trigger (an
//! interrupt on the device). Recurring events only mark themselves pending
//! there and are rendered later by [`crate::Device::service_events`].
//!
//! The hardware behind a trigger is reached through a [`TriggerBinder`],
//! which arms and disarms it when an event's enable flag changes.

use harp_hal::{Edge, IoPin, TickSource};
use harp_protocol::frame::TIMESTAMP_SIZE;
use harp_protocol::{ElementType, Frame, FrameError, MessageType, PayloadType, Timestamp};
use portable_atomic::{AtomicBool, Ordering};

use crate::clock::Clock;
use crate::register::{RegisterError, RegisterMap};

/// Index of an event in its device's event table
pub type EventId = usize;

/// Maximum number of events per device
pub const MAX_EVENTS: usize = 8;

/// What fires an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    /// Periodic timer, rendered in the timer's context
    Timer { period_ms: u32 },
    /// Pin edge interrupt, rendered in the interrupt's context
    Edge(Edge),
    /// Periodic timer, rendered later from the cooperative loop
    Recurring { period_ms: u32 },
}

impl Trigger {
    /// Rendering is deferred out of the trigger context
    pub const fn is_deferred(&self) -> bool {
        matches!(self, Trigger::Recurring { .. })
    }
}

/// How the control register enables an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventClass {
    /// Enabled when not in standby and the heartbeat bit is set
    Heartbeat,
    /// Enabled when not in standby
    Standard,
}

/// Where an event's payload comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventSource {
    /// Current value of the register at this address
    Register(u8),
    /// Prebuilt timestamp-less frame with an empty payload
    Fixed,
}

/// Arms and disarms the hardware behind event triggers
///
/// Implementations route a fired trigger back to
/// [`crate::Device::fire`] with the same [`EventId`].
pub trait TriggerBinder {
    /// Start delivering `trigger` for event `id`
    fn arm(&mut self, id: EventId, trigger: Trigger);

    /// Stop delivering `trigger` for event `id`
    fn disarm(&mut self, id: EventId, trigger: Trigger);
}

/// A configured event
pub struct Event {
    trigger: Trigger,
    class: EventClass,
    source: EventSource,
    template: Frame,
    enabled: AtomicBool,
    pending: AtomicBool,
}

impl Event {
    /// Event reporting a register of `len` elements of `element`
    pub fn bound(
        address: u8,
        element: ElementType,
        len: usize,
        trigger: Trigger,
        class: EventClass,
    ) -> Result<Self, FrameError> {
        let length = len * element.size() + frame_overhead(true);
        let length = u8::try_from(length).map_err(|_| FrameError::PayloadTooLarge)?;
        let template = Frame::new(
            MessageType::Event.code(),
            length,
            address,
            PayloadType::from(element),
            Some(Timestamp::default()),
        )?;
        Ok(Self::with_template(template, trigger, class, EventSource::Register(address)))
    }

    /// Event sending a fixed frame that only names `address`
    pub fn fixed(
        address: u8,
        payload_type: PayloadType,
        trigger: Trigger,
        class: EventClass,
    ) -> Result<Self, FrameError> {
        let mut template = Frame::new(
            MessageType::Event.code(),
            frame_overhead(false) as u8,
            address,
            payload_type,
            None,
        )?;
        template.finalize_checksum();
        Ok(Self::with_template(template, trigger, class, EventSource::Fixed))
    }

    fn with_template(
        template: Frame,
        trigger: Trigger,
        class: EventClass,
        source: EventSource,
    ) -> Self {
        Self {
            trigger,
            class,
            source,
            template,
            enabled: AtomicBool::new(false),
            pending: AtomicBool::new(false),
        }
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    pub fn class(&self) -> EventClass {
        self.class
    }

    pub fn source(&self) -> EventSource {
        self.source
    }

    /// Frame template as built at configuration
    pub fn template(&self) -> &Frame {
        &self.template
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Set the enable flag, returning whether it changed
    pub fn set_enabled(&self, enabled: bool) -> bool {
        let was = self.enabled.swap(enabled, Ordering::AcqRel);
        if !enabled {
            self.pending.store(false, Ordering::Release);
        }
        was != enabled
    }

    /// Mark a deferred render as due
    pub(crate) fn mark_pending(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Clear and return the pending mark
    pub(crate) fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Build the outgoing frame for one firing
    pub fn render<P: IoPin, T: TickSource>(
        &self,
        registers: &RegisterMap<P>,
        clock: &Clock<T>,
    ) -> Result<Frame, RegisterError> {
        let address = match self.source {
            EventSource::Fixed => return Ok(self.template.clone()),
            EventSource::Register(address) => address,
        };

        let mut frame = self.template.clone();
        let timestamp = clock.read();
        let value = registers.read(address, frame.payload_type(), clock)?;
        frame
            .set_payload_bytes(value.as_bytes())
            .map_err(|_| RegisterError::OutOfRange)?;
        frame
            .set_timestamp(timestamp)
            .map_err(|_| RegisterError::OutOfRange)?;
        frame.finalize_checksum();
        Ok(frame)
    }
}

/// LENGTH of a frame with an empty payload
pub(crate) const fn frame_overhead(timestamped: bool) -> usize {
    // Header after LENGTH (address, port, type) plus checksum
    let base = 4;
    if timestamped {
        base + TIMESTAMP_SIZE
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClockConfig, DeviceConfig};
    use crate::register::address;
    use harp_protocol::Value;

    struct At(u32);

    impl TickSource for At {
        fn ticks_ms(&self) -> u32 {
            self.0 / 1000
        }

        fn ticks_us(&self) -> u32 {
            self.0
        }
    }

    fn map() -> RegisterMap {
        let config = DeviceConfig {
            who_am_i: 0x0456,
            ..DeviceConfig::default()
        };
        RegisterMap::with_common(&config).unwrap()
    }

    #[test]
    fn test_bound_template_layout() {
        let event = Event::bound(
            address::TIMESTAMP_SECOND,
            ElementType::U32,
            1,
            Trigger::Timer { period_ms: 1000 },
            EventClass::Heartbeat,
        )
        .unwrap();
        let frame = event.template();
        assert_eq!(frame.message_type(), 3);
        assert_eq!(frame.length(), 14);
        assert_eq!(frame.len(), 16);
        assert_eq!(frame.port(), 0xFF);
        assert_eq!(frame.payload_type().raw(), 0x14);
    }

    #[test]
    fn test_render_reads_register_and_clock() {
        let clock = Clock::new(At(5_000_320), ClockConfig::exact());
        let event = Event::bound(
            address::WHO_AM_I,
            ElementType::U16,
            1,
            Trigger::Edge(Edge::Rising),
            EventClass::Standard,
        )
        .unwrap();
        let frame = event.render(&map(), &clock).unwrap();
        assert_eq!(frame.timestamp(), Some(Timestamp::new(5, 10)));
        let values: std::vec::Vec<Value> = frame.payload().unwrap().collect();
        assert_eq!(values, [Value::U16(0x0456)]);
        assert!(frame.has_valid_checksum());
    }

    #[test]
    fn test_fixed_template_is_ready_to_send() {
        let event = Event::fixed(
            40,
            PayloadType::U8,
            Trigger::Recurring { period_ms: 250 },
            EventClass::Standard,
        )
        .unwrap();
        let clock = Clock::new(At(0), ClockConfig::exact());
        let frame = event.render(&map(), &clock).unwrap();
        assert_eq!(frame.as_bytes(), &[0x03, 0x04, 40, 0xFF, 0x01, 0x2F]);
    }

    #[test]
    fn test_enable_reports_transitions() {
        let event = Event::fixed(
            40,
            PayloadType::U8,
            Trigger::Recurring { period_ms: 250 },
            EventClass::Standard,
        )
        .unwrap();
        assert!(!event.is_enabled());
        assert!(event.set_enabled(true));
        assert!(!event.set_enabled(true));
        event.mark_pending();
        assert!(event.set_enabled(false));
        assert!(!event.take_pending());
    }

    #[test]
    fn test_deferred_triggers() {
        assert!(Trigger::Recurring { period_ms: 1 }.is_deferred());
        assert!(!Trigger::Timer { period_ms: 1 }.is_deferred());
        assert!(!Trigger::Edge(Edge::Any).is_deferred());
    }
}
