//! Host doubles for the harp-hal collaborator traits

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use harp_core::{ClockConfig, Device, DeviceConfig, EventId, Trigger, TriggerBinder};
use harp_hal::{OutputPin, TickSource, UartRx, UartTx, TICK_MAX};
use harp_protocol::{Frame, MessageType, PayloadType};

pub const WHO_AM_I: u16 = 0x0478;

/// Tick source over a settable microsecond count
#[derive(Default)]
pub struct SimTicks(pub Cell<u64>);

impl TickSource for SimTicks {
    fn ticks_ms(&self) -> u32 {
        (self.0.get() / 1000) as u32 & TICK_MAX
    }

    fn ticks_us(&self) -> u32 {
        self.0.get() as u32 & TICK_MAX
    }
}

#[derive(Default)]
pub struct MockLed {
    pub on: bool,
    pub toggles: usize,
}

impl OutputPin for MockLed {
    fn set_high(&mut self) {
        self.on = true;
    }

    fn set_low(&mut self) {
        self.on = false;
    }

    fn toggle(&mut self) {
        self.on = !self.on;
        self.toggles += 1;
    }

    fn is_set_high(&self) -> bool {
        self.on
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Armed(EventId, Trigger),
    Disarmed(EventId, Trigger),
}

/// Records arm/disarm calls in a log the test keeps a handle to
#[derive(Default, Clone)]
pub struct RecordingBinder(pub Rc<RefCell<Vec<Binding>>>);

impl RecordingBinder {
    pub fn log(&self) -> Vec<Binding> {
        self.0.borrow().clone()
    }
}

impl TriggerBinder for RecordingBinder {
    fn arm(&mut self, id: EventId, trigger: Trigger) {
        self.0.borrow_mut().push(Binding::Armed(id, trigger));
    }

    fn disarm(&mut self, id: EventId, trigger: Trigger) {
        self.0.borrow_mut().push(Binding::Disarmed(id, trigger));
    }
}

/// Inbound byte stream
#[derive(Default)]
pub struct HostRx(pub VecDeque<u8>);

impl UartRx for HostRx {
    type Error = ();

    fn bytes_available(&self) -> usize {
        self.0.len()
    }

    fn read_blocking(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        if buf.len() > self.0.len() {
            return Err(());
        }
        for slot in buf.iter_mut() {
            *slot = self.0.pop_front().ok_or(())?;
        }
        Ok(buf.len())
    }
}

/// Outbound byte sink
#[derive(Default)]
pub struct HostTx {
    pub bytes: Vec<u8>,
    pub flushes: usize,
}

impl UartTx for HostTx {
    type Error = ();

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), ()> {
        self.bytes.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ()> {
        self.flushes += 1;
        Ok(())
    }
}

pub type TestDevice = Device<NoopRawMutex, SimTicks, MockLed, RecordingBinder>;

pub fn config() -> DeviceConfig {
    DeviceConfig {
        who_am_i: WHO_AM_I,
        serial_number: 42,
        device_name: "Test Device",
        clock: ClockConfig::exact(),
        ..DeviceConfig::default()
    }
}

pub fn device() -> (TestDevice, RecordingBinder) {
    let binder = RecordingBinder::default();
    let device = Device::new(
        &config(),
        SimTicks::default(),
        MockLed::default(),
        binder.clone(),
    )
    .unwrap();
    (device, binder)
}

/// Timestamp-less request with raw payload bytes
pub fn request(message_type: MessageType, address: u8, ty: PayloadType, payload: &[u8]) -> Frame {
    let length = (payload.len() + 4) as u8;
    let mut frame = Frame::new(message_type.code(), length, address, ty, None).unwrap();
    frame.set_payload_bytes(payload).unwrap();
    frame.finalize_checksum();
    frame
}

/// Dispatch one request and return the single reply
pub fn round_trip(device: &TestDevice, frame: Frame) -> Option<Frame> {
    device.accept(frame);
    assert!(device.dispatch_next());
    device.next_outgoing()
}
