//! Device orchestrator
//!
//! [`Device`] owns the clock, the register map, the receive and transmit
//! queues and the event table. It is shared by reference between the
//! cooperative tasks (receive, transmit, dispatch, indicator) and the
//! interrupt tier that fires events, so every method takes `&self` and
//! interior state sits behind blocking mutexes of the raw mutex `M`.
//!
//! Data flow:
//! ```text
//! bytes ─► FrameParser ─► rx queue ─► dispatch_next ─► tx queue ─► bytes
//!                                                         ▲
//!                              fire / service_events ─────┘
//! ```

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use harp_hal::{IoPin, OutputPin, TickSource, UartRx, UartTx};
use harp_protocol::frame::{FIXED_HEADER_SIZE, TIMESTAMP_SIZE};
use harp_protocol::{
    payload_offset, Frame, FrameError, FrameParser, MessageType, PayloadType,
    MAX_FRAME_SIZE,
};
use heapless::Vec;

use crate::clock::Clock;
use crate::config::DeviceConfig;
use crate::event::{frame_overhead, Event, EventClass, EventId, Trigger, TriggerBinder, MAX_EVENTS};
use crate::queue::{FrameQueue, DEFAULT_QUEUE_CAPACITY};
use crate::register::{
    address, MapError, NoPin, OperationControl, Register, RegisterError, RegisterMap,
    RegisterValue,
};

/// Device construction errors
///
/// Configuration mistakes, fatal at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SetupError {
    /// Register map rejected a register
    Map(MapError),
    /// Event frame template cannot be built
    Frame(FrameError),
    /// Event source register is missing
    Register(RegisterError),
    /// Event table capacity exhausted
    EventTableFull,
}

impl From<MapError> for SetupError {
    fn from(err: MapError) -> Self {
        SetupError::Map(err)
    }
}

impl From<FrameError> for SetupError {
    fn from(err: FrameError) -> Self {
        SetupError::Frame(err)
    }
}

impl From<RegisterError> for SetupError {
    fn from(err: RegisterError) -> Self {
        SetupError::Register(err)
    }
}

/// Successful register access inside dispatch
struct Access {
    value: RegisterValue,
    control: Option<OperationControl>,
}

/// Harp device
///
/// - `M`: raw mutex guarding shared state (`CriticalSectionRawMutex` on
///   hardware, `NoopRawMutex` in single-threaded hosts)
/// - `T`: tick source behind the clock
/// - `L`: indicator LED
/// - `B`: trigger binder for events
/// - `P`: pin type of pin-mapped registers
/// - `RX`, `TX`: queue capacities
pub struct Device<
    M: RawMutex,
    T: TickSource,
    L: OutputPin,
    B: TriggerBinder,
    P: IoPin = NoPin,
    const RX: usize = DEFAULT_QUEUE_CAPACITY,
    const TX: usize = DEFAULT_QUEUE_CAPACITY,
> {
    clock: Clock<T>,
    registers: Mutex<M, RefCell<RegisterMap<P>>>,
    rx: FrameQueue<M, RX>,
    tx: FrameQueue<M, TX>,
    events: Vec<Event, MAX_EVENTS>,
    indicator: Mutex<M, RefCell<L>>,
    binder: Mutex<M, RefCell<B>>,
}

impl<M, T, L, B, P, const RX: usize, const TX: usize> Device<M, T, L, B, P, RX, TX>
where
    M: RawMutex,
    T: TickSource,
    L: OutputPin,
    B: TriggerBinder,
    P: IoPin,
{
    /// Create a device with the common registers and the heartbeat event
    ///
    /// The initial operational control value is applied immediately.
    pub fn new(
        config: &DeviceConfig,
        source: T,
        indicator: L,
        binder: B,
    ) -> Result<Self, SetupError> {
        let registers = RegisterMap::with_common(config)?;
        let mut device = Self {
            clock: Clock::new(source, config.clock),
            registers: Mutex::new(RefCell::new(registers)),
            rx: FrameQueue::new(),
            tx: FrameQueue::new(),
            events: Vec::new(),
            indicator: Mutex::new(RefCell::new(indicator)),
            binder: Mutex::new(RefCell::new(binder)),
        };
        device.add_event(
            address::TIMESTAMP_SECOND,
            Trigger::Timer {
                period_ms: config.heartbeat_period_ms,
            },
            EventClass::Heartbeat,
        )?;
        device.apply_operation_control(device.operation_control());
        Ok(device)
    }

    /// Device clock
    pub fn clock(&self) -> &Clock<T> {
        &self.clock
    }

    /// Add a device-specific register
    pub fn add_register(&mut self, address: u8, register: Register<P>) -> Result<(), MapError> {
        self.registers.get_mut().get_mut().insert(address, register)
    }

    /// Add an event reporting the register at `address`
    ///
    /// The event reports the register's type and length as they are now,
    /// so the register must already exist. The event's enable state is
    /// brought in line with the control register immediately.
    pub fn add_event(
        &mut self,
        address: u8,
        trigger: Trigger,
        class: EventClass,
    ) -> Result<EventId, SetupError> {
        let registers = self.registers.get_mut().get_mut();
        let register = registers.get(address)?;
        let event = Event::bound(address, register.element_type(), register.len(), trigger, class)?;
        self.push_event(event)
    }

    /// Add a fixed-frame event naming `address`
    pub fn add_fixed_event(
        &mut self,
        address: u8,
        payload_type: PayloadType,
        trigger: Trigger,
        class: EventClass,
    ) -> Result<EventId, SetupError> {
        let event = Event::fixed(address, payload_type, trigger, class)?;
        self.push_event(event)
    }

    fn push_event(&mut self, event: Event) -> Result<EventId, SetupError> {
        self.events
            .push(event)
            .map_err(|_| SetupError::EventTableFull)?;
        let id = self.events.len() - 1;
        let ctrl = self.operation_control();
        self.sync_event(id, ctrl);
        Ok(id)
    }

    /// Configured events, indexed by [`EventId`]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Current operational control value
    pub fn operation_control(&self) -> OperationControl {
        self.registers
            .lock(|cell| cell.borrow().operation_control())
    }

    /// Run `f` with shared access to the register map
    pub fn with_registers<R>(&self, f: impl FnOnce(&RegisterMap<P>) -> R) -> R {
        self.registers.lock(|cell| f(&cell.borrow()))
    }

    /// Run `f` with exclusive access to the register map
    pub fn with_registers_mut<R>(&self, f: impl FnOnce(&mut RegisterMap<P>) -> R) -> R {
        self.registers.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Queue a received request
    pub fn accept(&self, frame: Frame) {
        if let Some(dropped) = self.rx.push(frame) {
            warn!("rx queue full, dropped request for register {}", dropped.address());
        }
    }

    /// Queue a frame for transmission
    pub fn enqueue(&self, frame: Frame) {
        if let Some(dropped) = self.tx.push(frame) {
            warn!("tx queue full, dropped frame for register {}", dropped.address());
        }
    }

    /// Oldest frame waiting for transmission
    pub fn next_outgoing(&self) -> Option<Frame> {
        self.tx.pop()
    }

    /// Requests waiting for dispatch
    pub fn pending_requests(&self) -> usize {
        self.rx.len()
    }

    /// Frames waiting for transmission
    pub fn pending_replies(&self) -> usize {
        self.tx.len()
    }

    /// Handle a trigger for event `id`
    ///
    /// Safe to call from interrupt context: no allocation, bounded work.
    /// Does nothing while the event is disabled.
    pub fn fire(&self, id: EventId) {
        let Some(event) = self.events.get(id) else {
            return;
        };
        if !event.is_enabled() {
            return;
        }
        if event.trigger().is_deferred() {
            event.mark_pending();
        } else {
            self.emit(event);
        }
    }

    /// Render deferred events that fired since the last call
    pub fn service_events(&self) -> usize {
        let mut rendered = 0;
        for event in self.events.iter() {
            if event.take_pending() && event.is_enabled() {
                self.emit(event);
                rendered += 1;
            }
        }
        rendered
    }

    fn emit(&self, event: &Event) {
        let frame = self
            .registers
            .lock(|cell| event.render(&cell.borrow(), &self.clock));
        match frame {
            Ok(frame) => self.enqueue(frame),
            Err(err) => warn!("event for register {} failed: {}", event.template().address(), err),
        }
    }

    /// Process one queued request
    ///
    /// Returns `false` if the receive queue was empty.
    pub fn dispatch_next(&self) -> bool {
        let Some(request) = self.rx.pop() else {
            return false;
        };
        trace!("dispatch {}", request);
        if let Some(reply) = self.process(&request) {
            self.enqueue(reply);
        }
        true
    }

    /// Build the reply for one request, or `None` if it is muted
    pub fn process(&self, request: &Frame) -> Option<Frame> {
        let result = self.access(request);
        let reply = match result {
            Ok(access) => {
                if let Some(ctrl) = access.control {
                    self.apply_operation_control(ctrl);
                }
                // MUTE_RPL: the host asked for no replies to successful commands
                if self.operation_control().mute_reply() {
                    return None;
                }
                self.success_reply(request, &access.value)
            }
            Err(err) => {
                warn!("register {} access failed: {}", request.address(), err);
                self.error_reply(request)
            }
        };
        match reply {
            Ok(frame) => Some(frame),
            Err(err) => {
                warn!("reply for register {} not built: {}", request.address(), err);
                None
            }
        }
    }

    /// Write (for WRITE requests) then read the addressed register
    fn access(&self, request: &Frame) -> Result<Access, RegisterError> {
        let address = request.address();
        let ty = request.payload_type();
        let is_write = request.message_type() == MessageType::Write.code();

        self.registers.lock(|cell| -> Result<Access, RegisterError> {
            let mut registers = cell.borrow_mut();
            if is_write {
                registers.write(address, ty, request.payload_bytes(), &self.clock)?;
            }
            let value = registers.read(address, ty, &self.clock)?;
            let control = match registers.get(address)? {
                Register::OperationControl(ctrl) if is_write => Some(*ctrl),
                _ => None,
            };
            Ok(Access { value, control })
        })
    }

    fn success_reply(&self, request: &Frame, value: &RegisterValue) -> Result<Frame, FrameError> {
        let length = value.as_bytes().len() + frame_overhead(true);
        let length = u8::try_from(length).map_err(|_| FrameError::PayloadTooLarge)?;
        let mut reply = Frame::new(
            request.message_type(),
            length,
            request.address(),
            request.payload_type(),
            Some(self.clock.read()),
        )?;
        reply.set_payload_bytes(value.as_bytes())?;
        reply.finalize_checksum();
        Ok(reply)
    }

    fn error_reply(&self, request: &Frame) -> Result<Frame, FrameError> {
        let growth = if request.payload_type().has_timestamp() {
            0
        } else {
            TIMESTAMP_SIZE as u8
        };
        let echo = if request.message_type() == MessageType::Write.code() {
            echo_bytes(request)
        } else {
            &[]
        };
        let floor = u8::try_from(echo.len() + frame_overhead(true)).unwrap_or(u8::MAX);
        let length = request.length().saturating_add(growth).max(floor);
        let mut reply = Frame::new(
            request.message_type() | MessageType::ERROR,
            length,
            request.address(),
            request.payload_type(),
            Some(self.clock.read()),
        )?;
        if !echo.is_empty() {
            let room = reply.len() - payload_offset(reply.payload_type()) - 1;
            reply.set_payload_bytes(&echo[..echo.len().min(room)])?;
        }
        reply.finalize_checksum();
        Ok(reply)
    }

    /// Bring the indicator and event enables in line with `ctrl`
    pub fn apply_operation_control(&self, ctrl: OperationControl) {
        debug!("operation control {=u8:#x}", ctrl.bits());
        self.indicator
            .lock(|cell| cell.borrow_mut().set_state(ctrl.indicator_enable()));
        for id in 0..self.events.len() {
            self.sync_event(id, ctrl);
        }
    }

    fn sync_event(&self, id: EventId, ctrl: OperationControl) {
        let Some(event) = self.events.get(id) else {
            return;
        };
        let enabled = match event.class() {
            EventClass::Heartbeat => ctrl.is_running() && ctrl.heartbeat_enable(),
            EventClass::Standard => ctrl.is_running(),
        };
        if !event.set_enabled(enabled) {
            return;
        }
        self.binder.lock(|cell| {
            let mut binder = cell.borrow_mut();
            if enabled {
                debug!("arm event {}", id);
                binder.arm(id, event.trigger());
            } else {
                debug!("disarm event {}", id);
                binder.disarm(id, event.trigger());
            }
        });
    }

    /// Advance the mode indicator by one step
    ///
    /// Returns the delay before the next step in milliseconds.
    pub fn indicator_step(&self) -> u32 {
        let ctrl = self.operation_control();
        self.indicator.lock(|cell| {
            let mut led = cell.borrow_mut();
            if !ctrl.visual_enable() {
                led.set_high();
            } else if ctrl.indicator_enable() {
                led.toggle();
            }
        });
        ctrl.mode().blink_interval_ms()
    }

    /// Run `f` with the indicator pin
    pub fn with_indicator<R>(&self, f: impl FnOnce(&L) -> R) -> R {
        self.indicator.lock(|cell| f(&cell.borrow()))
    }

    /// Feed every byte the transport has ready into `parser`
    ///
    /// Reads never cross a parser stage boundary. Completed frames go to
    /// the receive queue; framing errors are logged and dropped. Returns
    /// the number of frames accepted.
    pub fn receive_from<R: UartRx>(
        &self,
        uart: &mut R,
        parser: &mut FrameParser,
    ) -> Result<usize, R::Error> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let mut accepted = 0;
        loop {
            let want = parser.needed().min(buf.len());
            let n = uart.read_available(&mut buf[..want])?;
            if n == 0 {
                return Ok(accepted);
            }
            accepted += self.receive(&buf[..n], parser);
        }
    }

    /// Feed received bytes through `parser`, queueing every complete frame
    ///
    /// Returns the number of frames accepted. Malformed input is logged
    /// and dropped; the parser resynchronizes on its own.
    pub fn receive(&self, bytes: &[u8], parser: &mut FrameParser) -> usize {
        let mut accepted = 0;
        let mut offset = 0;
        while offset < bytes.len() {
            let (used, outcome) = parser.feed_bytes(&bytes[offset..]);
            offset += used;
            match outcome {
                Ok(Some(frame)) => {
                    trace!("rx {}", frame);
                    self.accept(frame);
                    accepted += 1;
                }
                Ok(None) => {}
                Err(err) => warn!("framing error: {}", err),
            }
        }
        accepted
    }

    /// Write every queued outgoing frame to the transport, oldest first
    pub fn transmit_to<W: UartTx>(&self, uart: &mut W) -> Result<usize, W::Error> {
        let mut sent = 0;
        while let Some(frame) = self.next_outgoing() {
            uart.write_blocking(frame.as_bytes())?;
            sent += 1;
        }
        if sent > 0 {
            uart.flush()?;
        }
        Ok(sent)
    }
}

/// Payload bytes of a request, as echoed in an ERROR reply
///
/// A request whose LENGTH is too short for the timestamp its payload type
/// announces has everything after the fixed header taken as payload.
fn echo_bytes(request: &Frame) -> &[u8] {
    if request.len() > payload_offset(request.payload_type()) {
        request.payload_bytes()
    } else {
        &request.as_bytes()[FIXED_HEADER_SIZE..request.len() - 1]
    }
}
