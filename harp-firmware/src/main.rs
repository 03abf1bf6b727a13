//! Harp device firmware
//!
//! Main firmware binary for RP2040-based Harp devices. The register map,
//! event table and pin assignments come from `device.toml`, compiled in
//! by the build script.
//!
//! Executors:
//! - thread executor: host link RX/TX, request dispatch, indicator blink,
//!   recurring status events
//! - interrupt executor (SWI_IRQ_1): heartbeat timer and input edge
//!   watcher, so their frames are stamped at interrupt priority

#![no_std]
#![no_main]

use defmt::*;
use defmt::panic;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Flex, Input, Level, Output, Pull};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Uart};
use harp_hal::uart::UartConfig;
use harp_hal_rp2040::uart::rp_config;
use harp_hal_rp2040::{DigitalIo, Indicator, PinBank};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

mod config {
    include!(concat!(env!("OUT_DIR"), "/device_config.rs"));
}
mod device;
mod tasks;
mod triggers;

use crate::device::HarpDevice;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// UART buffers hold a few full frames each way
static TX_BUF: StaticCell<[u8; 1024]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 1024]> = StaticCell::new();

static DEVICE: StaticCell<HarpDevice> = StaticCell::new();

static EXECUTOR_EVENTS: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_EVENTS.on_interrupt()
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!(
        "Harp firmware starting: {} (WHO_AM_I {})",
        config::DEVICE.device_name,
        config::DEVICE.who_am_i
    );

    let p = embassy_rp::init(Default::default());
    let (mut bank, board) = PinBank::split(p);

    let indicator = match bank.take(config::INDICATOR_PIN) {
        Ok(pin) => Indicator::new(Output::new(pin, Level::Low)),
        Err(e) => panic!("indicator pin {}: {}", config::INDICATOR_PIN, e),
    };
    let digital_io = match bank.take(config::DIGITAL_IO_PIN) {
        Ok(pin) => DigitalIo::new(Flex::new(pin), false),
        Err(e) => panic!("digital io pin {}: {}", config::DIGITAL_IO_PIN, e),
    };
    let input = match bank.take(config::EDGE_INPUT_PIN) {
        Ok(pin) => Input::new(pin, Pull::Down),
        Err(e) => panic!("edge input pin {}: {}", config::EDGE_INPUT_PIN, e),
    };
    info!("Pins assigned");

    let device = match device::build(indicator, digital_io, input.is_high()) {
        Ok(device) => DEVICE.init(device),
        Err(e) => panic!("device setup failed: {}", e),
    };
    info!("Device ready with {} events", device.events().len());

    let uart_config = rp_config(&UartConfig {
        baudrate: config::UART_BAUDRATE,
        ..Default::default()
    });
    let tx_buf = TX_BUF.init([0u8; 1024]);
    let rx_buf = RX_BUF.init([0u8; 1024]);
    let uart = Uart::new_blocking(board.uart0, board.uart0_tx, board.uart0_rx, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();
    info!("UART initialized at {} baud", config::UART_BAUDRATE);

    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let events_spawner = EXECUTOR_EVENTS.start(interrupt::SWI_IRQ_1);
    events_spawner.spawn(tasks::heartbeat_task(device)).unwrap();
    events_spawner
        .spawn(tasks::input_edge_task(input, device))
        .unwrap();

    spawner.spawn(tasks::serial_rx_task(rx, device)).unwrap();
    spawner.spawn(tasks::serial_tx_task(tx, device)).unwrap();
    spawner.spawn(tasks::dispatch_task(device)).unwrap();
    spawner.spawn(tasks::blink_task(device)).unwrap();
    spawner.spawn(tasks::status_task(device)).unwrap();

    info!("All tasks spawned, firmware running");
}
