//! Signal-driven edge watchers
//!
//! Same split as the timers: an [`EdgeHandle`] implements
//! `EdgeInterrupt` by posting commands, and [`EdgeControl::run`] owns the
//! input pin and waits for the requested edge.

use embassy_futures::select::{select, Either};
use embassy_rp::gpio::Input;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use harp_hal::{Edge, EdgeInterrupt};

/// Mailbox and runner for one edge-triggered input
pub struct EdgeControl {
    command: Signal<CriticalSectionRawMutex, Option<Edge>>,
}

impl Default for EdgeControl {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeControl {
    pub const fn new() -> Self {
        Self {
            command: Signal::new(),
        }
    }

    /// Handle that enables and disables edge delivery
    pub fn handle(&'static self) -> EdgeHandle {
        EdgeHandle {
            control: self,
            edge: None,
        }
    }

    /// Watch `pin`, calling `on_edge` with the new level after every
    /// requested edge while listening
    pub async fn run(&self, mut pin: Input<'static>, mut on_edge: impl FnMut(bool)) -> ! {
        let mut edge = None;
        loop {
            let Some(current) = edge else {
                edge = self.command.wait().await;
                continue;
            };
            let outcome = select(self.command.wait(), wait_for(&mut pin, current)).await;
            match outcome {
                Either::First(next) => edge = next,
                Either::Second(()) => on_edge(pin.is_high()),
            }
        }
    }
}

async fn wait_for(pin: &mut Input<'static>, edge: Edge) {
    match edge {
        Edge::Rising => pin.wait_for_rising_edge().await,
        Edge::Falling => pin.wait_for_falling_edge().await,
        Edge::Any => pin.wait_for_any_edge().await,
    }
}

/// `EdgeInterrupt` implementation over an [`EdgeControl`]
#[derive(Clone, Copy)]
pub struct EdgeHandle {
    control: &'static EdgeControl,
    edge: Option<Edge>,
}

impl EdgeInterrupt for EdgeHandle {
    fn listen(&mut self, edge: Edge) {
        self.control.command.signal(Some(edge));
        self.edge = Some(edge);
    }

    fn unlisten(&mut self) {
        self.control.command.signal(None);
        self.edge = None;
    }

    fn is_listening(&self) -> bool {
        self.edge.is_some()
    }
}
