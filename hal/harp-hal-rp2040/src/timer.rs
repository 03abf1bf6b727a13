//! Signal-driven periodic timers
//!
//! A [`TimerControl`] is a static mailbox between the code that arms a
//! timer (through a [`TimerHandle`], the `PeriodicTimer` implementation)
//! and the task that runs it ([`TimerControl::run`]). Running the task on
//! an interrupt executor gives the callback interrupt priority.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker};
use harp_hal::PeriodicTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Command {
    Arm(u32),
    Disarm,
}

/// Mailbox and runner for one periodic timer
pub struct TimerControl {
    command: Signal<CriticalSectionRawMutex, Command>,
}

impl Default for TimerControl {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerControl {
    pub const fn new() -> Self {
        Self {
            command: Signal::new(),
        }
    }

    /// Handle that arms and disarms this timer
    pub fn handle(&'static self) -> TimerHandle {
        TimerHandle {
            control: self,
            armed: false,
        }
    }

    /// Run the timer, calling `on_tick` once per period while armed
    ///
    /// Never returns. Re-arming restarts the period from the moment the
    /// command is seen.
    pub async fn run(&self, mut on_tick: impl FnMut()) -> ! {
        let mut period = None;
        loop {
            let Some(ms) = period else {
                period = self.next_period().await;
                continue;
            };
            let mut ticker = Ticker::every(Duration::from_millis(ms as u64));
            loop {
                let outcome = select(self.command.wait(), ticker.next()).await;
                match outcome {
                    Either::First(command) => {
                        period = Self::period_of(command);
                        break;
                    }
                    Either::Second(()) => on_tick(),
                }
            }
        }
    }

    async fn next_period(&self) -> Option<u32> {
        Self::period_of(self.command.wait().await)
    }

    fn period_of(command: Command) -> Option<u32> {
        match command {
            Command::Arm(ms) if ms > 0 => Some(ms),
            _ => None,
        }
    }
}

/// `PeriodicTimer` implementation over a [`TimerControl`]
#[derive(Clone, Copy)]
pub struct TimerHandle {
    control: &'static TimerControl,
    armed: bool,
}

impl PeriodicTimer for TimerHandle {
    fn arm(&mut self, period_ms: u32) {
        self.control.command.signal(Command::Arm(period_ms));
        self.armed = period_ms > 0;
    }

    fn disarm(&mut self) {
        self.control.command.signal(Command::Disarm);
        self.armed = false;
    }

    fn is_armed(&self) -> bool {
        self.armed
    }
}
