//! Embassy async tasks
//!
//! Transport, dispatch and indicator tasks run on the thread executor.
//! Heartbeat and edge runners go on the interrupt executor so event
//! timestamps are taken close to the trigger.

pub mod blink;
pub mod dispatch;
pub mod events;
pub mod serial_rx;
pub mod serial_tx;

pub use blink::blink_task;
pub use dispatch::dispatch_task;
pub use events::{heartbeat_task, input_edge_task, status_task};
pub use serial_rx::serial_rx_task;
pub use serial_tx::serial_tx_task;
