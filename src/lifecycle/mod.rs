//! Lifecycle module: listener threads, the controller that starts and
//! joins them, and process signal handling.

mod monitor;
mod shutdown;
mod worker;

pub use monitor::{Monitor, MonitorStatus};
pub use shutdown::ShutdownSignal;
pub use worker::{ListenerState, StateHandle, StopToken, Worker, WorkerError};
