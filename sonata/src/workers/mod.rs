//! Worker implementations.
//!
//! - [`ProcessWorker`] - a manager or emitter in its own process
//! - [`LoopbackEndpoint`] - an in-process stand-in for a manager
//! - [`OutputListener`] - the output feedback loop

mod loopback;
mod options;
mod output;
mod process;

pub use loopback::{LoopbackEndpoint, ReceivedMessage};
pub use options::{WorkerOptions, ENV_BUFFER_SIZE, ENV_CREDENTIALS, ENV_ENDPOINT};
pub use output::OutputListener;
pub use process::{ProcessWorker, DEFAULT_PROBE_INTERVAL};
