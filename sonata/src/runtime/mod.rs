//! The Sonata runtime.
//!
//! [`SonataRuntime`] ties together the query pipeline, the control-plane
//! distributor, the output feedback loop and the supervised workers.

mod config;
mod error;
mod orchestrator;

pub use config::{process_workers, RuntimeConfig};
pub use error::RuntimeError;
pub use orchestrator::{RuntimeHandle, SonataRuntime};
