//! Sonata - control-plane orchestration for a streaming query runtime
//!
//! This library compiles logical queries into data-plane and stream-processor
//! configuration, delivers that configuration to the fabric and streaming
//! managers, and keeps refining the data plane as output events arrive.
//!
//! # High-Level API
//!
//! [`runtime::SonataRuntime`] wires the pieces together:
//!
//! ```ignore
//! use sonata::config::ConfigFile;
//! use sonata::runtime::{process_workers, RuntimeConfig, SonataRuntime};
//!
//! let file = ConfigFile::load()?;
//! let runtime = SonataRuntime::new(RuntimeConfig::from(&file), collaborators);
//! runtime.run(process_workers(&file), queries).await?;
//! ```

pub mod bootstrap;
pub mod channel;
pub mod config;
pub mod distributor;
pub mod feedback;
pub mod logging;
pub mod pipeline;
pub mod protocol;
pub mod query;
pub mod runtime;
pub mod supervisor;
pub mod workers;

/// Version of the Sonata library and CLI.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
