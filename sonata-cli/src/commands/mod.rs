//! CLI command implementations.
//!
//! - [`compile`] - Offline compilation of a query file
//! - [`config`] - Configuration management (show, init, path)
//! - [`run`] - Main command (bootstrap workers and push configuration)

pub mod compile;
pub mod config;
pub mod run;
