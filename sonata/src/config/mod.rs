//! Orchestrator configuration.
//!
//! Loaded from an INI file (default `~/.sonata/config.ini`); any missing
//! section or key falls back to the defaults in [`defaults`].
//!
//! # Example
//!
//! ```ignore
//! use sonata::config::ConfigFile;
//!
//! let config = ConfigFile::load()?;
//! println!("fabric manager at {:?}", config.fabric_manager.endpoint);
//! ```

pub mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    BootstrapSettings, ConfigFile, DistributorSettings, FeedbackSettings, LoggingSettings,
    PipelineSettings, RuntimeSettings, WorkerSettings,
};
