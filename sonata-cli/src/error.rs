//! CLI error handling with user-friendly messages.

use std::fmt;
use std::path::PathBuf;
use std::process;

use sonata::config::ConfigFileError;
use sonata::pipeline::PipelineError;
use sonata::query::QueryFileError;
use sonata::runtime::RuntimeError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be read or written
    Config(ConfigFileError),
    /// Query file could not be loaded
    Queries(QueryFileError),
    /// Offline compilation failed
    Compile(PipelineError),
    /// The orchestrator stopped with an error
    Runtime(RuntimeError),
    /// Failed to start the async runtime
    AsyncRuntime(std::io::Error),
    /// Failed to write compiled output
    Output(String),
    /// Configuration file already exists
    ConfigExists(PathBuf),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Runtime(e) if e.stage() == "bootstrap" => {
                eprintln!();
                eprintln!("Common issues:");
                eprintln!("  1. Manager command missing: set `command` in [fm_conf] and [sm_conf]");
                eprintln!("  2. Socket in use: check fm_socket, sm_socket and op_socket in [runtime]");
                eprintln!("  3. Slow manager start: raise readiness_timeout_secs in [bootstrap]");
            }
            CliError::Config(_) => {
                eprintln!();
                eprintln!("Run 'sonata config path' to locate the configuration file.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Queries(e) => write!(f, "{}", e),
            CliError::Compile(e) => write!(f, "Compilation failed ({} stage): {}", e.stage(), e),
            CliError::Runtime(e) => write!(f, "Runtime failed ({} stage): {}", e.stage(), e),
            CliError::AsyncRuntime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Output(msg) => write!(f, "Failed to write output: {}", msg),
            CliError::ConfigExists(path) => {
                write!(f, "Configuration file already exists: {}", path.display())
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Queries(e) => Some(e),
            CliError::Compile(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::AsyncRuntime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<QueryFileError> for CliError {
    fn from(e: QueryFileError) -> Self {
        CliError::Queries(e)
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        CliError::Compile(e)
    }
}

impl From<RuntimeError> for CliError {
    fn from(e: RuntimeError) -> Self {
        CliError::Runtime(e)
    }
}
