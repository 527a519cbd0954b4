//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete orchestrator configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    /// Output listener address
    pub runtime: RuntimeSettings,
    /// Fabric manager (`[fm_conf]`, endpoint from `[runtime] fm_socket`)
    pub fabric_manager: WorkerSettings,
    /// Streaming manager (`[sm_conf]`)
    pub streaming_manager: WorkerSettings,
    /// Emitter (`[emitter_conf]`)
    pub emitter: WorkerSettings,
    /// Config delivery and retry
    pub distributor: DistributorSettings,
    /// Query pipeline
    pub pipeline: PipelineSettings,
    /// Worker startup
    pub bootstrap: BootstrapSettings,
    /// Output feedback loop
    pub feedback: FeedbackSettings,
    /// Log output
    pub logging: LoggingSettings,
}

/// Runtime-wide addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// Address the output listener binds
    pub op_socket: String,
}

/// Launch and connection settings for one worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Address the worker listens on (or sends to, for the emitter)
    pub endpoint: Option<String>,
    /// External command; unset when the worker is started elsewhere
    pub command: Option<String>,
    /// Whitespace-separated arguments for `command`
    pub args: Vec<String>,
    /// Opaque credentials passed to the worker
    pub credentials: Option<String>,
    /// Buffer size hint passed to the worker
    pub buffer_size: Option<usize>,
}

/// Control-plane delivery settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributorSettings {
    pub connect_timeout_ms: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Maximum partition candidates requested per refined query
    pub partition_candidates: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapSettings {
    /// Time allowed for all workers to signal readiness
    pub readiness_timeout_secs: u64,
    /// Interval between endpoint readiness probes
    pub probe_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackSettings {
    /// Time allowed for a producer to deliver one output event
    pub read_timeout_ms: u64,
    /// Largest accepted frame, in bytes
    pub max_frame_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Directory holding the log file
    pub directory: PathBuf,
    /// Log file name
    pub file: String,
}
