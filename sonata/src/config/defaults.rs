//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use super::settings::*;

// =============================================================================
// Endpoints
// =============================================================================

/// Default fabric manager endpoint.
pub const DEFAULT_FM_SOCKET: &str = "127.0.0.1:6666";

/// Default streaming manager endpoint.
pub const DEFAULT_SM_SOCKET: &str = "127.0.0.1:5555";

/// Default output listener address.
pub const DEFAULT_OP_SOCKET: &str = "127.0.0.1:4949";

// =============================================================================
// Timing and limits
// =============================================================================

pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 =
    crate::channel::DEFAULT_CONNECT_TIMEOUT.as_millis() as u64;
pub const DEFAULT_MAX_ATTEMPTS: u32 = crate::channel::DEFAULT_MAX_ATTEMPTS;
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 =
    crate::channel::DEFAULT_INITIAL_BACKOFF.as_millis() as u64;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = crate::channel::DEFAULT_MAX_BACKOFF.as_millis() as u64;

pub const DEFAULT_PARTITION_CANDIDATES: usize = crate::pipeline::DEFAULT_PARTITION_CANDIDATES;

pub const DEFAULT_READINESS_TIMEOUT_SECS: u64 =
    crate::bootstrap::DEFAULT_READINESS_TIMEOUT.as_secs();
pub const DEFAULT_PROBE_INTERVAL_MS: u64 =
    crate::workers::DEFAULT_PROBE_INTERVAL.as_millis() as u64;

pub const DEFAULT_READ_TIMEOUT_MS: u64 = crate::feedback::DEFAULT_READ_TIMEOUT.as_millis() as u64;
pub const DEFAULT_MAX_FRAME_LENGTH: usize = crate::protocol::DEFAULT_MAX_FRAME_LENGTH;

// =============================================================================
// Logging
// =============================================================================

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "sonata.log";

impl Default for ConfigFile {
    fn default() -> Self {
        let config_dir = super::file::config_directory();

        Self {
            runtime: RuntimeSettings {
                op_socket: DEFAULT_OP_SOCKET.to_string(),
            },
            fabric_manager: WorkerSettings {
                endpoint: Some(DEFAULT_FM_SOCKET.to_string()),
                ..WorkerSettings::default()
            },
            streaming_manager: WorkerSettings {
                endpoint: Some(DEFAULT_SM_SOCKET.to_string()),
                ..WorkerSettings::default()
            },
            emitter: WorkerSettings::default(),
            distributor: DistributorSettings {
                connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
                max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
            },
            pipeline: PipelineSettings {
                partition_candidates: DEFAULT_PARTITION_CANDIDATES,
            },
            bootstrap: BootstrapSettings {
                readiness_timeout_secs: DEFAULT_READINESS_TIMEOUT_SECS,
                probe_interval_ms: DEFAULT_PROBE_INTERVAL_MS,
            },
            feedback: FeedbackSettings {
                read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
                max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            },
            logging: LoggingSettings {
                directory: config_dir.join("logs"),
                file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}
