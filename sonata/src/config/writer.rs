//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented INI representation written to `config.ini`.

use super::settings::{ConfigFile, WorkerSettings};

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let fm_socket = config.fabric_manager.endpoint.as_deref().unwrap_or("");
    let sm_socket = config.streaming_manager.endpoint.as_deref().unwrap_or("");
    let emitter_socket = config.emitter.endpoint.as_deref().unwrap_or("");

    format!(
        r#"[runtime]
; Fabric manager control endpoint (host:port)
fm_socket = {}
; Address the output listener binds (host:port)
op_socket = {}

[fm_conf]
; Command launching the fabric manager. Leave empty when it runs elsewhere.
{}
[sm_conf]
; Streaming manager control endpoint (host:port)
sm_socket = {}
{}
[emitter_conf]
; Address the emitter sends to (host:port), optional
socket = {}
{}
[distributor]
; Timeout for connecting to a manager and handing over one message (ms)
connect_timeout_ms = {}
; Delivery attempts before giving up (minimum 1)
max_attempts = {}
; Backoff after the first failed attempt; doubles per attempt (ms)
initial_backoff_ms = {}
; Upper bound on the backoff (ms)
max_backoff_ms = {}

[pipeline]
; Partition plans proposed per refined query
partition_candidates = {}

[bootstrap]
; Time allowed for all workers to become ready (seconds)
readiness_timeout_secs = {}
; Interval between endpoint readiness probes (ms)
probe_interval_ms = {}

[feedback]
; Time allowed for a producer to deliver one output event (ms)
read_timeout_ms = {}
; Largest accepted message (bytes)
max_frame_length = {}

[logging]
; Log directory (default: ~/.sonata/logs)
directory = {}
file = {}
"#,
        fm_socket,
        config.runtime.op_socket,
        worker_lines(&config.fabric_manager),
        sm_socket,
        worker_lines(&config.streaming_manager),
        emitter_socket,
        worker_lines(&config.emitter),
        config.distributor.connect_timeout_ms,
        config.distributor.max_attempts,
        config.distributor.initial_backoff_ms,
        config.distributor.max_backoff_ms,
        config.pipeline.partition_candidates,
        config.bootstrap.readiness_timeout_secs,
        config.bootstrap.probe_interval_ms,
        config.feedback.read_timeout_ms,
        config.feedback.max_frame_length,
        config.logging.directory.to_string_lossy(),
        config.logging.file,
    )
}

/// The keys common to all worker sections.
fn worker_lines(worker: &WorkerSettings) -> String {
    format!(
        "command = {}\nargs = {}\ncredentials = {}\nbuffer_size = {}\n",
        worker.command.as_deref().unwrap_or(""),
        worker.args.join(" "),
        worker.credentials.as_deref().unwrap_or(""),
        worker
            .buffer_size
            .map(|n| n.to_string())
            .unwrap_or_default(),
    )
}
