//! Worker error types.

use std::io;
use std::time::Duration;

use thiserror::Error;

use super::WorkerKind;
use crate::feedback::FeedbackError;

/// Errors raised by a supervised worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker's external command could not be launched.
    #[error("failed to launch {kind} command '{command}': {source}")]
    Spawn {
        kind: WorkerKind,
        command: String,
        #[source]
        source: io::Error,
    },

    /// The worker could not bind its endpoint.
    #[error("{kind} failed to bind {addr}: {source}")]
    Bind {
        kind: WorkerKind,
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The worker did not signal readiness in time.
    #[error("{kind} not ready after {timeout:?}")]
    ReadinessTimeout { kind: WorkerKind, timeout: Duration },

    /// The worker stopped on its own.
    #[error("{kind} exited: {status}")]
    Exited { kind: WorkerKind, status: String },

    /// The worker's task panicked.
    #[error("{kind} panicked: {message}")]
    Panicked { kind: WorkerKind, message: String },

    /// The output listener stopped with an error.
    #[error("output listener failed: {0}")]
    Feedback(#[from] FeedbackError),
}
