//! Bootstrap error types.

use std::time::Duration;

use thiserror::Error;

use crate::supervisor::{WorkerError, WorkerKind};

/// Errors bringing the workers up.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// A worker failed or stopped before it became ready.
    #[error("{kind} failed to start: {source}")]
    WorkerStartFailure {
        kind: WorkerKind,
        #[source]
        source: WorkerError,
    },

    /// A worker did not become ready within the readiness timeout.
    #[error("{kind} not ready within {timeout:?}")]
    ReadinessTimeout { kind: WorkerKind, timeout: Duration },

    /// Shutdown was requested while waiting for readiness.
    #[error("bootstrap cancelled")]
    Cancelled,
}

impl BootstrapError {
    pub(crate) fn from_worker(kind: WorkerKind, timeout: Duration, error: WorkerError) -> Self {
        match error {
            WorkerError::ReadinessTimeout { .. } => Self::ReadinessTimeout { kind, timeout },
            source => Self::WorkerStartFailure { kind, source },
        }
    }

    pub fn stage(&self) -> &'static str {
        "bootstrap"
    }

    /// The worker that caused the failure, if any.
    pub fn worker(&self) -> Option<WorkerKind> {
        match self {
            Self::WorkerStartFailure { kind, .. } | Self::ReadinessTimeout { kind, .. } => {
                Some(*kind)
            }
            Self::Cancelled => None,
        }
    }
}
