//! Feedback loop error types.

use std::io;

use thiserror::Error;

use crate::distributor::DistributorError;

/// Errors that stop the output feedback loop.
///
/// Problems with individual messages are logged and dropped, never
/// reported here.
#[derive(Debug, Error)]
pub enum FeedbackError {
    /// The listening socket could not be bound.
    #[error("failed to bind output listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Forwarding an event to the fabric manager failed.
    #[error("failed to forward output event: {0}")]
    Forward(#[from] DistributorError),
}
