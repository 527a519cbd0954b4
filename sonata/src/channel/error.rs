//! Channel error types.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::protocol::ProtocolError;

/// Errors delivering a single frame to an endpoint.
///
/// All variants are treated as transient by the distributor's retry loop.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Nothing accepted the connection (not listening yet, or crashed).
    #[error("endpoint {endpoint} unavailable: {source}")]
    Unavailable {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// Connection or hand-off did not complete in time.
    #[error("timed out delivering to {endpoint} after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },

    /// Connection was established but the frame could not be written.
    #[error("failed to deliver to {endpoint}: {source}")]
    Send {
        endpoint: String,
        #[source]
        source: ProtocolError,
    },
}

impl ChannelError {
    /// Endpoint the failed delivery was addressed to.
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Unavailable { endpoint, .. }
            | Self::Timeout { endpoint, .. }
            | Self::Send { endpoint, .. } => endpoint,
        }
    }
}
