//! Distributor error types.

use thiserror::Error;

use crate::channel::ChannelError;
use crate::protocol::ProtocolError;

/// Errors pushing configuration to the managers.
#[derive(Debug, Error)]
pub enum DistributorError {
    /// `send_init` was already called on this distributor.
    #[error("initial configuration was already sent to the fabric manager")]
    AlreadyInitialized,

    /// A delta was requested before the initial configuration.
    #[error("delta requested before the initial configuration was sent")]
    NotInitialized,

    /// The message could not be encoded.
    #[error("failed to encode {kind} message: {source}")]
    Encode {
        kind: &'static str,
        #[source]
        source: ProtocolError,
    },

    /// Every delivery attempt failed. The deployment may now be out of sync.
    #[error("giving up on {kind} message to {endpoint} after {attempts} attempts: {source}")]
    Fatal {
        kind: &'static str,
        endpoint: String,
        attempts: u32,
        #[source]
        source: ChannelError,
    },
}

impl DistributorError {
    /// True for precondition violations (call-order bugs), false for
    /// delivery failures.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::AlreadyInitialized | Self::NotInitialized)
    }
}
