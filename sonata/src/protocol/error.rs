//! Protocol error types.

use std::io;

use thiserror::Error;

/// Errors encoding, decoding or framing control-plane messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Body did not serialize or did not match the expected schema.
    #[error("invalid message body: {0}")]
    Json(#[from] serde_json::Error),

    /// Peer uses a protocol version this build does not understand.
    #[error("unsupported protocol version {found} (expected {expected})")]
    UnsupportedVersion { found: u16, expected: u16 },

    /// Framing or transport failure (including oversized frames).
    #[error("frame I/O error: {0}")]
    Io(#[from] io::Error),

    /// Peer closed the connection before sending a complete frame.
    #[error("connection closed before a message was received")]
    Closed,
}
