//! The config channel abstraction.

use std::future::Future;

use bytes::Bytes;

use super::error::ChannelError;

/// A point-to-point link to one named endpoint.
///
/// `send` makes a single delivery attempt: connect, hand over one frame,
/// release the connection. No reply is expected. Retrying is the caller's
/// decision.
///
/// # Implementations
///
/// - [`super::TcpConfigChannel`] - production implementation over TCP
/// - Recording channels in tests
pub trait ConfigChannel: Send + Sync + 'static {
    /// Address this channel delivers to, for logging and errors.
    fn endpoint(&self) -> &str;

    /// Deliver one encoded frame.
    fn send(&self, frame: Bytes) -> impl Future<Output = Result<(), ChannelError>> + Send;
}
