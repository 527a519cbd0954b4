//! Config message channels.
//!
//! A channel delivers one encoded control-plane frame to one endpoint per
//! call. [`RetryPolicy`] describes how callers retry failed deliveries.

mod error;
mod retry;
mod tcp;
mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use error::ChannelError;
pub use retry::{RetryPolicy, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF};
pub use tcp::{TcpConfigChannel, DEFAULT_CONNECT_TIMEOUT};
pub use traits::ConfigChannel;
