//! TCP implementation of [`ConfigChannel`].

use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::trace;

use super::error::ChannelError;
use super::traits::ConfigChannel;
use crate::protocol::{framed, write_frame, ProtocolError, DEFAULT_MAX_FRAME_LENGTH};

/// Default bound on connection establishment and frame hand-off.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Opens a fresh connection per message, writes one frame, then shuts the
/// connection down.
#[derive(Debug, Clone)]
pub struct TcpConfigChannel {
    endpoint: String,
    connect_timeout: Duration,
    max_frame_length: usize,
}

impl TcpConfigChannel {
    pub fn new(endpoint: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }

    pub fn with_max_frame_length(mut self, max_frame_length: usize) -> Self {
        self.max_frame_length = max_frame_length;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    async fn connect(&self) -> Result<TcpStream, ChannelError> {
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.endpoint)).await
        {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(source)) => Err(ChannelError::Unavailable {
                endpoint: self.endpoint.clone(),
                source,
            }),
            Err(_) => Err(ChannelError::Timeout {
                endpoint: self.endpoint.clone(),
                timeout: self.connect_timeout,
            }),
        }
    }

    async fn deliver(&self, stream: TcpStream, frame: Bytes) -> Result<(), ProtocolError> {
        // Small control messages; don't let Nagle hold them back.
        let _ = stream.set_nodelay(true);
        let mut framed = framed(stream, self.max_frame_length);
        write_frame(&mut framed, frame).await?;
        framed.get_mut().shutdown().await?;
        Ok(())
    }
}

impl ConfigChannel for TcpConfigChannel {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, frame: Bytes) -> Result<(), ChannelError> {
        let stream = self.connect().await?;
        let len = frame.len();

        match tokio::time::timeout(self.connect_timeout, self.deliver(stream, frame)).await {
            Ok(Ok(())) => {
                trace!(endpoint = %self.endpoint, bytes = len, "Frame delivered");
                Ok(())
            }
            Ok(Err(source)) => Err(ChannelError::Send {
                endpoint: self.endpoint.clone(),
                source,
            }),
            Err(_) => Err(ChannelError::Timeout {
                endpoint: self.endpoint.clone(),
                timeout: self.connect_timeout,
            }),
        }
    }
}
