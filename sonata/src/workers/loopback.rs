//! In-process stand-in for a manager endpoint.
//!
//! Binds the manager's address, accepts config connections one at a time
//! and decodes each frame. Decoded messages are logged and, when a sink is
//! attached, forwarded in arrival order. Useful for running the
//! orchestrator without real managers, and for observing what it sends.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::protocol::{
    decode, framed, read_frame, ConfigMessage, ProtocolError, StreamConfig,
    DEFAULT_MAX_FRAME_LENGTH,
};
use crate::supervisor::{ReadySignal, Worker, WorkerError, WorkerKind};

/// Time allowed for a connected sender to hand over its frame.
const LOOPBACK_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// A message received by a loopback endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceivedMessage {
    /// Received on a fabric manager endpoint.
    Config(ConfigMessage),

    /// Received on a streaming manager endpoint.
    Stream(StreamConfig),
}

/// Loopback listener posing as the fabric or streaming manager.
pub struct LoopbackEndpoint {
    kind: WorkerKind,
    listener: TcpListener,
    sink: Option<mpsc::Sender<ReceivedMessage>>,
    max_frame_length: usize,
}

impl LoopbackEndpoint {
    /// Bind a loopback fabric manager.
    pub async fn fabric_manager(addr: &str) -> Result<Self, WorkerError> {
        Self::bind(WorkerKind::FabricManager, addr).await
    }

    /// Bind a loopback streaming manager.
    pub async fn streaming_manager(addr: &str) -> Result<Self, WorkerError> {
        Self::bind(WorkerKind::StreamingManager, addr).await
    }

    async fn bind(kind: WorkerKind, addr: &str) -> Result<Self, WorkerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| WorkerError::Bind {
                kind,
                addr: addr.to_string(),
                source,
            })?;

        Ok(Self {
            kind,
            listener,
            sink: None,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        })
    }

    /// Forward every decoded message to `sink`.
    pub fn with_sink(mut self, sink: mpsc::Sender<ReceivedMessage>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_max_frame_length(mut self, max_frame_length: usize) -> Self {
        self.max_frame_length = max_frame_length;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    async fn receive(&self, stream: TcpStream, peer: SocketAddr) -> Option<ReceivedMessage> {
        let mut framed = framed(stream, self.max_frame_length);

        let read = tokio::time::timeout(LOOPBACK_READ_TIMEOUT, read_frame(&mut framed)).await;
        let frame = match read {
            Ok(Ok(frame)) => frame,
            // Readiness probes connect and hang up without sending.
            Ok(Err(ProtocolError::Closed)) => return None,
            Ok(Err(e)) => {
                warn!(worker = %self.kind, peer = %peer, error = %e, "Loopback read failed");
                return None;
            }
            Err(_) => {
                warn!(worker = %self.kind, peer = %peer, "Loopback read timed out");
                return None;
            }
        };

        let decoded = match self.kind {
            WorkerKind::StreamingManager => {
                decode::<StreamConfig>(&frame).map(ReceivedMessage::Stream)
            }
            _ => decode::<ConfigMessage>(&frame).map(ReceivedMessage::Config),
        };

        match decoded {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(
                    worker = %self.kind,
                    peer = %peer,
                    error = %e,
                    "Loopback received undecodable frame"
                );
                None
            }
        }
    }
}

impl Worker for LoopbackEndpoint {
    fn kind(&self) -> WorkerKind {
        self.kind
    }

    async fn start(
        self,
        ready: ReadySignal,
        shutdown: CancellationToken,
    ) -> Result<(), WorkerError> {
        info!(
            worker = %self.kind,
            addr = ?self.listener.local_addr().ok(),
            "Loopback endpoint listening"
        );
        ready.signal();

        let mut received: u64 = 0;

        loop {
            let (stream, peer) = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(worker = %self.kind, error = %e, "Loopback accept failed");
                        continue;
                    }
                },
            };

            let Some(message) = self.receive(stream, peer).await else {
                continue;
            };
            received += 1;

            match &message {
                ReceivedMessage::Config(config) => {
                    info!(
                        worker = %self.kind,
                        kind = config.kind(),
                        "Loopback received config message"
                    );
                }
                ReceivedMessage::Stream(stream) => {
                    info!(
                        worker = %self.kind,
                        queries = stream.queries.len(),
                        "Loopback received stream config"
                    );
                }
            }

            if let Some(sink) = &self.sink {
                if sink.send(message).await.is_err() {
                    debug!(worker = %self.kind, "Loopback sink closed");
                }
            }
        }

        info!(worker = %self.kind, received, "Loopback endpoint stopped");
        Ok(())
    }
}
