//! Output feedback loop.
//!
//! Listens for output events produced by the stream plane and forwards each
//! one to the fabric manager as an output delta.
//!
//! ```text
//!  producer ──► reader task ─┐
//!  producer ──► reader task ─┼─► mpsc ─► forwarder ─► send_delta(Output)
//!  producer ──► reader task ─┘
//! ```
//!
//! Every connection carries one framed [`OutputEvent`]. A connection that
//! sends garbage, an oversized frame or nothing at all is logged and
//! dropped without affecting the loop.

mod error;

pub use error::FeedbackError;

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::{ConfigChannel, TcpConfigChannel};
use crate::distributor::SharedDistributor;
use crate::protocol::{
    decode, framed, read_frame, DeltaContent, OutputEvent, DEFAULT_MAX_FRAME_LENGTH,
};

/// Default time allowed for a producer to deliver its event.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Capacity of the queue between reader tasks and the forwarder.
const EVENT_QUEUE_CAPACITY: usize = 64;

/// Feedback loop configuration.
#[derive(Debug, Clone)]
pub struct FeedbackConfig {
    /// Time allowed for reading one event from an accepted connection.
    pub read_timeout: Duration,

    /// Frames larger than this are rejected.
    pub max_frame_length: usize,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

impl From<&crate::config::FeedbackSettings> for FeedbackConfig {
    fn from(settings: &crate::config::FeedbackSettings) -> Self {
        Self {
            read_timeout: Duration::from_millis(settings.read_timeout_ms),
            max_frame_length: settings.max_frame_length,
        }
    }
}

/// Receives output events and turns them into fabric manager deltas.
pub struct OutputFeedbackLoop<C: ConfigChannel = TcpConfigChannel> {
    listener: TcpListener,
    distributor: SharedDistributor<C>,
    config: FeedbackConfig,
}

impl<C: ConfigChannel> OutputFeedbackLoop<C> {
    /// Bind the listening socket.
    ///
    /// Producers may connect as soon as this returns; their events queue
    /// in the socket backlog until [`run`](Self::run) starts.
    pub async fn bind(
        addr: &str,
        distributor: SharedDistributor<C>,
        config: FeedbackConfig,
    ) -> Result<Self, FeedbackError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| FeedbackError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        Ok(Self {
            listener,
            distributor,
            config,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Spawn the loop on the runtime.
    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<Result<(), FeedbackError>> {
        tokio::spawn(self.run(shutdown))
    }

    /// Run until cancelled or until an event cannot be forwarded.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), FeedbackError> {
        let (event_tx, mut event_rx) = mpsc::channel::<OutputEvent>(EVENT_QUEUE_CAPACITY);
        let mut connections: u64 = 0;
        let mut forwarded: u64 = 0;

        info!(
            addr = ?self.listener.local_addr().ok(),
            "Output feedback loop started"
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("Output feedback loop cancelled");
                    break;
                }

                Some(event) = event_rx.recv() => {
                    let qid = event.qid;
                    // Waiting for the distributor, or retrying a delivery,
                    // must not outlive shutdown.
                    tokio::select! {
                        biased;

                        _ = shutdown.cancelled() => {
                            warn!(qid = %qid, "Output event dropped: cancelled while forwarding");
                            break;
                        }

                        result = self.forward(event) => {
                            result?;
                            forwarded += 1;
                        }
                    }
                }

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections += 1;
                        tokio::spawn(receive_event(
                            stream,
                            peer,
                            self.config.clone(),
                            event_tx.clone(),
                        ));
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to accept output connection");
                    }
                },
            }
        }

        info!(connections, forwarded, "Output feedback loop stopped");
        Ok(())
    }

    async fn forward(&self, event: OutputEvent) -> Result<(), FeedbackError> {
        let qid = event.qid;
        self.distributor
            .lock()
            .await
            .send_delta(DeltaContent::Output(event))
            .await?;
        debug!(qid = %qid, "Output event forwarded to fabric manager");
        Ok(())
    }
}

/// Read one event from a producer connection and queue it for forwarding.
async fn receive_event(
    stream: TcpStream,
    peer: SocketAddr,
    config: FeedbackConfig,
    events: mpsc::Sender<OutputEvent>,
) {
    let mut framed = framed(stream, config.max_frame_length);

    let frame = match tokio::time::timeout(config.read_timeout, read_frame(&mut framed)).await {
        Ok(Ok(frame)) => frame,
        Ok(Err(e)) => {
            warn!(peer = %peer, error = %e, "Dropping output message: read failed");
            return;
        }
        Err(_) => {
            warn!(
                peer = %peer,
                timeout_ms = config.read_timeout.as_millis() as u64,
                "Dropping output message: read timed out"
            );
            return;
        }
    };

    match decode::<OutputEvent>(&frame) {
        Ok(event) => {
            if events.send(event).await.is_err() {
                debug!(peer = %peer, "Feedback loop stopped, discarding event");
            }
        }
        Err(e) => {
            warn!(
                peer = %peer,
                bytes = frame.len(),
                error = %e,
                "Dropping malformed output message"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::testing::RecordingChannel;
    use crate::channel::RetryPolicy;
    use crate::distributor::ControlPlaneDistributor;
    use crate::protocol::{encode, write_frame, ConfigMessage};
    use crate::query::QueryId;
    use bytes::Bytes;

    // ========================================================================
    // Test Helpers
    // ========================================================================

    fn retry() -> RetryPolicy {
        RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(2))
    }

    async fn initialized(fabric: &RecordingChannel) -> SharedDistributor<RecordingChannel> {
        let mut distributor =
            ControlPlaneDistributor::new(fabric.clone(), RecordingChannel::new("sm"), retry());
        distributor.send_init(&[]).await.unwrap();
        distributor.into_shared()
    }

    async fn send_raw(addr: SocketAddr, frame: Bytes) {
        let stream = TcpStream::connect(addr).await.unwrap();
        let mut framed = framed(stream, DEFAULT_MAX_FRAME_LENGTH);
        write_frame(&mut framed, frame).await.unwrap();
    }

    async fn wait_for_frames(channel: &RecordingChannel, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while channel.len() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("frames did not arrive in time");
    }

    // ========================================================================
    // Tests
    // ========================================================================

    #[tokio::test]
    async fn test_event_forwarded_as_output_delta() {
        let fabric = RecordingChannel::new("fm");
        let distributor = initialized(&fabric).await;
        let feedback = OutputFeedbackLoop::bind("127.0.0.1:0", distributor, FeedbackConfig::default())
            .await
            .unwrap();
        let addr = feedback.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let handle = feedback.start(shutdown.clone());

        let event = OutputEvent::new(QueryId::new(1), serde_json::json!("x"));
        send_raw(addr, encode(&event).unwrap()).await;
        wait_for_frames(&fabric, 2).await;

        let messages: Vec<ConfigMessage> = fabric.messages();
        assert_eq!(
            messages[1],
            ConfigMessage::Delta {
                delta: DeltaContent::Output(event)
            }
        );

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_malformed_message_does_not_stop_loop() {
        let fabric = RecordingChannel::new("fm");
        let distributor = initialized(&fabric).await;
        let feedback = OutputFeedbackLoop::bind("127.0.0.1:0", distributor, FeedbackConfig::default())
            .await
            .unwrap();
        let addr = feedback.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let handle = feedback.start(shutdown.clone());

        send_raw(addr, Bytes::from_static(b"{not json")).await;
        let event = OutputEvent::new(QueryId::new(7), serde_json::json!({"count": 3}));
        send_raw(addr, encode(&event).unwrap()).await;
        wait_for_frames(&fabric, 2).await;

        // Give a stray delta from the malformed message a chance to show up.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let messages: Vec<ConfigMessage> = fabric.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[1],
            ConfigMessage::Delta {
                delta: DeltaContent::Output(event)
            }
        );
        assert!(!handle.is_finished());

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_silent_producer_times_out() {
        let fabric = RecordingChannel::new("fm");
        let distributor = initialized(&fabric).await;
        let config = FeedbackConfig {
            read_timeout: Duration::from_millis(50),
            ..FeedbackConfig::default()
        };
        let feedback = OutputFeedbackLoop::bind("127.0.0.1:0", distributor, config)
            .await
            .unwrap();
        let addr = feedback.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let handle = feedback.start(shutdown.clone());

        let _idle = TcpStream::connect(addr).await.unwrap();
        let event = OutputEvent::new(QueryId::new(2), serde_json::json!(null));
        send_raw(addr, encode(&event).unwrap()).await;
        wait_for_frames(&fabric, 2).await;

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_forward_failure_stops_loop() {
        // Distributor never initialized: every delta is rejected.
        let distributor = ControlPlaneDistributor::new(
            RecordingChannel::new("fm"),
            RecordingChannel::new("sm"),
            retry(),
        )
        .into_shared();
        let feedback = OutputFeedbackLoop::bind("127.0.0.1:0", distributor, FeedbackConfig::default())
            .await
            .unwrap();
        let addr = feedback.local_addr().unwrap();
        let handle = feedback.start(CancellationToken::new());

        let event = OutputEvent::new(QueryId::new(1), serde_json::json!(1));
        send_raw(addr, encode(&event).unwrap()).await;

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(FeedbackError::Forward(_))));
    }

    #[tokio::test]
    async fn test_cancel_while_distributor_is_locked() {
        let fabric = RecordingChannel::new("fm");
        let distributor = initialized(&fabric).await;
        let feedback =
            OutputFeedbackLoop::bind("127.0.0.1:0", distributor.clone(), FeedbackConfig::default())
                .await
                .unwrap();
        let addr = feedback.local_addr().unwrap();
        let shutdown = CancellationToken::new();

        // Another task holds the distributor for the whole shutdown.
        let guard = distributor.lock().await;
        let handle = feedback.start(shutdown.clone());

        let event = OutputEvent::new(QueryId::new(1), serde_json::json!("held"));
        send_raw(addr, encode(&event).unwrap()).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_finished());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop did not stop while the distributor was locked")
            .unwrap()
            .unwrap();

        drop(guard);
        assert_eq!(fabric.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_during_delivery_retries() {
        let fabric = RecordingChannel::new("fm");
        let mut distributor = ControlPlaneDistributor::new(
            fabric.clone(),
            RecordingChannel::new("sm"),
            RetryPolicy::new(8, Duration::from_secs(10), Duration::from_secs(10)),
        );
        distributor.send_init(&[]).await.unwrap();
        let feedback = OutputFeedbackLoop::bind(
            "127.0.0.1:0",
            distributor.into_shared(),
            FeedbackConfig::default(),
        )
        .await
        .unwrap();
        let addr = feedback.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let handle = feedback.start(shutdown.clone());

        fabric.fail_next(8);
        let event = OutputEvent::new(QueryId::new(4), serde_json::json!(4));
        send_raw(addr, encode(&event).unwrap()).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_finished());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop waited out the retry backoff")
            .unwrap()
            .unwrap();
        assert_eq!(fabric.len(), 1);
    }

    #[tokio::test]
    async fn test_bind_failure_reports_address() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();
        let distributor = ControlPlaneDistributor::new(
            RecordingChannel::new("fm"),
            RecordingChannel::new("sm"),
            retry(),
        )
        .into_shared();

        let err = OutputFeedbackLoop::bind(&addr, distributor, FeedbackConfig::default())
            .await
            .err()
            .unwrap();
        match err {
            FeedbackError::Bind { addr: reported, .. } => assert_eq!(reported, addr),
            other => panic!("expected bind error, got {other:?}"),
        }
    }
}
