//! The control-plane distributor.
//!
//! Pushes compiled configuration to the two managers:
//!
//! ```text
//!                    ┌──────────────────────────┐
//!  send_init ───────►│                          │── Init ──────► fabric manager
//!  send_delta ──────►│ ControlPlaneDistributor  │── Delta* ────► fabric manager
//!  send_stream_config│                          │── StreamConfig► streaming manager
//!                    └──────────────────────────┘
//! ```
//!
//! Methods take `&mut self`, so one instance issues sends strictly in call
//! order. Callers on several tasks share it as a [`SharedDistributor`].

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::error::DistributorError;
use crate::channel::{ConfigChannel, RetryPolicy, TcpConfigChannel, DEFAULT_CONNECT_TIMEOUT};
use crate::protocol::{encode, ConfigMessage, DeltaContent, StreamConfig, DEFAULT_MAX_FRAME_LENGTH};
use crate::query::{CompiledDpQuery, CompiledSpQuery};

/// A distributor shared between the runtime and the feedback loop.
pub type SharedDistributor<C = TcpConfigChannel> = Arc<Mutex<ControlPlaneDistributor<C>>>;

/// Distributor configuration.
#[derive(Debug, Clone)]
pub struct DistributorConfig {
    /// Bound on connecting to an endpoint and handing over one frame.
    pub connect_timeout: Duration,

    /// Retry policy for failed deliveries.
    pub retry: RetryPolicy,

    /// Largest frame the channels will write.
    pub max_frame_length: usize,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            retry: RetryPolicy::default(),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

impl From<&crate::config::DistributorSettings> for DistributorConfig {
    fn from(settings: &crate::config::DistributorSettings) -> Self {
        Self {
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
            retry: RetryPolicy::new(
                settings.max_attempts,
                Duration::from_millis(settings.initial_backoff_ms),
                Duration::from_millis(settings.max_backoff_ms),
            ),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

/// Where the fabric manager stands in the init/delta protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitState {
    Pending,
    Sent,
    Failed,
}

/// Owns the channels to both managers and enforces init-before-delta.
pub struct ControlPlaneDistributor<C: ConfigChannel = TcpConfigChannel> {
    fabric: C,
    streaming: C,
    retry: RetryPolicy,
    init: InitState,
    deltas_sent: u64,
    stream_configs_sent: u64,
}

impl ControlPlaneDistributor<TcpConfigChannel> {
    /// Create a distributor delivering over TCP.
    pub fn tcp(
        fabric_endpoint: impl Into<String>,
        streaming_endpoint: impl Into<String>,
        config: &DistributorConfig,
    ) -> Self {
        let fabric = TcpConfigChannel::new(fabric_endpoint, config.connect_timeout)
            .with_max_frame_length(config.max_frame_length);
        let streaming = TcpConfigChannel::new(streaming_endpoint, config.connect_timeout)
            .with_max_frame_length(config.max_frame_length);
        Self::new(fabric, streaming, config.retry)
    }
}

impl<C: ConfigChannel> ControlPlaneDistributor<C> {
    pub fn new(fabric: C, streaming: C, retry: RetryPolicy) -> Self {
        Self {
            fabric,
            streaming,
            retry,
            init: InitState::Pending,
            deltas_sent: 0,
            stream_configs_sent: 0,
        }
    }

    /// Wrap for sharing across tasks.
    pub fn into_shared(self) -> SharedDistributor<C> {
        Arc::new(Mutex::new(self))
    }

    /// Send the full data-plane snapshot to the fabric manager.
    ///
    /// Allowed once per distributor, whether or not the delivery succeeds.
    pub async fn send_init(
        &mut self,
        dp_queries: &[CompiledDpQuery],
    ) -> Result<(), DistributorError> {
        if self.init != InitState::Pending {
            return Err(DistributorError::AlreadyInitialized);
        }

        let message = ConfigMessage::Init {
            queries: dp_queries.to_vec(),
        };
        let frame = encode(&message).map_err(|source| DistributorError::Encode {
            kind: "init",
            source,
        })?;

        match deliver(&self.fabric, "init", frame, self.retry).await {
            Ok(attempts) => {
                self.init = InitState::Sent;
                info!(
                    endpoint = %self.fabric.endpoint(),
                    queries = dp_queries.len(),
                    attempts,
                    "Initial configuration sent to fabric manager"
                );
                Ok(())
            }
            Err(e) => {
                self.init = InitState::Failed;
                Err(e)
            }
        }
    }

    /// Send an incremental update to the fabric manager.
    pub async fn send_delta(&mut self, content: DeltaContent) -> Result<(), DistributorError> {
        if self.init != InitState::Sent {
            return Err(DistributorError::NotInitialized);
        }

        let message = ConfigMessage::Delta { delta: content };
        let frame = encode(&message).map_err(|source| DistributorError::Encode {
            kind: "delta",
            source,
        })?;

        let attempts = deliver(&self.fabric, "delta", frame, self.retry).await?;
        self.deltas_sent += 1;
        debug!(
            endpoint = %self.fabric.endpoint(),
            deltas_sent = self.deltas_sent,
            attempts,
            "Delta sent to fabric manager"
        );
        Ok(())
    }

    /// Send the full stream-plane configuration to the streaming manager.
    pub async fn send_stream_config(
        &mut self,
        sp_queries: &[CompiledSpQuery],
    ) -> Result<(), DistributorError> {
        let message = StreamConfig {
            queries: sp_queries.to_vec(),
        };
        let frame = encode(&message).map_err(|source| DistributorError::Encode {
            kind: "stream_config",
            source,
        })?;

        let attempts = deliver(&self.streaming, "stream_config", frame, self.retry).await?;
        self.stream_configs_sent += 1;
        info!(
            endpoint = %self.streaming.endpoint(),
            queries = sp_queries.len(),
            attempts,
            "Stream configuration sent to streaming manager"
        );
        Ok(())
    }

    /// Whether the initial configuration has been delivered.
    pub fn is_initialized(&self) -> bool {
        self.init == InitState::Sent
    }

    pub fn deltas_sent(&self) -> u64 {
        self.deltas_sent
    }

    pub fn stream_configs_sent(&self) -> u64 {
        self.stream_configs_sent
    }

    pub fn fabric_endpoint(&self) -> &str {
        self.fabric.endpoint()
    }

    pub fn streaming_endpoint(&self) -> &str {
        self.streaming.endpoint()
    }
}

/// Deliver `frame`, retrying with backoff. Returns the number of attempts.
async fn deliver<C: ConfigChannel>(
    channel: &C,
    kind: &'static str,
    frame: Bytes,
    retry: RetryPolicy,
) -> Result<u32, DistributorError> {
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;

        match channel.send(frame.clone()).await {
            Ok(()) => return Ok(attempts),
            Err(e) if retry.allows_retry(attempts) => {
                let backoff = retry.backoff(attempts);
                warn!(
                    endpoint = %channel.endpoint(),
                    kind,
                    attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Delivery failed, retrying"
                );
                tokio::time::sleep(backoff).await;
            }
            Err(source) => {
                error!(
                    endpoint = %channel.endpoint(),
                    kind,
                    attempts,
                    error = %source,
                    "Delivery failed, giving up"
                );
                return Err(DistributorError::Fatal {
                    kind,
                    endpoint: channel.endpoint().to_string(),
                    attempts,
                    source,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::testing::RecordingChannel;
    use crate::protocol::OutputEvent;
    use crate::query::QueryId;

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1), Duration::from_millis(5))
    }

    fn dp(qid: u64) -> CompiledDpQuery {
        CompiledDpQuery {
            qid: QueryId::new(qid),
            expr: format!("map(q{})", qid),
        }
    }

    fn sp(qid: u64) -> CompiledSpQuery {
        CompiledSpQuery {
            qid: QueryId::new(qid),
            expr: "identity".to_string(),
        }
    }

    #[tokio::test]
    async fn test_init_then_delta_in_order() {
        let fabric = RecordingChannel::new("fm");
        let mut distributor =
            ControlPlaneDistributor::new(fabric.clone(), RecordingChannel::new("sm"), fast_retry(3));

        distributor.send_init(&[dp(1), dp(2)]).await.unwrap();
        let event = OutputEvent::new(QueryId::new(1), serde_json::json!("x"));
        distributor
            .send_delta(DeltaContent::Output(event.clone()))
            .await
            .unwrap();

        let messages: Vec<ConfigMessage> = fabric.messages();
        assert_eq!(
            messages,
            vec![
                ConfigMessage::Init {
                    queries: vec![dp(1), dp(2)]
                },
                ConfigMessage::Delta {
                    delta: DeltaContent::Output(event)
                },
            ]
        );
        assert_eq!(distributor.deltas_sent(), 1);
    }

    #[tokio::test]
    async fn test_second_init_rejected() {
        let fabric = RecordingChannel::new("fm");
        let mut distributor =
            ControlPlaneDistributor::new(fabric.clone(), RecordingChannel::new("sm"), fast_retry(1));

        distributor.send_init(&[dp(1)]).await.unwrap();
        let err = distributor.send_init(&[dp(1)]).await.unwrap_err();
        assert!(matches!(err, DistributorError::AlreadyInitialized));
        assert_eq!(fabric.len(), 1);
    }

    #[tokio::test]
    async fn test_delta_before_init_rejected() {
        let fabric = RecordingChannel::new("fm");
        let mut distributor =
            ControlPlaneDistributor::new(fabric.clone(), RecordingChannel::new("sm"), fast_retry(1));

        let err = distributor
            .send_delta(DeltaContent::Queries(vec![dp(1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DistributorError::NotInitialized));
        assert!(fabric.len() == 0);
    }

    #[tokio::test]
    async fn test_retries_until_endpoint_accepts() {
        let fabric = RecordingChannel::failing("fm", 2);
        let mut distributor =
            ControlPlaneDistributor::new(fabric.clone(), RecordingChannel::new("sm"), fast_retry(5));

        distributor.send_init(&[dp(1)]).await.unwrap();
        assert!(distributor.is_initialized());
        assert_eq!(fabric.len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_fatal() {
        let fabric = RecordingChannel::failing("fm", 10);
        let mut distributor =
            ControlPlaneDistributor::new(fabric.clone(), RecordingChannel::new("sm"), fast_retry(3));

        let err = distributor.send_init(&[dp(1)]).await.unwrap_err();
        match err {
            DistributorError::Fatal {
                kind,
                endpoint,
                attempts,
                ..
            } => {
                assert_eq!(kind, "init");
                assert_eq!(endpoint, "fm");
                assert_eq!(attempts, 3);
            }
            other => panic!("expected fatal error, got {other:?}"),
        }
        assert!(!distributor.is_initialized());

        // A failed init still counts as the one allowed init.
        let err = distributor.send_init(&[dp(1)]).await.unwrap_err();
        assert!(matches!(err, DistributorError::AlreadyInitialized));
        let err = distributor
            .send_delta(DeltaContent::Queries(Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, DistributorError::NotInitialized));
    }

    #[tokio::test]
    async fn test_stream_config_goes_to_streaming_manager() {
        let fabric = RecordingChannel::new("fm");
        let streaming = RecordingChannel::new("sm");
        let mut distributor =
            ControlPlaneDistributor::new(fabric.clone(), streaming.clone(), fast_retry(1));

        distributor.send_stream_config(&[sp(1), sp(2)]).await.unwrap();

        let configs: Vec<StreamConfig> = streaming.messages();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].queries.len(), 2);
        assert!(fabric.len() == 0);
        assert_eq!(distributor.stream_configs_sent(), 1);
    }

    #[tokio::test]
    async fn test_shared_distributor_serializes_callers() {
        let fabric = RecordingChannel::new("fm");
        let shared =
            ControlPlaneDistributor::new(fabric.clone(), RecordingChannel::new("sm"), fast_retry(1))
                .into_shared();

        shared.lock().await.send_init(&[]).await.unwrap();

        let mut tasks = Vec::new();
        for qid in 1..=8 {
            let shared = Arc::clone(&shared);
            tasks.push(tokio::spawn(async move {
                shared
                    .lock()
                    .await
                    .send_delta(DeltaContent::Queries(vec![dp(qid)]))
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let messages: Vec<ConfigMessage> = fabric.messages();
        assert_eq!(messages.len(), 9);
        assert_eq!(messages[0].kind(), "init");
        assert!(messages[1..].iter().all(|m| m.kind() == "delta"));
        assert_eq!(shared.lock().await.deltas_sent(), 8);
    }
}
