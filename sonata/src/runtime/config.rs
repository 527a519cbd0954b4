//! Runtime configuration.

use std::time::Duration;

use crate::bootstrap::BootstrapConfig;
use crate::config::defaults::{DEFAULT_FM_SOCKET, DEFAULT_SM_SOCKET};
use crate::config::ConfigFile;
use crate::distributor::DistributorConfig;
use crate::feedback::FeedbackConfig;
use crate::pipeline::PipelineConfig;
use crate::supervisor::{WorkerKind, WorkerSet};
use crate::workers::{ProcessWorker, WorkerOptions};

/// Everything [`super::SonataRuntime`] needs to run.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Fabric manager control endpoint.
    pub fm_endpoint: String,

    /// Streaming manager control endpoint.
    pub sm_endpoint: String,

    /// Address the output listener binds.
    pub op_socket: String,

    pub pipeline: PipelineConfig,
    pub distributor: DistributorConfig,
    pub bootstrap: BootstrapConfig,
    pub feedback: FeedbackConfig,
}

impl RuntimeConfig {
    pub fn new(
        fm_endpoint: impl Into<String>,
        sm_endpoint: impl Into<String>,
        op_socket: impl Into<String>,
    ) -> Self {
        Self {
            fm_endpoint: fm_endpoint.into(),
            sm_endpoint: sm_endpoint.into(),
            op_socket: op_socket.into(),
            pipeline: PipelineConfig::default(),
            distributor: DistributorConfig::default(),
            bootstrap: BootstrapConfig::default(),
            feedback: FeedbackConfig::default(),
        }
    }
}

impl From<&ConfigFile> for RuntimeConfig {
    fn from(config: &ConfigFile) -> Self {
        let mut distributor = DistributorConfig::from(&config.distributor);
        distributor.max_frame_length = config.feedback.max_frame_length;

        Self {
            fm_endpoint: config
                .fabric_manager
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_FM_SOCKET.to_string()),
            sm_endpoint: config
                .streaming_manager
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_SM_SOCKET.to_string()),
            op_socket: config.runtime.op_socket.clone(),
            pipeline: PipelineConfig::from(&config.pipeline),
            distributor,
            bootstrap: BootstrapConfig::from(&config.bootstrap),
            feedback: FeedbackConfig::from(&config.feedback),
        }
    }
}

/// Process workers for the two managers and the emitter, as configured.
///
/// The output listener is added by the runtime itself.
pub fn process_workers(config: &ConfigFile) -> WorkerSet {
    let probe_interval = Duration::from_millis(config.bootstrap.probe_interval_ms);

    WorkerSet::new()
        .with(
            ProcessWorker::new(
                WorkerKind::FabricManager,
                WorkerOptions::from(&config.fabric_manager),
            )
            .with_probe_interval(probe_interval),
        )
        .with(
            ProcessWorker::new(WorkerKind::Emitter, WorkerOptions::from(&config.emitter))
                .without_probe(),
        )
        .with(
            ProcessWorker::new(
                WorkerKind::StreamingManager,
                WorkerOptions::from(&config.streaming_manager),
            )
            .with_probe_interval(probe_interval),
        )
}
