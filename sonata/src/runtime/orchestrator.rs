//! Sonata runtime orchestrator.
//!
//! Coordinates the pipeline, the distributor and the supervised workers
//! through one orchestration run:
//!
//! ```text
//! bind output listener ─► bootstrap workers ─► pipeline pass
//!                                                   │
//!        wait on workers ◄── send_stream_config ◄── send_init
//! ```
//!
//! The pipeline and distributor locks are taken before the output listener
//! starts and held until the initial configuration is delivered, so output
//! events and refinements that arrive early are sent only after `Init`.
//! Locks are always taken in that order: pipeline, then distributor.
//!
//! # Usage
//!
//! ```ignore
//! let runtime = SonataRuntime::new(RuntimeConfig::from(&config_file), Collaborators::reference());
//! let handle = runtime.handle();
//!
//! // Later refinements from another task
//! handle.apply_refinement(&more_queries).await?;
//!
//! runtime.run(process_workers(&config_file), &queries).await?;
//! ```

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::config::RuntimeConfig;
use super::error::RuntimeError;
use crate::bootstrap::BootstrapSequencer;
use crate::channel::{ConfigChannel, TcpConfigChannel};
use crate::distributor::{ControlPlaneDistributor, DistributorError, SharedDistributor};
use crate::feedback::OutputFeedbackLoop;
use crate::pipeline::{Collaborators, PassOutput, QueryPipeline};
use crate::protocol::DeltaContent;
use crate::query::{CompiledDpQuery, CompiledSpQuery, LogicalQuery};
use crate::supervisor::WorkerSet;
use crate::workers::OutputListener;

/// The orchestrator.
pub struct SonataRuntime<C: ConfigChannel = TcpConfigChannel> {
    config: RuntimeConfig,
    pipeline: Arc<Mutex<QueryPipeline>>,
    distributor: SharedDistributor<C>,
    shutdown: CancellationToken,
}

impl SonataRuntime<TcpConfigChannel> {
    /// Create a runtime delivering configuration over TCP.
    pub fn new(config: RuntimeConfig, collaborators: Collaborators) -> Self {
        let distributor = ControlPlaneDistributor::tcp(
            config.fm_endpoint.clone(),
            config.sm_endpoint.clone(),
            &config.distributor,
        )
        .into_shared();
        Self::with_distributor(config, collaborators, distributor)
    }
}

impl<C: ConfigChannel> SonataRuntime<C> {
    /// Create a runtime around an existing distributor.
    pub fn with_distributor(
        config: RuntimeConfig,
        collaborators: Collaborators,
        distributor: SharedDistributor<C>,
    ) -> Self {
        let pipeline = QueryPipeline::new(collaborators, config.pipeline.clone());
        Self {
            config,
            pipeline: Arc::new(Mutex::new(pipeline)),
            distributor,
            shutdown: CancellationToken::new(),
        }
    }

    /// A cloneable handle for refinements and shutdown.
    pub fn handle(&self) -> RuntimeHandle<C> {
        RuntimeHandle {
            pipeline: Arc::clone(&self.pipeline),
            distributor: Arc::clone(&self.distributor),
            shutdown: self.shutdown.clone(),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Token cancelled by [`shutdown`](Self::shutdown).
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancel every worker; `run` returns once they have stopped.
    pub fn shutdown(&self) {
        info!("Shutting down Sonata runtime");
        self.shutdown.cancel();
    }

    /// Run the orchestrator until shutdown or the first unit failure.
    ///
    /// `workers` are the manager and emitter workers; the output listener
    /// is added here. `queries` are compiled in one pass and pushed as the
    /// initial configuration once every worker is ready.
    pub async fn run(
        &self,
        workers: WorkerSet,
        queries: &[LogicalQuery],
    ) -> Result<(), RuntimeError> {
        info!(
            fm = %self.config.fm_endpoint,
            sm = %self.config.sm_endpoint,
            op = %self.config.op_socket,
            queries = queries.len(),
            "Starting Sonata runtime"
        );

        let mut pipeline = self.pipeline.lock().await;
        let mut distributor = self.distributor.lock().await;

        let feedback = OutputFeedbackLoop::bind(
            &self.config.op_socket,
            Arc::clone(&self.distributor),
            self.config.feedback.clone(),
        )
        .await?;

        let mut workers = workers;
        workers.push(OutputListener::new(feedback));

        let bootstrapped = BootstrapSequencer::new(self.config.bootstrap.clone())
            .start(workers, &self.shutdown)
            .await?;

        let pushed = async {
            let pass = pipeline.run(queries)?;
            distributor.send_init(&pass.dp_queries).await?;
            distributor.send_stream_config(pipeline.sp_queries()).await?;
            Ok::<_, RuntimeError>(pass)
        }
        .await;
        drop(distributor);
        drop(pipeline);

        match pushed {
            Ok(pass) => info!(compiled = pass.len(), "Initial configuration distributed"),
            Err(e) => {
                error!(stage = e.stage(), error = %e, "Initial configuration failed");
                bootstrapped.shutdown_token().cancel();
                if let Err(worker_error) = bootstrapped.wait().await {
                    error!(error = %worker_error, "Worker failed while stopping");
                }
                return Err(e);
            }
        }

        bootstrapped.wait().await?;
        info!("Sonata runtime stopped");
        Ok(())
    }
}

/// Cloneable access to a running orchestrator.
pub struct RuntimeHandle<C: ConfigChannel = TcpConfigChannel> {
    pipeline: Arc<Mutex<QueryPipeline>>,
    distributor: SharedDistributor<C>,
    shutdown: CancellationToken,
}

impl<C: ConfigChannel> Clone for RuntimeHandle<C> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            distributor: Arc::clone(&self.distributor),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<C: ConfigChannel> RuntimeHandle<C> {
    /// Compile `queries` and push them as an update.
    ///
    /// The new data-plane queries go to the fabric manager as a
    /// `Delta::Queries`; the streaming manager receives the full
    /// stream-plane set. Both locks are held until both are sent, so
    /// refinements never interleave. Fails with
    /// [`DistributorError::NotInitialized`], compiling nothing, before the
    /// initial configuration has gone out.
    pub async fn apply_refinement(
        &self,
        queries: &[LogicalQuery],
    ) -> Result<PassOutput, RuntimeError> {
        let mut pipeline = self.pipeline.lock().await;
        let mut distributor = self.distributor.lock().await;
        if !distributor.is_initialized() {
            return Err(DistributorError::NotInitialized.into());
        }

        let pass = pipeline.run(queries)?;
        distributor
            .send_delta(DeltaContent::Queries(pass.dp_queries.clone()))
            .await?;
        distributor.send_stream_config(pipeline.sp_queries()).await?;

        info!(compiled = pass.len(), "Refinement distributed");
        Ok(pass)
    }

    /// All data-plane queries compiled so far.
    pub async fn dp_queries(&self) -> Vec<CompiledDpQuery> {
        self.pipeline.lock().await.dp_queries().to_vec()
    }

    /// All stream-plane queries compiled so far.
    pub async fn sp_queries(&self) -> Vec<CompiledSpQuery> {
        self.pipeline.lock().await.sp_queries().to_vec()
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
