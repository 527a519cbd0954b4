//! Bootstrap sequencing.
//!
//! Starts the supervised workers in a fixed order and holds the caller back
//! until every one of them has signalled readiness:
//!
//! ```text
//! fabric manager ─► emitter ─► streaming manager ─► output listener
//!        │              │               │                  │
//!        └──────────────┴─── ready? ────┴──────────────────┘
//!                                │
//!                           Bootstrapped
//! ```
//!
//! Nothing may be pushed to the managers before [`BootstrapSequencer::start`]
//! returns successfully.

mod error;

pub use error::BootstrapError;

use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::supervisor::{self, SupervisedWorker, WorkerError, WorkerKind, WorkerSet};

/// Default bound on the whole readiness phase.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(30);

/// Bootstrap configuration.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Time allowed, from the first start, for all workers to become ready.
    pub readiness_timeout: Duration,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            readiness_timeout: DEFAULT_READINESS_TIMEOUT,
        }
    }
}

impl From<&crate::config::BootstrapSettings> for BootstrapConfig {
    fn from(settings: &crate::config::BootstrapSettings) -> Self {
        Self {
            readiness_timeout: Duration::from_secs(settings.readiness_timeout_secs),
        }
    }
}

/// Starts workers in order and waits for readiness.
#[derive(Debug, Clone, Default)]
pub struct BootstrapSequencer {
    config: BootstrapConfig,
}

impl BootstrapSequencer {
    pub fn new(config: BootstrapConfig) -> Self {
        Self { config }
    }

    /// Start every worker and wait until all are ready.
    ///
    /// Workers receive a child of `shutdown`. On failure every started
    /// worker is cancelled and awaited before the error is returned.
    pub async fn start(
        &self,
        workers: WorkerSet,
        shutdown: &CancellationToken,
    ) -> Result<Bootstrapped, BootstrapError> {
        let token = shutdown.child_token();
        let deadline = Instant::now() + self.config.readiness_timeout;

        let mut running: Vec<SupervisedWorker> = Vec::with_capacity(workers.len());
        for pending in workers.into_start_order() {
            info!(worker = %pending.kind(), "Starting worker");
            running.push(supervisor::spawn(pending, token.clone()));
        }

        let mut failure = None;
        for worker in running.iter_mut() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let outcome = tokio::select! {
                _ = shutdown.cancelled() => Err(BootstrapError::Cancelled),
                ready = worker.wait_ready(remaining) => ready.map_err(|e| {
                    BootstrapError::from_worker(worker.kind(), self.config.readiness_timeout, e)
                }),
            };

            if let Err(e) = outcome {
                failure = Some(e);
                break;
            }
        }

        if let Some(e) = failure {
            error!(error = %e, "Bootstrap failed");
            token.cancel();
            drain(running).await;
            return Err(e);
        }

        info!(workers = running.len(), "All workers ready");
        Ok(Bootstrapped {
            workers: running,
            shutdown: token,
        })
    }
}

/// Workers that have all signalled readiness.
#[derive(Debug)]
pub struct Bootstrapped {
    workers: Vec<SupervisedWorker>,
    shutdown: CancellationToken,
}

impl Bootstrapped {
    pub fn kinds(&self) -> Vec<WorkerKind> {
        self.workers.iter().map(|w| w.kind()).collect()
    }

    /// Token cancelling every worker in this set.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Wait until every worker has stopped.
    ///
    /// The first worker to fail cancels the rest; its error is returned once
    /// they have all wound down.
    pub async fn wait(self) -> Result<(), WorkerError> {
        let mut outcomes: FuturesUnordered<_> = self
            .workers
            .into_iter()
            .map(|worker| {
                let kind = worker.kind();
                async move { (kind, worker.join().await) }
            })
            .collect();

        let mut first_failure: Option<WorkerError> = None;

        while let Some((kind, outcome)) = outcomes.next().await {
            match outcome {
                Ok(()) => info!(worker = %kind, "Worker stopped"),
                Err(e) => {
                    if first_failure.is_none() {
                        error!(worker = %kind, error = %e, "Worker failed, stopping the rest");
                        self.shutdown.cancel();
                        first_failure = Some(e);
                    } else {
                        warn!(worker = %kind, error = %e, "Worker failed during shutdown");
                    }
                }
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Wait for cancelled workers to finish.
async fn drain(workers: Vec<SupervisedWorker>) {
    for worker in workers {
        let kind = worker.kind();
        if let Err(e) = worker.join().await {
            warn!(worker = %kind, error = %e, "Worker failed while stopping");
        }
    }
}
