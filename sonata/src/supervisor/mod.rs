//! Worker supervision.
//!
//! Every long-running unit of the orchestrator (the two managers, the
//! emitter and the output listener) implements [`Worker`]. A worker runs as
//! its own tokio task and reports readiness through a one-shot
//! [`ReadySignal`]; its [`SupervisedWorker`] handle observes both the
//! signal and the task outcome.
//!
//! # Lifecycle
//!
//! 1. **Collect**: workers are added to a [`WorkerSet`]
//! 2. **Spawn**: [`spawn`] starts a worker task with a fresh ready signal
//! 3. **Ready**: [`SupervisedWorker::wait_ready`] resolves once the worker
//!    signals, or fails if the task ends or the timeout passes first
//! 4. **Join**: [`SupervisedWorker::join`] waits for the task outcome

mod error;

pub use error::WorkerError;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// The units the orchestrator supervises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    FabricManager,
    Emitter,
    StreamingManager,
    OutputListener,
}

impl WorkerKind {
    /// Bootstrap start order.
    pub const START_ORDER: [WorkerKind; 4] = [
        WorkerKind::FabricManager,
        WorkerKind::Emitter,
        WorkerKind::StreamingManager,
        WorkerKind::OutputListener,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerKind::FabricManager => "fabric-manager",
            WorkerKind::Emitter => "emitter",
            WorkerKind::StreamingManager => "streaming-manager",
            WorkerKind::OutputListener => "output-listener",
        }
    }

    /// Position in [`START_ORDER`](Self::START_ORDER).
    pub fn start_rank(&self) -> usize {
        match self {
            WorkerKind::FabricManager => 0,
            WorkerKind::Emitter => 1,
            WorkerKind::StreamingManager => 2,
            WorkerKind::OutputListener => 3,
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One-shot readiness notification handed to a starting worker.
#[derive(Debug)]
pub struct ReadySignal {
    tx: oneshot::Sender<()>,
}

impl ReadySignal {
    pub fn channel() -> (ReadySignal, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (ReadySignal { tx }, rx)
    }

    /// Report the worker ready. Dropping the signal without calling this
    /// means the worker never became ready.
    pub fn signal(self) {
        // Receiver gone means nobody is waiting any more.
        let _ = self.tx.send(());
    }
}

/// A supervised unit.
///
/// `start` runs for the worker's whole life: it must call
/// [`ReadySignal::signal`] once it can serve, then keep running until
/// `shutdown` is cancelled. Returning early, with or without an error,
/// counts as a failure of the unit: [`spawn`] reports a clean return
/// before cancellation as [`WorkerError::Exited`].
pub trait Worker: Send + 'static {
    fn kind(&self) -> WorkerKind;

    fn start(
        self,
        ready: ReadySignal,
        shutdown: CancellationToken,
    ) -> impl Future<Output = Result<(), WorkerError>> + Send;
}

type Launch = Box<
    dyn FnOnce(ReadySignal, CancellationToken) -> BoxFuture<'static, Result<(), WorkerError>>
        + Send,
>;

/// A worker that has not been started yet.
pub struct PendingWorker {
    kind: WorkerKind,
    launch: Launch,
}

impl PendingWorker {
    pub fn new<W: Worker>(worker: W) -> Self {
        Self {
            kind: worker.kind(),
            launch: Box::new(move |ready, shutdown| worker.start(ready, shutdown).boxed()),
        }
    }

    pub fn kind(&self) -> WorkerKind {
        self.kind
    }
}

impl fmt::Debug for PendingWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingWorker").field("kind", &self.kind).finish()
    }
}

/// The workers handed to the bootstrap sequencer.
#[derive(Debug, Default)]
pub struct WorkerSet {
    workers: Vec<PendingWorker>,
}

impl WorkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<W: Worker>(&mut self, worker: W) {
        self.workers.push(PendingWorker::new(worker));
    }

    pub fn with<W: Worker>(mut self, worker: W) -> Self {
        self.push(worker);
        self
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Take the workers out, sorted into bootstrap start order.
    ///
    /// Workers of the same kind keep their insertion order.
    pub fn into_start_order(mut self) -> Vec<PendingWorker> {
        self.workers.sort_by_key(|w| w.kind.start_rank());
        self.workers
    }
}

/// Start a worker on its own task.
pub fn spawn(worker: PendingWorker, shutdown: CancellationToken) -> SupervisedWorker {
    let (ready, ready_rx) = ReadySignal::channel();
    let kind = worker.kind;
    let task = (worker.launch)(ready, shutdown.clone());
    let handle = tokio::spawn(async move {
        task.await?;
        if shutdown.is_cancelled() {
            Ok(())
        } else {
            Err(WorkerError::Exited {
                kind,
                status: "stopped without being cancelled".to_string(),
            })
        }
    });
    debug!(worker = %kind, "Worker task spawned");

    SupervisedWorker {
        kind,
        ready_rx: Some(ready_rx),
        handle: Some(handle),
        outcome: None,
    }
}

/// Handle to a running worker task.
#[derive(Debug)]
pub struct SupervisedWorker {
    kind: WorkerKind,
    ready_rx: Option<oneshot::Receiver<()>>,
    handle: Option<JoinHandle<Result<(), WorkerError>>>,
    outcome: Option<Result<(), WorkerError>>,
}

impl SupervisedWorker {
    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    /// Wait for the worker's ready signal.
    ///
    /// Fails with the worker's own error if its task ends first, or with
    /// [`WorkerError::ReadinessTimeout`] once `timeout` passes.
    pub async fn wait_ready(&mut self, timeout: Duration) -> Result<(), WorkerError> {
        let Some(ready_rx) = self.ready_rx.take() else {
            return Ok(());
        };

        match tokio::time::timeout(timeout, ready_rx).await {
            Ok(Ok(())) => {
                info!(worker = %self.kind, "Worker ready");
                Ok(())
            }
            Ok(Err(_)) => {
                // Signal dropped: the task has ended or is about to.
                let outcome = self.finish().await;
                match outcome {
                    Err(e) => Err(e),
                    Ok(()) => Err(WorkerError::Exited {
                        kind: self.kind,
                        status: "stopped before signalling readiness".to_string(),
                    }),
                }
            }
            Err(_) => Err(WorkerError::ReadinessTimeout {
                kind: self.kind,
                timeout,
            }),
        }
    }

    /// Wait for the worker task to end.
    pub async fn join(mut self) -> Result<(), WorkerError> {
        match self.outcome.take() {
            Some(outcome) => outcome,
            None => self.finish().await,
        }
    }

    /// Await the task, remembering the outcome for a later `join`.
    async fn finish(&mut self) -> Result<(), WorkerError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        let outcome = match handle.await {
            Ok(result) => result,
            Err(e) => join_error(self.kind, e),
        };

        match outcome {
            Ok(()) => {
                self.outcome = Some(Ok(()));
                Ok(())
            }
            Err(e) => {
                // The caller gets the error; later joins see a plain exit.
                self.outcome = Some(Err(WorkerError::Exited {
                    kind: self.kind,
                    status: e.to_string(),
                }));
                Err(e)
            }
        }
    }
}

fn join_error(kind: WorkerKind, e: JoinError) -> Result<(), WorkerError> {
    if e.is_cancelled() {
        return Ok(());
    }
    let message = match e.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string()),
        Err(e) => e.to_string(),
    };
    Err(WorkerError::Panicked { kind, message })
}
