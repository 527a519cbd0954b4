//! Workers backed by an external process.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::options::WorkerOptions;
use crate::supervisor::{ReadySignal, Worker, WorkerError, WorkerKind};

/// Default interval between readiness probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(100);

/// A manager or emitter running as a separate process.
///
/// When a command is configured it is launched on start and killed on
/// shutdown. The worker counts as ready once its endpoint accepts a TCP
/// connection, or immediately when probing is disabled or no endpoint is
/// set.
#[derive(Debug, Clone)]
pub struct ProcessWorker {
    kind: WorkerKind,
    options: WorkerOptions,
    probe_interval: Duration,
    probe: bool,
}

impl ProcessWorker {
    pub fn new(kind: WorkerKind, options: WorkerOptions) -> Self {
        Self {
            kind,
            options,
            probe_interval: DEFAULT_PROBE_INTERVAL,
            probe: true,
        }
    }

    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    /// Signal readiness without probing the endpoint.
    ///
    /// For workers whose endpoint is a destination they send to rather than
    /// an address they listen on.
    pub fn without_probe(mut self) -> Self {
        self.probe = false;
        self
    }

    pub fn options(&self) -> &WorkerOptions {
        &self.options
    }

    fn launch(&self) -> Result<Option<Child>, WorkerError> {
        let Some(program) = &self.options.command else {
            return Ok(None);
        };

        let child = Command::new(program)
            .args(&self.options.args)
            .envs(self.options.environment())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| WorkerError::Spawn {
                kind: self.kind,
                command: program.clone(),
                source,
            })?;

        info!(
            worker = %self.kind,
            command = %program,
            pid = ?child.id(),
            "Worker process launched"
        );
        Ok(Some(child))
    }

    /// Poll the endpoint until it accepts a connection.
    async fn probe_endpoint(&self) {
        let endpoint = match (&self.options.endpoint, self.probe) {
            (Some(endpoint), true) => endpoint,
            _ => return,
        };

        let mut probes: u64 = 0;
        loop {
            probes += 1;
            match TcpStream::connect(endpoint).await {
                Ok(_) => {
                    debug!(
                        worker = %self.kind,
                        endpoint = %endpoint,
                        probes,
                        "Endpoint accepting connections"
                    );
                    return;
                }
                Err(e) => {
                    trace!(
                        worker = %self.kind,
                        endpoint = %endpoint,
                        error = %e,
                        "Endpoint not ready"
                    );
                    tokio::time::sleep(self.probe_interval).await;
                }
            }
        }
    }

    fn exited(&self, status: std::io::Result<ExitStatus>) -> WorkerError {
        let status = match status {
            Ok(status) => status.to_string(),
            Err(e) => format!("wait failed: {}", e),
        };
        WorkerError::Exited {
            kind: self.kind,
            status,
        }
    }
}

impl Worker for ProcessWorker {
    fn kind(&self) -> WorkerKind {
        self.kind
    }

    async fn start(
        self,
        ready: ReadySignal,
        shutdown: CancellationToken,
    ) -> Result<(), WorkerError> {
        let mut child = self.launch()?;

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                stop(self.kind, child.as_mut()).await;
                return Ok(());
            }

            status = wait_child(child.as_mut()) => {
                return Err(self.exited(status));
            }

            _ = self.probe_endpoint() => {}
        }

        ready.signal();

        tokio::select! {
            _ = shutdown.cancelled() => {
                stop(self.kind, child.as_mut()).await;
                Ok(())
            }

            status = wait_child(child.as_mut()) => {
                warn!(worker = %self.kind, "Worker process exited unexpectedly");
                Err(self.exited(status))
            }
        }
    }
}

/// Wait for the child to exit; never resolves when there is no child.
async fn wait_child(child: Option<&mut Child>) -> std::io::Result<ExitStatus> {
    match child {
        Some(child) => child.wait().await,
        None => std::future::pending().await,
    }
}

async fn stop(kind: WorkerKind, child: Option<&mut Child>) {
    let Some(child) = child else {
        return;
    };
    match child.kill().await {
        Ok(()) => debug!(worker = %kind, "Worker process stopped"),
        Err(e) => warn!(worker = %kind, error = %e, "Failed to stop worker process"),
    }
}
