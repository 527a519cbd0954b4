//! Runtime error types.

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::distributor::DistributorError;
use crate::feedback::FeedbackError;
use crate::pipeline::PipelineError;
use crate::supervisor::WorkerError;

/// Errors that stop the orchestrator.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("query pipeline failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("configuration delivery failed: {0}")]
    Distributor(#[from] DistributorError),

    #[error("output listener failed: {0}")]
    Feedback(#[from] FeedbackError),

    #[error("bootstrap failed: {0}")]
    Bootstrap(#[from] BootstrapError),

    #[error("worker failed: {0}")]
    Worker(#[from] WorkerError),
}

impl RuntimeError {
    /// The orchestration stage the failure belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Pipeline(e) => e.stage().as_str(),
            Self::Distributor(_) => "distribute",
            Self::Feedback(FeedbackError::Bind { .. }) => "bootstrap",
            Self::Feedback(FeedbackError::Forward(_)) => "distribute",
            Self::Bootstrap(e) => e.stage(),
            Self::Worker(WorkerError::Feedback(FeedbackError::Forward(_))) => "distribute",
            Self::Worker(_) => "worker",
        }
    }
}
