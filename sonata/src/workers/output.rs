//! The output feedback loop as a supervised worker.

use tokio_util::sync::CancellationToken;

use crate::channel::{ConfigChannel, TcpConfigChannel};
use crate::feedback::OutputFeedbackLoop;
use crate::supervisor::{ReadySignal, Worker, WorkerError, WorkerKind};

/// Runs an already bound [`OutputFeedbackLoop`].
///
/// Ready as soon as it starts, since the socket is bound beforehand.
pub struct OutputListener<C: ConfigChannel = TcpConfigChannel> {
    feedback: OutputFeedbackLoop<C>,
}

impl<C: ConfigChannel> OutputListener<C> {
    pub fn new(feedback: OutputFeedbackLoop<C>) -> Self {
        Self { feedback }
    }
}

impl<C: ConfigChannel> Worker for OutputListener<C> {
    fn kind(&self) -> WorkerKind {
        WorkerKind::OutputListener
    }

    async fn start(
        self,
        ready: ReadySignal,
        shutdown: CancellationToken,
    ) -> Result<(), WorkerError> {
        ready.signal();
        self.feedback.run(shutdown).await?;
        Ok(())
    }
}
