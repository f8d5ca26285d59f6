use super::request::WorkRequest;
use stakeboard::BettingService;
use tokio::sync::mpsc;

/// Worker task processing [`WorkRequest`]s until told to stop.
///
/// Jobs are short and never block on I/O, so they run directly on the
/// worker's task. Jobs queued ahead of a [`WorkRequest::Shutdown`] still run,
/// which lets in-flight requests finish during a graceful shutdown.
pub async fn worker_loop(
    worker_id: usize,
    mut rx: mpsc::Receiver<WorkRequest>,
    service: BettingService,
) {
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} started");

    while let Some(work) = rx.recv().await {
        match work {
            WorkRequest::Job(job) => job.run(&service),
            WorkRequest::Shutdown { response } => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Worker {worker_id} received shutdown signal");

                if response.send(()).is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Worker {worker_id} failed to acknowledge shutdown");
                }
                break;
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} stopped");
}
