//! Round-robin dispatch over bounded worker queues.
//!
//! Each worker owns one bounded [`mpsc`] channel. When the chosen worker's
//! queue is full the job runs on the calling task instead (caller-runs), so
//! load is shed by slowing the acceptor down rather than by dropping work.

use super::{
    request::{Job, WorkRequest},
    worker::worker_loop,
};
use crate::server::{
    error::{ApiError, Result},
    telemetry::increment_caller_runs,
};
use core::time::Duration;
use stakeboard::BettingService;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::{
    sync::{
        mpsc::{self, error::TrySendError},
        oneshot,
    },
    time::timeout,
};
use tokio_util::sync::CancellationToken;

pub struct WorkerPool {
    workers: Vec<mpsc::Sender<WorkRequest>>,
    next_worker: AtomicUsize,
    service: BettingService,
    shutdown_token: CancellationToken,
    shutdown_timeout: Duration,
}

impl WorkerPool {
    /// Spawns `num_workers` worker tasks on the current runtime, each with
    /// `queue_capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, or if `num_workers` or
    /// `queue_capacity` is zero.
    pub fn spawn(
        service: BettingService,
        num_workers: usize,
        queue_capacity: usize,
        shutdown_timeout: Duration,
    ) -> Self {
        assert!(num_workers > 0, "worker pool needs at least one worker");

        let shutdown_token = CancellationToken::new();
        let workers = (0..num_workers)
            .map(|worker_id| {
                let (tx, rx) = mpsc::channel(queue_capacity);
                tokio::spawn(worker_loop(worker_id, rx, service.clone()));
                tx
            })
            .collect();

        Self {
            workers,
            next_worker: AtomicUsize::new(0),
            service,
            shutdown_token,
            shutdown_timeout,
        }
    }

    /// Returns the index of the next worker to receive work (round-robin).
    pub fn next_worker_index(&self) -> usize {
        self.next_worker.fetch_add(1, Ordering::Relaxed) % self.workers.len()
    }

    /// Hands `job` to the next worker, or runs it inline if that worker's
    /// queue is full.
    ///
    /// # Errors
    ///
    /// - [`ApiError::ServiceShutdown`] once shutdown has started.
    /// - [`ApiError::Channel`] if the worker's channel is closed.
    pub fn dispatch(&self, job: Job) -> Result<()> {
        if self.shutdown_token.is_cancelled() {
            return Err(ApiError::ServiceShutdown);
        }

        let worker_idx = self.next_worker_index();
        match self.workers[worker_idx].try_send(WorkRequest::Job(job)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(WorkRequest::Job(job))) => {
                #[cfg(feature = "tracing")]
                tracing::trace!("Worker {worker_idx} queue full, running inline");
                increment_caller_runs();
                job.run(&self.service);
                Ok(())
            }
            Err(TrySendError::Full(WorkRequest::Shutdown { .. }) | TrySendError::Closed(_)) => {
                Err(ApiError::Channel {
                    context: format!("Worker {worker_idx} channel closed"),
                })
            }
        }
    }

    /// Dispatches a job built around a fresh response channel and awaits the
    /// answer.
    ///
    /// # Errors
    ///
    /// Everything [`Self::dispatch`] returns, plus [`ApiError::Channel`] if
    /// the worker dropped the job without answering.
    pub async fn call<T>(&self, job: impl FnOnce(oneshot::Sender<T>) -> Job) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.dispatch(job(tx))?;
        rx.await.map_err(|_| ApiError::Channel {
            context: "worker dropped the response".to_string(),
        })
    }

    /// Gracefully shuts down all workers in the pool.
    ///
    /// - Cancels the shared [`CancellationToken`] so no new job is accepted.
    /// - Sends a [`WorkRequest::Shutdown`] to each worker, behind the jobs
    ///   already queued.
    /// - Waits up to the configured timeout for the acknowledgements.
    pub async fn shutdown(&self) {
        #[cfg(feature = "tracing")]
        tracing::info!("Refusing new requests");
        self.shutdown_token.cancel();

        #[cfg(feature = "tracing")]
        tracing::debug!("Notifying all workers to shut down");
        let mut acks = Vec::with_capacity(self.workers.len());
        for (i, worker) in self.workers.iter().enumerate() {
            let (tx, rx) = oneshot::channel();
            match worker.send(WorkRequest::Shutdown { response: tx }).await {
                Ok(()) => acks.push((i, rx)),
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Failed to send shutdown to worker {i}: {_e}");
                }
            }
        }

        let shutdown_timeout = self.shutdown_timeout;
        let waits = acks.into_iter().map(|(_i, rx)| async move {
            match timeout(shutdown_timeout, rx).await {
                Ok(Ok(())) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("Worker {_i} shutdown acknowledged");
                }
                Ok(Err(_e)) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Worker {_i} returned error: {_e}");
                }
                Err(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Worker {_i} shutdown timed out");
                }
            }
        });
        futures::future::join_all(waits).await;

        #[cfg(feature = "tracing")]
        tracing::info!("Worker pool shutdown complete");
    }

    #[cfg(test)]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }
}
