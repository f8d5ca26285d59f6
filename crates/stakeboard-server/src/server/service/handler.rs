//! Request execution for the HTTP routes.
//!
//! [`StakeHandler`] owns the worker pool serving a [`BettingService`]. Routes
//! call it with already-parsed arguments; it dispatches the store operation to
//! a worker and shapes the answer for the wire.

use crate::server::{
    config::ServerConfig,
    error::{ApiError, Result},
    pool::{manager::WorkerPool, request::Job},
    telemetry::{increment_sessions_issued, increment_stakes_submitted},
};
use stakeboard::{BettingService, CustomerId, OfferId, RankedStake, Stake, Token};
use std::sync::Arc;

#[derive(Clone)]
pub struct StakeHandler {
    worker_pool: Arc<WorkerPool>,
}

impl StakeHandler {
    /// Creates the handler and spawns its worker pool on the current runtime.
    pub fn new(service: BettingService, config: &ServerConfig) -> Self {
        let worker_pool = WorkerPool::spawn(
            service,
            config.num_workers,
            config.worker_queue_capacity(),
            config.shutdown_timeout,
        );
        Self {
            worker_pool: Arc::new(worker_pool),
        }
    }

    /// Returns the customer's live session token, creating one if needed.
    pub async fn session(&self, customer_id: CustomerId) -> Result<Token> {
        let token = self
            .worker_pool
            .call(|response| Job::Session {
                customer_id,
                response,
            })
            .await?;
        increment_sessions_issued();
        Ok(token)
    }

    /// Resolves `token` to the customer owning a live session.
    ///
    /// # Errors
    ///
    /// [`ApiError::Unauthorized`] when the token does not name a live session.
    pub async fn authenticate(&self, token: String) -> Result<CustomerId> {
        self.worker_pool
            .call(|response| Job::Authenticate { token, response })
            .await?
            .ok_or(ApiError::Unauthorized)
    }

    /// Records `stake` for an authenticated customer. Returns whether the
    /// offer's ranking changed.
    pub async fn stake(
        &self,
        offer_id: OfferId,
        customer_id: CustomerId,
        stake: Stake,
    ) -> Result<bool> {
        let changed = self
            .worker_pool
            .call(|response| Job::Stake {
                offer_id,
                customer_id,
                stake,
                response,
            })
            .await?;
        increment_stakes_submitted();
        Ok(changed)
    }

    /// The offer's ranking as `customer=stake` pairs joined by commas.
    pub async fn high_stakes(&self, offer_id: OfferId) -> Result<String> {
        let top = self
            .worker_pool
            .call(|response| Job::HighStakes { offer_id, response })
            .await?;
        Ok(to_csv(&top))
    }

    /// Stops accepting work and waits for the workers to finish their queues.
    pub async fn shutdown(&self) {
        self.worker_pool.shutdown().await;
    }
}

fn to_csv(rows: &[RankedStake]) -> String {
    rows.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
