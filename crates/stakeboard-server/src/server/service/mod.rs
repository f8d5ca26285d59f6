//! HTTP service wiring.
//!
//! ## Structure
//!
//! - [`handler`] - [`StakeHandler`](handler::StakeHandler), the shared state
//!   that turns requests into worker-pool jobs.
//! - [`routes`] - the axum [`Router`](axum::Router) and request parsing.

pub mod handler;
pub mod routes;
