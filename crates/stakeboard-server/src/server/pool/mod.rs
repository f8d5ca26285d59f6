//! Bounded worker pool executing store operations off the accepting task.
//!
//! - [`manager`]: round-robin dispatch, caller-runs overflow, shutdown.
//! - [`request`]: the messages workers receive.
//! - [`worker`]: the per-worker receive loop.

pub mod manager;
pub mod request;
pub mod worker;
