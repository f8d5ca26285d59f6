use crate::{Error, Result};
use core::time::Duration;

/// Tuning knobs for a [`SessionStore`].
///
/// [`SessionStore`]: crate::SessionStore
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long a session may sit unused before it expires.
    pub idle_timeout: Duration,
    /// Delay between two sweeps. Each sweep visits a single shard.
    pub sweep_interval: Duration,
    /// Number of independently locked shards.
    pub shard_count: usize,
}

impl SessionConfig {
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);
    pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

    #[must_use]
    pub const fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    #[must_use]
    pub const fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    #[must_use]
    pub const fn with_shard_count(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count;
        self
    }

    /// Time for the sweeper to visit every shard once.
    pub fn full_sweep_cycle(&self) -> Duration {
        self.sweep_interval
            .saturating_mul(u32::try_from(self.shard_count).unwrap_or(u32::MAX))
    }

    /// Rejects configurations the store cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when there are no shards or the sweep
    /// interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.shard_count == 0 {
            return Err(Error::InvalidConfig {
                reason: "session shard count must be greater than 0",
            });
        }
        if self.sweep_interval.is_zero() {
            return Err(Error::InvalidConfig {
                reason: "sweep interval must be greater than 0",
            });
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    /// Ten minute idle window, five second sweep interval, one shard per
    /// available CPU.
    fn default() -> Self {
        Self {
            idle_timeout: Self::DEFAULT_IDLE_TIMEOUT,
            sweep_interval: Self::DEFAULT_SWEEP_INTERVAL,
            shard_count: num_cpus::get().max(1),
        }
    }
}
