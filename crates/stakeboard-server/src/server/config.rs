use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use stakeboard::{HistoryPolicy, LeaderboardConfig, SessionConfig};

/// Runtime configuration for the `stakeboard-server` binary.
///
/// Every setting can be passed as a CLI flag or through the environment (a
/// `.env` file is loaded first). Defaults size the worker pool and the lock
/// stripes from the number of available CPUs.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "stakeboard-server",
    version,
    about = "An HTTP service for betting sessions and per-offer high stakes"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8001"))]
    pub server_addr: String,

    /// Number of worker tasks executing requests. Defaults to the number of
    /// available CPUs.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS")]
    pub num_workers: Option<usize>,

    /// Total queued requests across all workers.
    ///
    /// Split evenly between workers. A request that finds its worker's queue
    /// full runs on the accepting task instead of being dropped.
    ///
    /// Environment variable: `QUEUE_CAPACITY`
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = 1000)]
    pub queue_capacity: usize,

    /// Idle time after which a session expires.
    ///
    /// Environment variable: `SESSION_TIMEOUT_SECS`
    #[arg(long, env = "SESSION_TIMEOUT_SECS", default_value_t = 600)]
    pub session_timeout_secs: u64,

    /// Delay between two single-shard sweeps.
    ///
    /// Environment variable: `SWEEP_INTERVAL_SECS`
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value_t = 5)]
    pub sweep_interval_secs: u64,

    /// Session shards. Defaults to the number of available CPUs.
    ///
    /// Environment variable: `SESSION_SHARDS`
    #[arg(long, env = "SESSION_SHARDS")]
    pub session_shards: Option<usize>,

    /// Entries returned by `/{offer}/highstakes`.
    ///
    /// Environment variable: `LEADERBOARD_CAPACITY`
    #[arg(long, env = "LEADERBOARD_CAPACITY", default_value_t = LeaderboardConfig::DEFAULT_CAPACITY)]
    pub leaderboard_capacity: usize,

    /// Lock segments per offer. Defaults to four per available CPU.
    ///
    /// Environment variable: `LOCK_SEGMENTS`
    #[arg(long, env = "LOCK_SEGMENTS")]
    pub lock_segments: Option<usize>,

    /// Stakes kept per customer and offer: `max-only` or `full`.
    ///
    /// Environment variable: `STAKE_HISTORY`
    #[arg(long, env = "STAKE_HISTORY", default_value_t = HistoryPolicy::MaxOnly)]
    pub stake_history: HistoryPolicy,

    /// Seconds to wait for workers to acknowledge shutdown.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT_SECS`
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value_t = 3)]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub num_workers: usize,
    pub queue_capacity: usize,
    pub shutdown_timeout: Duration,
    pub session: SessionConfig,
    pub leaderboard: LeaderboardConfig,
}

impl ServerConfig {
    /// Queue slots per worker, never fewer than one.
    pub fn worker_queue_capacity(&self) -> usize {
        (self.queue_capacity / self.num_workers).max(1)
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let cpus = num_cpus::get().max(1);
        let num_workers = args.num_workers.unwrap_or(cpus);

        if num_workers == 0 {
            bail!("NUM_WORKERS must be greater than 0");
        }
        if args.queue_capacity == 0 {
            bail!("QUEUE_CAPACITY must be greater than 0");
        }
        if args.session_timeout_secs == 0 {
            bail!("SESSION_TIMEOUT_SECS must be greater than 0");
        }

        let session = SessionConfig::default()
            .with_idle_timeout(Duration::from_secs(args.session_timeout_secs))
            .with_sweep_interval(Duration::from_secs(args.sweep_interval_secs))
            .with_shard_count(args.session_shards.unwrap_or(cpus));
        session.validate()?;

        let leaderboard = LeaderboardConfig::default()
            .with_capacity(args.leaderboard_capacity)
            .with_segment_count(args.lock_segments.unwrap_or(cpus * 4))
            .with_history(args.stake_history);
        leaderboard.validate()?;

        Ok(Self {
            server_addr: args.server_addr,
            num_workers,
            queue_capacity: args.queue_capacity,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout_secs),
            session,
            leaderboard,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<ServerConfig> {
        let argv = core::iter::once("stakeboard-server").chain(args.iter().copied());
        ServerConfig::try_from(CliArgs::try_parse_from(argv)?)
    }

    #[test]
    fn defaults_are_valid() {
        let config = parse(&["--num-workers", "4"]).unwrap();
        assert_eq!(config.num_workers, 4);
        assert_eq!(config.queue_capacity, 1000);
        assert_eq!(config.worker_queue_capacity(), 250);
        assert_eq!(config.session.idle_timeout, Duration::from_secs(600));
        assert_eq!(config.session.sweep_interval, Duration::from_secs(5));
        assert_eq!(config.leaderboard.capacity, 20);
        assert_eq!(config.leaderboard.history, HistoryPolicy::MaxOnly);
    }

    #[test]
    fn small_queues_still_give_each_worker_a_slot() {
        let config = parse(&["--num-workers", "8", "--queue-capacity", "3"]).unwrap();
        assert_eq!(config.worker_queue_capacity(), 1);
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(parse(&["--num-workers", "0"]).is_err());
        assert!(parse(&["--queue-capacity", "0"]).is_err());
        assert!(parse(&["--session-shards", "0"]).is_err());
        assert!(parse(&["--sweep-interval-secs", "0"]).is_err());
        assert!(parse(&["--leaderboard-capacity", "0"]).is_err());
    }

    #[test]
    fn history_policy_is_parsed() {
        let config = parse(&["--stake-history", "full"]).unwrap();
        assert_eq!(config.leaderboard.history, HistoryPolicy::Full);
        assert!(parse(&["--stake-history", "some"]).is_err());
    }
}
