use crate::{Error, Result};
use core::{fmt, str::FromStr};

/// Which stakes a [`Leaderboard`] keeps per customer and offer.
///
/// Ranking only ever looks at the maximum, so both policies rank identically.
///
/// [`Leaderboard`]: crate::Leaderboard
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HistoryPolicy {
    /// Keep the personal maximum only.
    #[default]
    MaxOnly,
    /// Keep every accepted stake in submission order as well.
    Full,
}

impl fmt::Display for HistoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MaxOnly => "max-only",
            Self::Full => "full",
        })
    }
}

impl FromStr for HistoryPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "max-only" => Ok(Self::MaxOnly),
            "full" => Ok(Self::Full),
            _ => Err(Error::InvalidConfig {
                reason: "stake history must be `max-only` or `full`",
            }),
        }
    }
}

/// Tuning knobs for a [`Leaderboard`].
///
/// [`Leaderboard`]: crate::Leaderboard
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardConfig {
    /// Entries kept in each offer's ranking.
    pub capacity: usize,
    /// Lock segments per offer.
    pub segment_count: usize,
    pub history: HistoryPolicy,
}

impl LeaderboardConfig {
    pub const DEFAULT_CAPACITY: usize = 20;

    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub const fn with_segment_count(mut self, segment_count: usize) -> Self {
        self.segment_count = segment_count;
        self
    }

    #[must_use]
    pub const fn with_history(mut self, history: HistoryPolicy) -> Self {
        self.history = history;
        self
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when the capacity or the segment count
    /// is zero.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::InvalidConfig {
                reason: "leaderboard capacity must be greater than 0",
            });
        }
        if self.segment_count == 0 {
            return Err(Error::InvalidConfig {
                reason: "lock segment count must be greater than 0",
            });
        }
        Ok(())
    }
}

impl Default for LeaderboardConfig {
    /// Top 20, four lock segments per available CPU, maximum-only history.
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            segment_count: num_cpus::get().max(1) * 4,
            history: HistoryPolicy::default(),
        }
    }
}
