use crate::{
    CustomerId, Leaderboard, LeaderboardConfig, MonotonicClock, OfferId, RankedStake, Result,
    SessionConfig, SessionStore, Stake, Sweeper, TimeSource, Token,
};
use std::sync::Arc;

/// The four operations a transport layer needs, over one session store and
/// one leaderboard.
///
/// Cloning is cheap; clones share both stores.
///
/// # Example
///
/// ```
/// use stakeboard::{BettingService, RankedStake};
///
/// let service = BettingService::default();
/// let token = service.get_or_create_session(1234);
///
/// let customer_id = service.validate_session(token.as_str()).unwrap();
/// service.submit_stake(888, customer_id, 4500);
///
/// assert_eq!(service.top_stakes(888), [RankedStake::new(1234, 4500)]);
/// ```
#[derive(Debug)]
pub struct BettingService<T = MonotonicClock>
where
    T: TimeSource,
{
    sessions: Arc<SessionStore<T>>,
    leaderboard: Arc<Leaderboard>,
}

impl<T> BettingService<T>
where
    T: TimeSource,
{
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if either configuration does not
    /// validate.
    ///
    /// [`Error::InvalidConfig`]: crate::Error::InvalidConfig
    pub fn new(
        session_config: SessionConfig,
        leaderboard_config: LeaderboardConfig,
        time: T,
    ) -> Result<Self> {
        Ok(Self::from_parts(
            Arc::new(SessionStore::new(session_config, time)?),
            Arc::new(Leaderboard::new(leaderboard_config)?),
        ))
    }

    pub fn from_parts(sessions: Arc<SessionStore<T>>, leaderboard: Arc<Leaderboard>) -> Self {
        Self {
            sessions,
            leaderboard,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore<T>> {
        &self.sessions
    }

    pub fn leaderboard(&self) -> &Arc<Leaderboard> {
        &self.leaderboard
    }

    pub fn get_or_create_session(&self, customer_id: CustomerId) -> Token {
        self.sessions.get_or_create_session(customer_id)
    }

    /// Resolves a raw token. `None` means the caller is unauthenticated.
    pub fn validate_session(&self, token: &str) -> Option<CustomerId> {
        self.sessions.validate(token)
    }

    /// Returns `true` when the stake changed the offer's ranking.
    pub fn submit_stake(&self, offer_id: OfferId, customer_id: CustomerId, stake: Stake) -> bool {
        self.leaderboard.submit_stake(offer_id, customer_id, stake)
    }

    pub fn top_stakes(&self, offer_id: OfferId) -> Vec<RankedStake> {
        self.leaderboard.top_stakes(offer_id)
    }
}

impl<T> BettingService<T>
where
    T: TimeSource + Send + Sync + 'static,
{
    /// Starts the session sweeper. See [`SessionStore::spawn_sweeper`].
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread could not be spawned.
    pub fn spawn_sweeper(&self) -> std::io::Result<Sweeper> {
        self.sessions.spawn_sweeper()
    }
}

impl<T> Clone for BettingService<T>
where
    T: TimeSource,
{
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            leaderboard: Arc::clone(&self.leaderboard),
        }
    }
}

impl Default for BettingService<MonotonicClock> {
    fn default() -> Self {
        Self::from_parts(
            Arc::new(SessionStore::default()),
            Arc::new(Leaderboard::default()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;
    use core::time::Duration;

    fn service() -> (BettingService<ManualClock>, ManualClock) {
        let clock = ManualClock::new(0);
        let service = BettingService::new(
            SessionConfig::default(),
            LeaderboardConfig::default(),
            clock.clone(),
        )
        .unwrap();
        (service, clock)
    }

    #[test]
    fn session_then_stake_then_ranking() {
        let (service, _clock) = service();
        let token = service.get_or_create_session(1234);
        let customer_id = service.validate_session(token.as_str()).unwrap();
        assert_eq!(customer_id, 1234);

        for stake in 1..=100 {
            service.submit_stake(888, customer_id, stake);
        }
        assert_eq!(service.top_stakes(888), [RankedStake::new(1234, 100)]);
        assert!(service.top_stakes(999).is_empty());
    }

    #[test]
    fn expired_session_does_not_validate() {
        let (service, clock) = service();
        let token = service.get_or_create_session(1);
        clock.advance(SessionConfig::DEFAULT_IDLE_TIMEOUT + Duration::from_millis(1));
        assert_eq!(service.validate_session(token.as_str()), None);
        assert_eq!(service.validate_session("not-a-token"), None);
    }

    #[test]
    fn clones_share_state() {
        let (service, _clock) = service();
        let other = service.clone();
        let token = service.get_or_create_session(5);
        assert_eq!(other.validate_session(token.as_str()), Some(5));
        other.submit_stake(1, 5, 10);
        assert_eq!(service.top_stakes(1).len(), 1);
    }

    #[test]
    fn invalid_config_is_reported() {
        let result = BettingService::new(
            SessionConfig::default().with_shard_count(0),
            LeaderboardConfig::default(),
            ManualClock::new(0),
        );
        assert!(matches!(result, Err(crate::Error::InvalidConfig { .. })));
    }
}
