use crate::{
    CustomerId, MonotonicClock, Result, SessionConfig, TimeSource, Token, TokenGenerator,
    hash::slot_index,
};
use dashmap::{DashMap, mapref::entry::Entry};
use parking_lot::Mutex;
use portable_atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// A live (or not yet swept) session.
#[derive(Debug)]
struct Session {
    token: Token,
    last_access_ms: u64,
    /// Set by the sweep before the session leaves its shard. A caller that
    /// cloned the handle earlier must treat it as gone.
    removed: bool,
}

impl Session {
    const fn new(token: Token, now: u64) -> Self {
        Self {
            token,
            last_access_ms: now,
            removed: false,
        }
    }

    fn is_expired(&self, now: u64, idle_timeout_ms: u64) -> bool {
        now.saturating_sub(self.last_access_ms) > idle_timeout_ms
    }

    fn touch(&mut self, now: u64) {
        self.last_access_ms = self.last_access_ms.max(now);
    }
}

type SessionHandle = Arc<Mutex<Session>>;

/// `customer id -> session`, each session behind its own lock.
type Shard = DashMap<CustomerId, SessionHandle>;

/// Outcome of sweeping one shard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Index of the shard that was visited.
    pub shard: usize,
    /// Sessions present when the sweep started.
    pub scanned: usize,
    /// Expired sessions evicted, together with their reverse-index entries.
    pub removed: usize,
}

/// Sharded session registry with a reverse token index.
///
/// ## Locking
///
/// Every session sits behind its own mutex. Shard maps are only locked long
/// enough to find, insert or remove a handle, never while a session mutex is
/// held by the same caller, so unrelated customers never wait on each other's
/// session. Lock order is session, then shard map, then reverse index.
///
/// - Refreshing or replacing a session happens under that session's mutex,
///   which makes "check expiry, then replace" atomic for the customer.
/// - A first session is inserted through the shard map's entry, so
///   concurrent first calls agree on one handle.
/// - The sweep takes the same session mutex, marks an expired session as
///   removed, then drops it from the reverse index and the shard. A lookup
///   therefore can never revive a session the sweep has judged expired.
///
/// A token is only issued once the reverse index holds no entry for it, so
/// two live sessions never share a token.
#[derive(Debug)]
pub struct SessionStore<T = MonotonicClock>
where
    T: TimeSource,
{
    shards: Box<[Shard]>,
    reverse: DashMap<Token, CustomerId>,
    generator: TokenGenerator<T>,
    idle_timeout_ms: u64,
    config: SessionConfig,
    sweep_cursor: AtomicUsize,
}

impl<T> SessionStore<T>
where
    T: TimeSource,
{
    /// Creates an empty store. `time` stamps both token generation and
    /// session access times.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` does not validate.
    ///
    /// [`Error::InvalidConfig`]: crate::Error::InvalidConfig
    pub fn new(config: SessionConfig, time: T) -> Result<Self> {
        config.validate()?;
        Ok(Self::new_unchecked(config, time))
    }

    fn new_unchecked(config: SessionConfig, time: T) -> Self {
        let shards = (0..config.shard_count).map(|_| DashMap::new()).collect();
        Self {
            shards,
            reverse: DashMap::with_capacity(256),
            generator: TokenGenerator::new(time),
            idle_timeout_ms: config.idle_timeout.as_millis() as u64,
            config,
            sweep_cursor: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Sessions currently stored, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the reverse index holds an entry for `token`, regardless of
    /// the session's expiry.
    pub fn contains_token(&self, token: &Token) -> bool {
        self.reverse.contains_key(token)
    }

    fn now(&self) -> u64 {
        self.generator.time().current_millis()
    }

    fn shard_for(&self, customer_id: CustomerId) -> &Shard {
        &self.shards[slot_index(customer_id, self.shards.len())]
    }

    /// Clones the customer's session handle out of its shard.
    fn handle(&self, customer_id: CustomerId) -> Option<SessionHandle> {
        self.shard_for(customer_id)
            .get(&customer_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Generates a token no other session holds and indexes it under
    /// `customer_id`.
    fn issue_token(&self, customer_id: CustomerId) -> Token {
        loop {
            let token = self.generator.generate();
            match self.reverse.entry(token) {
                Entry::Vacant(entry) => {
                    entry.insert(customer_id);
                    return token;
                }
                Entry::Occupied(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(customer_id, %token, "token still in use, regenerating");
                }
            }
        }
    }

    /// Returns the customer's live token, or issues a new one.
    ///
    /// An unexpired session is refreshed and its token returned. Otherwise a
    /// fresh token replaces the expired session and its reverse-index entry.
    /// Concurrent calls for one customer agree on a single token.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn get_or_create_session(&self, customer_id: CustomerId) -> Token {
        loop {
            let handle = match self.handle(customer_id) {
                Some(handle) => handle,
                None => match self.shard_for(customer_id).entry(customer_id) {
                    Entry::Occupied(entry) => Arc::clone(entry.get()),
                    Entry::Vacant(entry) => {
                        let fresh = self.issue_token(customer_id);
                        entry.insert(Arc::new(Mutex::new(Session::new(fresh, self.now()))));

                        #[cfg(feature = "tracing")]
                        tracing::trace!(customer_id, %fresh, "created session");

                        return fresh;
                    }
                },
            };

            let mut session = handle.lock();
            if session.removed {
                // Swept after the handle was cloned; the shard no longer
                // holds it.
                continue;
            }
            let now = self.now();
            if !session.is_expired(now, self.idle_timeout_ms) {
                session.touch(now);
                return session.token;
            }

            let stale = session.token;
            self.reverse
                .remove_if(&stale, |_, owner| *owner == customer_id);
            let fresh = self.issue_token(customer_id);
            *session = Session::new(fresh, now);

            #[cfg(feature = "tracing")]
            tracing::trace!(customer_id, %stale, %fresh, "replaced expired session");

            return fresh;
        }
    }

    /// Resolves `token` to its customer, refreshing the session.
    ///
    /// Returns `None` if the token is unknown, if its session has expired
    /// (swept or not), or if the customer has since moved to another token.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn find_customer_id(&self, token: &Token) -> Option<CustomerId> {
        // Copy the id out so the index guard is released before any other
        // lock is taken.
        let customer_id = self.reverse.get(token).map(|entry| *entry.value())?;

        let handle = self.handle(customer_id)?;
        let mut session = handle.lock();
        let now = self.now();
        if session.removed
            || session.token != *token
            || session.is_expired(now, self.idle_timeout_ms)
        {
            return None;
        }
        session.touch(now);
        Some(customer_id)
    }

    /// Parses `raw` and resolves it like [`Self::find_customer_id`].
    /// Malformed input is treated as an unknown token.
    pub fn validate(&self, raw: &str) -> Option<CustomerId> {
        let token = raw.parse::<Token>().ok()?;
        self.find_customer_id(&token)
    }

    /// Sweeps the next shard in round-robin order.
    pub fn sweep_next_shard(&self) -> SweepReport {
        let count = self.shards.len();
        let shard = self
            .sweep_cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |i| Some((i + 1) % count))
            .unwrap_or_default();
        self.sweep_shard(shard)
    }

    /// Sweeps every shard once.
    pub fn sweep_all(&self) -> usize {
        (0..self.shards.len())
            .map(|shard| self.sweep_shard(shard).removed)
            .sum()
    }

    /// Evicts expired sessions from one shard along with their reverse-index
    /// entries.
    ///
    /// Each session is judged under its own mutex; the shard is never locked
    /// as a whole.
    ///
    /// # Panics
    ///
    /// Panics if `shard` is out of range.
    pub fn sweep_shard(&self, shard: usize) -> SweepReport {
        let sessions = &self.shards[shard];
        // Snapshot the handles first: removing while iterating would
        // deadlock on the map's own locks.
        let handles: Vec<(CustomerId, SessionHandle)> = sessions
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        let now = self.now();
        let mut removed = 0;
        for (customer_id, handle) in &handles {
            let mut session = handle.lock();
            if session.removed || !session.is_expired(now, self.idle_timeout_ms) {
                continue;
            }
            session.removed = true;
            self.reverse
                .remove_if(&session.token, |_, owner| owner == customer_id);
            sessions.remove_if(customer_id, |_, current| Arc::ptr_eq(current, handle));
            removed += 1;

            #[cfg(feature = "tracing")]
            tracing::trace!(shard, customer_id, token = %session.token, "evicted expired session");
        }

        let report = SweepReport {
            shard,
            scanned: handles.len(),
            removed,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(shard, scanned = report.scanned, removed, "swept session shard");

        report
    }
}

impl Default for SessionStore<MonotonicClock> {
    fn default() -> Self {
        Self::new_unchecked(SessionConfig::default(), MonotonicClock::default())
    }
}
