use portable_atomic::{AtomicU64, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{MonotonicClock, SessionKey, TimeSource, Token};

/// A lock-free session token generator suitable for multi-threaded
/// environments.
///
/// Each token packs the current millisecond (relative to [`EPOCH`]) with a
/// value drawn from one shared, atomically incremented sequence counter, then
/// encodes the result into eight base56 symbols.
///
/// ## Features
/// - ✅ Thread-safe, never blocks and never fails
/// - ✅ Tolerates clock regression: the sequence always advances
///
/// ## Caveats
/// Uniqueness is bounded, not absolute. Two tokens can only collide if
/// - more than 2^20 tokens are issued against one clock reading, so the
///   sequence field wraps, or
/// - two packed values differ by a multiple of 56^8, which first happens
///   about 25.6 hours apart, far beyond any session's idle window.
///
/// Neither case is detected.
///
/// [`EPOCH`]: crate::EPOCH
#[derive(Debug)]
pub struct TokenGenerator<T = MonotonicClock>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    sequence: crossbeam_utils::CachePadded<AtomicU64>,
    #[cfg(not(feature = "cache-padded"))]
    sequence: AtomicU64,
    time: T,
}

impl<T> TokenGenerator<T>
where
    T: TimeSource,
{
    /// Creates a generator with its sequence starting at zero.
    ///
    /// # Example
    /// ```
    /// use stakeboard::{MonotonicClock, TokenGenerator};
    ///
    /// let generator = TokenGenerator::new(MonotonicClock::default());
    /// let a = generator.generate();
    /// let b = generator.generate();
    /// assert_ne!(a, b);
    /// assert_eq!(a.as_str().len(), 8);
    /// ```
    pub fn new(time: T) -> Self {
        Self::with_sequence(0, time)
    }

    /// Creates a generator whose first token uses `sequence`.
    ///
    /// Useful to exercise sequence wrap-around in tests.
    pub fn with_sequence(sequence: u64, time: T) -> Self {
        Self {
            #[cfg(feature = "cache-padded")]
            sequence: crossbeam_utils::CachePadded::new(AtomicU64::new(sequence)),
            #[cfg(not(feature = "cache-padded"))]
            sequence: AtomicU64::new(sequence),
            time,
        }
    }

    /// Returns the next packed session key.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_key(&self) -> SessionKey {
        let now = self.time.current_millis();
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        SessionKey::from_components(now, sequence)
    }

    /// Returns a fresh token.
    pub fn generate(&self) -> Token {
        Token::from_session_key(self.next_key())
    }

    /// The time source this generator stamps tokens with.
    pub fn time(&self) -> &T {
        &self.time
    }
}

impl Default for TokenGenerator<MonotonicClock> {
    fn default() -> Self {
        Self::new(MonotonicClock::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ALPHABET, ManualClock};
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread::scope;

    const CONCURRENCY_LEVEL: usize = 1000;

    fn is_well_formed(token: &Token) -> bool {
        token.as_bytes().len() == 8 && token.as_bytes().iter().all(|b| ALPHABET.contains(b))
    }

    #[test]
    fn sequence_increments_within_same_tick() {
        let generator = TokenGenerator::new(ManualClock::new(42));
        let k1 = generator.next_key();
        let k2 = generator.next_key();
        let k3 = generator.next_key();

        assert_eq!(k1.timestamp(), 42);
        assert_eq!(k3.timestamp(), 42);
        assert_eq!(k1.sequence(), 0);
        assert_eq!(k2.sequence(), 1);
        assert_eq!(k3.sequence(), 2);
        assert!(k1 < k2 && k2 < k3);
    }

    #[test]
    fn clock_regression_still_yields_distinct_tokens() {
        let clock = ManualClock::new(10_000);
        let generator = TokenGenerator::new(clock.clone());
        let before = generator.generate();
        clock.set(9_000);
        let after = generator.generate();
        clock.set(10_000);
        let again = generator.generate();

        assert_ne!(before, after);
        assert_ne!(before, again);
        assert_ne!(after, again);
    }

    #[test]
    fn sequence_wraps_into_the_next_slot_without_touching_timestamp() {
        let generator = TokenGenerator::with_sequence(SessionKey::max_sequence(), ManualClock::new(5));
        let last = generator.next_key();
        let wrapped = generator.next_key();
        assert_eq!(last.sequence(), SessionKey::max_sequence());
        assert_eq!(wrapped.sequence(), 0);
        assert_eq!(wrapped.timestamp(), 5);
    }

    #[test]
    fn tokens_are_unique_and_well_formed_under_concurrency() {
        let generator = TokenGenerator::default();
        let seen = Mutex::new(HashSet::with_capacity(CONCURRENCY_LEVEL));
        let barrier = Barrier::new(CONCURRENCY_LEVEL);

        scope(|s| {
            for _ in 0..CONCURRENCY_LEVEL {
                s.spawn(|| {
                    barrier.wait();
                    let token = generator.generate();
                    assert!(is_well_formed(&token), "malformed token: {token}");
                    assert!(seen.lock().unwrap().insert(token), "duplicate token: {token}");
                });
            }
        });

        assert_eq!(seen.into_inner().unwrap().len(), CONCURRENCY_LEVEL);
    }

    #[test]
    fn frozen_clock_still_yields_unique_tokens_across_threads() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 10_000;

        let generator = Arc::new(TokenGenerator::new(ManualClock::new(1)));
        let seen = Mutex::new(HashSet::with_capacity(THREADS * PER_THREAD));

        scope(|s| {
            for _ in 0..THREADS {
                let generator = Arc::clone(&generator);
                let seen = &seen;
                s.spawn(move || {
                    let local: Vec<Token> = (0..PER_THREAD).map(|_| generator.generate()).collect();
                    let mut seen = seen.lock().unwrap();
                    for token in local {
                        assert!(seen.insert(token));
                    }
                });
            }
        });

        assert_eq!(seen.into_inner().unwrap().len(), THREADS * PER_THREAD);
    }
}
