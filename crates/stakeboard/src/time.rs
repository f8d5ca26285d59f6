use core::time::Duration;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Token epoch: Wednesday, January 1, 2025 00:00:00 UTC
///
/// Timestamps packed into session keys and recorded as session access times
/// are milliseconds relative to this origin.
pub const EPOCH: Duration = Duration::from_millis(1_735_689_600_000);

/// A trait for time sources that return a monotonic millisecond timestamp.
///
/// This abstraction allows you to plug in the ticking [`MonotonicClock`] in
/// production, or a [`ManualClock`] in tests where session expiry has to be
/// driven deterministically.
///
/// # Example
///
/// ```
/// use stakeboard::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1234);
/// ```
///
/// [`MonotonicClock`]: crate::MonotonicClock
pub trait TimeSource {
    /// Returns the current time in milliseconds since the configured epoch.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same counter, so a test can hand one clone to a store and
/// keep another to advance time past a session's idle window.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock reading `millis`.
    pub fn new(millis: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(millis)),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.as_millis() as u64, Ordering::Relaxed);
    }

    /// Sets the clock to an absolute reading. Moving backwards is allowed so
    /// tests can simulate clock regression.
    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::Relaxed);
    }
}

impl TimeSource for ManualClock {
    fn current_millis(&self) -> u64 {
        self.millis.load(Ordering::Relaxed)
    }
}
