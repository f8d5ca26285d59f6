use crate::{EPOCH, TimeSource};
use core::time::Duration;
use portable_atomic::{AtomicU64, Ordering};
use std::{
    sync::{Arc, OnceLock},
    thread::{self, JoinHandle},
    time::{Instant, SystemTime, UNIX_EPOCH},
};

/// Shared ticker thread that updates every millisecond.
#[derive(Debug)]
struct SharedTickerInner {
    current: AtomicU64,
    _handle: OnceLock<JoinHandle<()>>,
}

/// A monotonic time source that returns elapsed time since construction,
/// offset from a fixed epoch.
///
/// Session expiry must not jump when the wall clock is adjusted (NTP, manual
/// changes), so the clock anchors to `SystemTime` once and then advances from
/// a monotonic `Instant`. A background thread publishes the elapsed
/// milliseconds into a shared atomic so reads on the hot path are a single
/// load. The thread holds a weak reference and exits once every clone of the
/// clock has been dropped.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    inner: Arc<SharedTickerInner>,
    epoch_offset: u64, // in milliseconds
}

impl Default for MonotonicClock {
    /// Constructs a monotonic clock aligned to [`EPOCH`].
    fn default() -> Self {
        Self::with_epoch(EPOCH)
    }
}

impl MonotonicClock {
    /// Constructs a monotonic clock using `epoch` (a [`Duration`] since
    /// 1970-01-01 UTC) as the origin.
    ///
    /// If the system clock reads earlier than `epoch` the clock starts at zero
    /// instead of failing; readings stay monotonic either way.
    ///
    /// # Example
    ///
    /// ```
    /// use stakeboard::{MonotonicClock, TimeSource};
    ///
    /// let clock = MonotonicClock::default();
    /// let first = clock.current_millis();
    /// std::thread::sleep(std::time::Duration::from_millis(3));
    /// assert!(clock.current_millis() >= first);
    /// ```
    pub fn with_epoch(epoch: Duration) -> Self {
        let start = Instant::now();
        let offset = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|now| now.checked_sub(epoch))
            .map_or(0, |since| since.as_millis() as u64);

        let inner = Arc::new(SharedTickerInner {
            current: AtomicU64::new(0),
            _handle: OnceLock::new(),
        });

        let weak_inner = Arc::downgrade(&inner);
        let handle = thread::Builder::new()
            .name("stakeboard-clock".into())
            .spawn(move || {
                let mut tick = 0;

                loop {
                    let Some(inner_ref) = weak_inner.upgrade() else {
                        break;
                    };

                    // Absolute target time of the next tick
                    let target = start + Duration::from_millis(tick);

                    let now = Instant::now();
                    if now < target {
                        drop(inner_ref);
                        thread::sleep(target - now);
                        continue;
                    }

                    let now_ms = start.elapsed().as_millis() as u64;
                    inner_ref.current.store(now_ms, Ordering::Relaxed);

                    // Align to next tick after the current actual time
                    tick = now_ms + 1;
                }
            });

        // Without a ticker the clock reads a constant offset. Sessions then
        // never expire by themselves, which is preferable to aborting.
        if let Ok(handle) = handle {
            let _ = inner._handle.set(handle);
        }

        Self {
            inner,
            epoch_offset: offset,
        }
    }
}

impl TimeSource for MonotonicClock {
    /// Returns the number of milliseconds since the configured epoch, based on
    /// the elapsed monotonic time since construction.
    fn current_millis(&self) -> u64 {
        self.epoch_offset + self.inner.current.load(Ordering::Relaxed)
    }
}
