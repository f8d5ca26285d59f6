use crate::{SessionStore, TimeSource};
use portable_atomic::{AtomicBool, Ordering};
use std::{
    sync::{Arc, Weak},
    thread::{self, JoinHandle},
    time::Instant,
};

/// Handle to the background thread evicting expired sessions.
///
/// The thread visits one shard per [`sweep_interval`], so every shard is
/// visited once per [`full_sweep_cycle`]. It only holds a weak reference to
/// the store and exits on its own once the store is dropped. Dropping the
/// handle stops the thread and waits for it.
///
/// [`sweep_interval`]: crate::SessionConfig::sweep_interval
/// [`full_sweep_cycle`]: crate::SessionConfig::full_sweep_cycle
#[derive(Debug)]
pub struct Sweeper {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Signals the thread to stop and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<T> SessionStore<T>
where
    T: TimeSource + Send + Sync + 'static,
{
    /// Starts the background sweeper for this store.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread could not be spawned.
    ///
    /// # Example
    ///
    /// ```
    /// use stakeboard::{ManualClock, SessionConfig, SessionStore};
    /// use std::sync::Arc;
    ///
    /// let store = Arc::new(SessionStore::new(SessionConfig::default(), ManualClock::new(0)).unwrap());
    /// let sweeper = store.spawn_sweeper().unwrap();
    /// sweeper.stop();
    /// ```
    pub fn spawn_sweeper(self: &Arc<Self>) -> std::io::Result<Sweeper> {
        let stop = Arc::new(AtomicBool::new(false));
        let interval = self.config().sweep_interval;
        let weak: Weak<Self> = Arc::downgrade(self);
        let stopped = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("stakeboard-sweeper".into())
            .spawn(move || {
                let mut deadline = Instant::now() + interval;
                while !stopped.load(Ordering::Acquire) {
                    let now = Instant::now();
                    if now < deadline {
                        // May wake early, either spuriously or from `stop`.
                        thread::park_timeout(deadline - now);
                        continue;
                    }
                    deadline = now + interval;

                    let Some(store) = weak.upgrade() else {
                        break;
                    };
                    store.sweep_next_shard();
                }

                #[cfg(feature = "tracing")]
                tracing::debug!("session sweeper exited");
            })?;

        Ok(Sweeper {
            stop,
            handle: Some(handle),
        })
    }
}
