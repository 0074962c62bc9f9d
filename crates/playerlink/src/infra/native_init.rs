//! Process-wide one-time initialization of the native engine library.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};

/// Lazy-once initializer. A failed attempt leaves the state uninitialized so
/// the next caller retries.
pub struct InitOnce {
    done: AtomicBool,
    lock: Mutex<()>,
    name: &'static str,
}

impl InitOnce {
    pub const fn new(name: &'static str) -> Self {
        Self {
            done: AtomicBool::new(false),
            lock: Mutex::new(()),
            name,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Runs `init` unless a previous call already succeeded.
    ///
    /// Concurrent callers block until the running attempt finishes.
    pub fn ensure<E, F>(&self, init: F) -> Result<(), E>
    where
        F: FnOnce() -> Result<(), E>,
        E: std::fmt::Display,
    {
        if self.is_done() {
            return Ok(());
        }
        let _guard = self.lock.lock();
        if self.is_done() {
            return Ok(());
        }
        match init() {
            Ok(()) => {
                self.done.store(true, Ordering::Release);
                debug!(init = self.name, "process-wide init completed");
                Ok(())
            },
            Err(error) => {
                warn!(init = self.name, %error, "process-wide init failed");
                Err(error)
            },
        }
    }
}

/// Library loading and native global setup, shared by every worker host.
pub(crate) static NATIVE_INIT: InitOnce = InitOnce::new("native_engine");

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::InitOnce;

    #[test]
    fn init_runs_once_across_threads() {
        let once = Arc::new(InitOnce::new("test"));
        let calls = Arc::new(AtomicUsize::new(0));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let once = Arc::clone(&once);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    once.ensure(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok::<(), String>(())
                    })
                })
            })
            .collect();
        for thread in threads {
            thread.join().expect("join").expect("init ok");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(once.is_done());
    }

    #[test]
    fn failed_init_is_retried() {
        let once = InitOnce::new("test");
        let first = once.ensure(|| Err::<(), _>("library missing".to_string()));
        assert_eq!(first, Err("library missing".to_string()));
        assert!(!once.is_done());
        once.ensure(|| Ok::<(), String>(())).expect("second attempt");
        assert!(once.is_done());
    }
}
