//! Lock coordination around queue critical sections

use crate::io::error::QueueError;
use crate::io::fs::Filesystem;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{trace, warn};

/// How to wait for the queue lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum LockPolicy {
    /// Wait as long as it takes
    #[default]
    Blocking,

    /// Poll with exponential backoff and give up after `max_retries` retries:
    /// - Attempt 0: No wait
    /// - Attempt 1: 50ms wait
    /// - Attempt 2: 100ms wait
    /// - Attempt n: 50ms * 2^(n-1) wait
    Retry { max_retries: u32 },
}

/// Held queue lock; released on [`LockGuard::release`] or drop
pub struct LockGuard<'a, F: Filesystem + ?Sized> {
    fs: &'a F,
    path: &'a Path,
    lock: Option<F::Lock>,
}

impl<F: Filesystem + ?Sized> LockGuard<'_, F> {
    /// Release now instead of at end of scope
    pub fn release(mut self) {
        self.unlock();
    }

    fn unlock(&mut self) {
        if let Some(lock) = self.lock.take() {
            match self.fs.unlock(lock) {
                Ok(()) => trace!(path = %self.path.display(), "lock released"),
                // The handle is closed regardless, which drops the advisory lock
                Err(e) => warn!(path = %self.path.display(), "failed to release lock: {e}"),
            }
        }
    }
}

impl<F: Filesystem + ?Sized> Drop for LockGuard<'_, F> {
    fn drop(&mut self) {
        self.unlock();
    }
}

/// Serializes critical sections across every process sharing one lock file
pub struct LockCoordinator<'a, F: Filesystem + ?Sized> {
    fs: &'a F,
    path: &'a Path,
    policy: LockPolicy,
}

impl<'a, F: Filesystem + ?Sized> LockCoordinator<'a, F> {
    pub fn new(fs: &'a F, path: &'a Path, policy: LockPolicy) -> Self {
        Self { fs, path, policy }
    }

    /// Acquire the lock according to the configured policy
    pub fn acquire(&self) -> Result<LockGuard<'a, F>, QueueError> {
        let lock = match self.policy {
            LockPolicy::Blocking => self
                .fs
                .lock(self.path)
                .map_err(|e| QueueError::io(self.path, e))?,
            LockPolicy::Retry { max_retries } => self.acquire_with_backoff(max_retries)?,
        };
        trace!(path = %self.path.display(), "lock acquired");

        Ok(LockGuard {
            fs: self.fs,
            path: self.path,
            lock: Some(lock),
        })
    }

    fn acquire_with_backoff(&self, max_retries: u32) -> Result<F::Lock, QueueError> {
        for attempt in 0..=max_retries {
            if let Some(lock) = self
                .fs
                .try_lock(self.path)
                .map_err(|e| QueueError::io(self.path, e))?
            {
                return Ok(lock);
            }

            if attempt < max_retries {
                let wait_ms = 50u64 * (1u64 << attempt.min(16));
                std::thread::sleep(Duration::from_millis(wait_ms));
            }
        }

        Err(QueueError::LockTimeout {
            path: self.path.to_path_buf(),
            retries: max_retries,
        })
    }

    /// Run `section` while holding the lock
    ///
    /// The lock is released before this returns, whether the section
    /// succeeded, failed or panicked. Anything that must not run under the
    /// lock (such as delivering to receivers) belongs after this call.
    pub fn run<T>(
        &self,
        section: impl FnOnce() -> Result<T, QueueError>,
    ) -> Result<T, QueueError> {
        let guard = self.acquire()?;
        let result = section();
        guard.release();
        result
    }
}
