//! Per-node lock
//!
//! Every structural node that supports mutation owns a `NodeLock` around its
//! data. The lock serves two protocols:
//!
//! ```text
//! mutation:       write() -> mutate field -> journal entry -> drop guard
//! force release:  write_timeout() -> persist -> release -> drop guard
//! ```
//!
//! Because both take the same exclusive lock, a persisted snapshot never
//! observes a mutation whose journal entry is still being written.
//! `TryRelease` uses `try_write()` and skips on contention; serialization for
//! `StoreOnly` only needs `read()`.

use arbor_core::{Error, Result};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// Reader-writer lock guarding one node's data
#[derive(Debug, Default)]
pub struct NodeLock<T> {
    inner: RwLock<T>,
}

impl<T> NodeLock<T> {
    /// Wrap a value
    pub fn new(value: T) -> Self {
        NodeLock {
            inner: RwLock::new(value),
        }
    }

    /// Shared access, blocking
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.read()
    }

    /// Shared access, without blocking
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, T>> {
        self.inner.try_read()
    }

    /// Exclusive access, blocking until available
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.inner.write()
    }

    /// Exclusive access, without blocking
    ///
    /// Returns `None` if any reader or writer currently holds the lock.
    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, T>> {
        self.inner.try_write()
    }

    /// Exclusive access, waiting at most `timeout`
    pub fn write_timeout(&self, timeout: Duration) -> Result<RwLockWriteGuard<'_, T>> {
        let started = Instant::now();
        self.inner
            .try_write_for(timeout)
            .ok_or_else(|| Error::LockTimeout {
                waited_ms: started.elapsed().as_millis() as u64,
            })
    }

    /// Shared access, waiting at most `timeout`
    pub fn read_timeout(&self, timeout: Duration) -> Result<RwLockReadGuard<'_, T>> {
        let started = Instant::now();
        self.inner
            .try_read_for(timeout)
            .ok_or_else(|| Error::LockTimeout {
                waited_ms: started.elapsed().as_millis() as u64,
            })
    }

    /// Run `f` with exclusive access
    pub fn with_write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.inner.write();
        f(&mut guard)
    }

    /// Whether a writer currently holds the lock
    pub fn is_locked_exclusive(&self) -> bool {
        self.inner.is_locked_exclusive()
    }

    /// Consume the lock and return the value
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}
