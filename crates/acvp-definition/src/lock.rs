//! Reference-counted locks shared by records backed by the same file.
//!
//! Every vendor, module-info and OE config file read by the loader gets one
//! [`DefLock`]. Each definition bound from that file adopts the lock through a
//! [`LockRef`] instead of getting its own copy, so all definitions that share
//! a physical file serialize their read-modify-write cycles on one mutex.
//!
//! Adoption and release are tied to the lifetime of `LockRef`: creating one
//! increments the holder count, dropping it decrements. The lock memory is
//! freed once the last `DefLock` handle and the last `LockRef` are gone, so a
//! lock that was allocated but never adopted is reclaimed as soon as the
//! loader drops its load-time handle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct LockInner {
    mutex: Mutex<()>,
    holders: AtomicUsize,
}

/// A lock allocated for one config file, not yet tied to any record.
#[derive(Debug, Clone)]
pub struct DefLock {
    inner: Arc<LockInner>,
}

impl DefLock {
    /// Allocate an unlocked lock with no holders.
    pub fn allocate() -> Self {
        DefLock {
            inner: Arc::new(LockInner::default()),
        }
    }

    /// Adopt the lock for one record.
    pub fn adopt(&self) -> LockRef {
        self.inner.holders.fetch_add(1, Ordering::AcqRel);
        LockRef {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of records currently holding this lock.
    pub fn holders(&self) -> usize {
        self.inner.holders.load(Ordering::Acquire)
    }

    /// Observe the lock without keeping it alive.
    pub fn downgrade(&self) -> WeakLock {
        WeakLock {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

/// One record's adoption of a [`DefLock`].
///
/// Cloning adopts again; dropping releases.
#[derive(Debug)]
pub struct LockRef {
    inner: Arc<LockInner>,
}

impl LockRef {
    /// Block until the mutex is held. The guard unlocks on drop.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.inner.mutex.lock()
    }

    /// Number of records currently holding this lock.
    pub fn holders(&self) -> usize {
        self.inner.holders.load(Ordering::Acquire)
    }

    /// Whether both references point at the same lock instance.
    pub fn same_lock(&self, other: &LockRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Observe the lock without keeping it alive.
    pub fn downgrade(&self) -> WeakLock {
        WeakLock {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl Clone for LockRef {
    fn clone(&self) -> Self {
        self.inner.holders.fetch_add(1, Ordering::AcqRel);
        LockRef {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for LockRef {
    fn drop(&mut self) {
        self.inner.holders.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A non-owning view of a lock, used to observe when it has been freed.
#[derive(Debug, Clone)]
pub struct WeakLock {
    inner: Weak<LockInner>,
}

impl WeakLock {
    /// True once every handle and every adoption has been dropped.
    pub fn is_freed(&self) -> bool {
        self.inner.strong_count() == 0
    }

    /// Current holder count, or `None` if the lock is gone.
    pub fn holders(&self) -> Option<usize> {
        self.inner
            .upgrade()
            .map(|inner| inner.holders.load(Ordering::Acquire))
    }
}
