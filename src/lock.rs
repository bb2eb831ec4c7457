//! The concurrency wrapper: one mutex per pool, guarding the region and
//! category table.
//!
//! A lock plus an `UnsafeCell<T>`, accessed only through a closure-scoped
//! `with_exclusive_access`, built on `std::sync::Mutex` rather than a raw
//! platform primitive — its poisoning maps directly onto "failed lock
//! acquisition records `ThreadSyncError` and continues best-effort" without
//! needing to fabricate a failure mode a real mutex doesn't have.

use std::cell::UnsafeCell;
use std::sync::Mutex;

pub(crate) struct Exclusive<T> {
    lock: Mutex<()>,
    inner: UnsafeCell<T>,
}

// Safety: access to `inner` is only ever granted from within
// `with_exclusive_access`, which holds `lock` for the duration.
unsafe impl<T: Send> Sync for Exclusive<T> {}

impl<T> Exclusive<T> {
    pub(crate) fn new(value: T) -> Self {
        Exclusive {
            lock: Mutex::new(()),
            inner: UnsafeCell::new(value),
        }
    }

    /// Runs `f` with exclusive access to the wrapped value, returning
    /// `(result, recovered_from_poison)`. A poisoned mutex — one where an
    /// earlier critical section panicked mid-access — is recovered via
    /// `PoisonError::into_inner` and `f` runs anyway: liveness over strict
    /// safety, since the category table's own invariants are cheap to
    /// re-verify on the next operation rather than worth poisoning the
    /// whole pool over.
    pub(crate) fn with_exclusive_access<F, R>(&self, f: F) -> (R, bool)
    where
        F: FnOnce(&mut T) -> R,
    {
        let (guard, recovered) = match self.lock.lock() {
            Ok(guard) => (guard, false),
            Err(poisoned) => (poisoned.into_inner(), true),
        };
        let result = f(unsafe { &mut *self.inner.get() });
        drop(guard);
        (result, recovered)
    }

    /// Access without taking the lock at all — used for the settings and
    /// last-error accessors, which are read far more often than the pool
    /// mutates and are tolerant of a stale-but-valid snapshot under races.
    ///
    /// Safety: the caller must not mutate through the returned reference in
    /// a way that races with a concurrent `with_exclusive_access` call in a
    /// manner that produces more than stale-but-valid data (a torn read of
    /// a single `usize`/`enum` field is acceptable; a torn read of a
    /// `Vec`/`Box` is not, so this must never be used to reach the region
    /// or category table).
    pub(crate) unsafe fn racy_get(&self) -> &T {
        &*self.inner.get()
    }

    /// Safe, lock-free mutable access available only when the compiler can
    /// already prove exclusivity (`&mut self`) — used by `Drop`, which runs
    /// with no other reference to the pool possibly alive.
    pub(crate) fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }
}
