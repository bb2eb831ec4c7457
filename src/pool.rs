//! The public pool handle.

use crate::dump::{self, LastError};
use crate::error::{MempoolError, Outcome};
use crate::free;
use crate::layout::RegionLayout;
use crate::lock::Exclusive;
use crate::planner;
use crate::realloc;
use crate::sentinel::INIT_BYTE;
use crate::settings::{BuildOutcome, PoolSettings};
use crate::category::CategoryEntry;

struct PoolState {
    region: Box<[u8]>,
    categories: [CategoryEntry; 8],
}

/// A fixed-capacity, segregated-size-class memory pool.
///
/// Cheap to share across threads behind an `Arc` when `threadsafe()` is
/// set; every operation takes the pool's internal lock for the duration of
/// its mutation. Dropping a `Pool` scrubs its region before the backing
/// allocation is released.
pub struct Pool {
    settings: PoolSettings,
    last_error: LastError,
    region_base: usize,
    region_len: usize,
    state: Exclusive<PoolState>,
}

// Safety: all access to `region`/`categories` goes through `Exclusive`,
// which serializes it behind its own mutex.
unsafe impl Sync for Pool {}

impl Pool {
    /// Creates a pool from validated settings. If the settings builder
    /// flagged an inconsistency between the caller's `total_size` hint and
    /// the computed total, the pool is still created — an
    /// `InconsistentSettings` error is simply recorded through the usual
    /// sinks before this returns rather than failing construction outright.
    pub fn new(outcome: BuildOutcome) -> Pool {
        let BuildOutcome {
            settings,
            inconsistent,
        } = outcome;

        let layout = RegionLayout::compute(&settings);
        let mut region = vec![0u8; layout.total_size].into_boxed_slice();
        let categories = layout.build_categories(&settings);
        unsafe {
            layout.init_region(&mut region, &categories);
        }

        if let Some(path) = settings.dump_path() {
            if let Err(e) = dump::prepare_dump_file(path) {
                log::warn!("could not clear dump file {}: {}", path.display(), e);
            }
        }

        let last_error = LastError::new();
        if inconsistent {
            let err = MempoolError::InconsistentSettings.logged();
            dump::report(&last_error, &settings, &region, &err);
        }

        let region_base = region.as_ptr() as usize;
        let region_len = region.len();

        Pool {
            settings,
            last_error,
            region_base,
            region_len,
            state: Exclusive::new(PoolState { region, categories }),
        }
    }

    /// The settings this pool was created with.
    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// The error code of the most recently recorded error, or `0`
    /// (no-error) if none has occurred yet.
    pub fn last_error_code(&self) -> u8 {
        self.last_error.code()
    }

    /// The message form of the most recently recorded error.
    pub fn last_error_message(&self) -> String {
        self.last_error.message()
    }

    /// Allocates `size` bytes, returning the payload pointer, or `None` if
    /// no class has enough free capacity.
    pub fn allocate(&self, size: usize) -> Option<*mut u8> {
        log::trace!("allocate(size={size})");
        self.last_error.clear();
        let outcome = self.run_exclusive(|state| unsafe {
            planner::allocate(
                state.region.as_mut_ptr(),
                &mut state.categories,
                &self.settings,
                size,
            )
        });
        let ptr = outcome.into_parts().0;
        match ptr {
            Some(p) => log::trace!("allocate(size={size}) -> {p:p}"),
            None => log::trace!("allocate(size={size}) -> null"),
        }
        ptr
    }

    /// Releases a block previously returned by [`Pool::allocate`] or
    /// [`Pool::reallocate`]. A null pointer is a silent no-op that leaves
    /// the last-error slot untouched.
    pub fn free(&self, ptr: *mut u8) {
        log::trace!("free({ptr:p})");
        if ptr.is_null() {
            return;
        }
        self.last_error.clear();
        let ptr_offset = match self.offset_of(ptr) {
            Some(o) => o,
            None => {
                self.report_direct(MempoolError::PointerParamError.logged());
                return;
            }
        };
        let _ = self.run_exclusive(|state| unsafe {
            free::free(
                state.region.as_mut_ptr(),
                &mut state.categories,
                &self.settings,
                ptr_offset,
            )
        });
        log::trace!("free({ptr:p}) -> freed");
    }

    /// Resizes a previously allocated block. `ptr == null` behaves as
    /// [`Pool::allocate`]; `size == 0` behaves as [`Pool::free`] and returns
    /// `None`.
    pub fn reallocate(&self, ptr: *mut u8, size: usize) -> Option<*mut u8> {
        log::trace!("reallocate({ptr:p}, size={size})");
        if ptr.is_null() {
            return self.allocate(size);
        }
        if size == 0 {
            self.free(ptr);
            return None;
        }
        self.last_error.clear();
        let ptr_offset = match self.offset_of(ptr) {
            Some(o) => o,
            None => {
                self.report_direct(MempoolError::PointerParamError.logged());
                return None;
            }
        };
        let outcome = self.run_exclusive(|state| unsafe {
            realloc::reallocate(
                state.region.as_mut_ptr(),
                &mut state.categories,
                &self.settings,
                ptr_offset,
                size,
            )
        });
        let new_ptr = outcome.into_parts().0;
        match new_ptr {
            Some(p) => log::trace!("reallocate({ptr:p}, size={size}) -> {p:p}"),
            None => log::trace!("reallocate({ptr:p}, size={size}) -> null"),
        }
        new_ptr
    }

    /// Consumes the pool, releasing its backing region. Equivalent to
    /// letting the pool drop — spelled out as an explicit method because
    /// callers porting from an API with an explicit destroy call expect
    /// one; Rust's ownership rules mean this can never race with a
    /// concurrent operation the way a raw-pointer "destroy" could; a
    /// pool a thread is still operating on cannot be moved out from under
    /// it; always returns `true`.
    pub fn destroy(self) -> bool {
        true
    }

    fn offset_of(&self, ptr: *mut u8) -> Option<usize> {
        let addr = ptr as usize;
        if addr < self.region_base || addr >= self.region_base + self.region_len {
            None
        } else {
            Some(addr - self.region_base)
        }
    }

    fn report_direct(&self, err: MempoolError) {
        self.state.with_exclusive_access(|state| {
            dump::report(&self.last_error, &self.settings, &state.region, &err);
        });
    }

    /// Runs `f` under the pool's lock, fanning out any recorded error to
    /// every sink before returning. If the lock was poisoned by a panic in
    /// an earlier critical section, `f` still runs (liveness over strict
    /// safety), and a `ThreadSyncError` is additionally recorded.
    fn run_exclusive<F, T>(&self, f: F) -> Outcome<T>
    where
        F: FnOnce(&mut PoolState) -> Outcome<T>,
    {
        let (outcome, recovered) = self.state.with_exclusive_access(|state| {
            let outcome = f(state);
            if let Some(err) = outcome.warning() {
                dump::report(&self.last_error, &self.settings, &state.region, err);
            }
            outcome
        });
        if recovered {
            self.report_direct(MempoolError::ThreadSyncError.logged());
        }
        outcome
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        state.region.fill(INIT_BYTE);
    }
}
