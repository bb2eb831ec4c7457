//! Pool creation parameters and the builder that validates and sanitizes
//! them.

use std::path::{Path, PathBuf};

use crate::error::MempoolError;

/// The eight fixed payload sizes, smallest to largest.
pub const SIZE_CLASS_BYTES: [usize; 8] = [32, 64, 128, 256, 512, 1024, 2048, 4096];

/// One of the eight fixed size classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SizeClass {
    C32,
    C64,
    C128,
    C256,
    C512,
    C1024,
    C2048,
    C4096,
}

impl SizeClass {
    pub const ALL: [SizeClass; 8] = [
        SizeClass::C32,
        SizeClass::C64,
        SizeClass::C128,
        SizeClass::C256,
        SizeClass::C512,
        SizeClass::C1024,
        SizeClass::C2048,
        SizeClass::C4096,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn block_size(self) -> usize {
        SIZE_CLASS_BYTES[self.index()]
    }

    #[inline]
    pub(crate) fn from_index(index: usize) -> SizeClass {
        Self::ALL[index]
    }
}

/// Invoked synchronously, at most once per error event, before the
/// operation that raised it returns.
pub type ErrorCallback = fn(code: crate::error::ErrorCode, offset: Option<usize>, message: &str);

/// An immutable copy of the parameters a pool was created with.
///
/// Construct via [`PoolSettingsBuilder`]; `total_size` is always the
/// sanitized sum of `block_count * block_size` across classes, never the
/// caller's raw input.
#[derive(Clone)]
pub struct PoolSettings {
    pub(crate) block_counts: [usize; 8],
    pub(crate) total_size: usize,
    pub(crate) threadsafe: bool,
    pub(crate) full_overflow_checks: bool,
    pub(crate) zero_on_alloc: bool,
    pub(crate) error_callback: Option<ErrorCallback>,
    pub(crate) dump_path: Option<PathBuf>,
}

impl PoolSettings {
    pub fn block_count(&self, class: SizeClass) -> usize {
        self.block_counts[class.index()]
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn threadsafe(&self) -> bool {
        self.threadsafe
    }

    pub fn full_overflow_checks(&self) -> bool {
        self.full_overflow_checks
    }

    pub fn zero_on_alloc(&self) -> bool {
        self.zero_on_alloc
    }

    pub fn dump_path(&self) -> Option<&Path> {
        self.dump_path.as_deref()
    }
}

/// Builds a [`PoolSettings`], validating and sanitizing the caller's input.
#[derive(Default)]
pub struct PoolSettingsBuilder {
    block_counts: [usize; 8],
    total_size_hint: Option<usize>,
    threadsafe: bool,
    full_overflow_checks: bool,
    zero_on_alloc: bool,
    error_callback: Option<ErrorCallback>,
    dump_path: Option<PathBuf>,
}

impl PoolSettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_count(mut self, class: SizeClass, count: usize) -> Self {
        self.block_counts[class.index()] = count;
        self
    }

    /// Records the caller's own idea of `total_size`, preserved only so
    /// that [`build`](Self::build) can flag `InconsistentSettings` when it
    /// disagrees with the sanitized sum. Most callers never need this; it
    /// exists for callers that still track `total_size` as an independent
    /// field rather than deriving it from block counts.
    pub fn total_size_hint(mut self, hint: usize) -> Self {
        self.total_size_hint = Some(hint);
        self
    }

    pub fn threadsafe(mut self, enabled: bool) -> Self {
        self.threadsafe = enabled;
        self
    }

    pub fn full_overflow_checks(mut self, enabled: bool) -> Self {
        self.full_overflow_checks = enabled;
        self
    }

    pub fn zero_on_alloc(mut self, enabled: bool) -> Self {
        self.zero_on_alloc = enabled;
        self
    }

    pub fn error_callback(mut self, callback: ErrorCallback) -> Self {
        self.error_callback = Some(callback);
        self
    }

    pub fn dump_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dump_path = Some(path.into());
        self
    }

    /// Sanitizes `total_size` (recomputed as `Σ count_c * block_size_c`,
    /// always overwriting any [`total_size_hint`](Self::total_size_hint))
    /// and rejects an all-zero configuration. Returns the sanitized
    /// settings alongside whether the hint disagreed with the computed
    /// total — callers that care about the flagged inconsistency should
    /// check [`BuildOutcome::inconsistent`].
    pub fn build(self) -> Result<BuildOutcome, MempoolError> {
        let total_size: usize = self
            .block_counts
            .iter()
            .zip(SIZE_CLASS_BYTES.iter())
            .map(|(count, size)| count * size)
            .sum();

        if total_size == 0 {
            let err = MempoolError::InconsistentSettings;
            if let Some(callback) = self.error_callback {
                callback(err.code(), None, &err.to_string());
            }
            return Err(err);
        }

        let inconsistent = matches!(self.total_size_hint, Some(hint) if hint != total_size);

        Ok(BuildOutcome {
            settings: PoolSettings {
                block_counts: self.block_counts,
                total_size,
                threadsafe: self.threadsafe,
                full_overflow_checks: self.full_overflow_checks,
                zero_on_alloc: self.zero_on_alloc,
                error_callback: self.error_callback,
                dump_path: self.dump_path,
            },
            inconsistent,
        })
    }
}

/// The result of [`PoolSettingsBuilder::build`]: the sanitized settings,
/// plus whether the caller's `total_size_hint` disagreed with the computed
/// total (`InconsistentSettings` is non-fatal — the pool is still
/// created).
pub struct BuildOutcome {
    pub settings: PoolSettings,
    pub inconsistent: bool,
}
