//! The error taxonomy and the fixed message forms used by every sink in
//! [`crate::dump`] (last-error slot, callback, dump file, log record).

use std::fmt;

use thiserror::Error;

/// The error taxonomy, excluding a "no error" case — success is `Ok`/`None`
/// rather than a value of this type, which reads better in Rust than an
/// always-populated status code would.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    InconsistentSettings = 1,
    ThreadSyncError = 2,
    OutputParamError = 3,
    InvalidMempool = 4,
    NoMemory = 5,
    Overflow = 6,
    InconsistentBlocks = 7,
    PointerParamError = 8,
}

impl ErrorCode {
    pub fn no_err_code() -> u8 {
        0
    }
}

/// Appends `(at the 0xADDR location / OFFSET mempool offset)` when an
/// offset is known. Displays as the empty string otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Location(pub(crate) Option<usize>);

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(offset) => write!(
                f,
                " (at the {:#x} location / {} mempool offset)",
                offset, offset
            ),
            None => Ok(()),
        }
    }
}

/// The structured error type surfaced by every public operation. Each
/// variant's `Display` implementation produces the fixed message form used
/// by every reporting sink.
#[derive(Debug, Error, Clone)]
pub enum MempoolError {
    #[error("settings were inconsistent: caller-supplied total_size did not match the sum of block_count * block_size across classes")]
    InconsistentSettings,

    #[error("mutex operation failed; the pool recovered and continued best-effort")]
    ThreadSyncError,

    #[error("an output parameter pointer/reference was null")]
    OutputParamError,

    #[error("not a mempool")]
    InvalidMempool,

    #[error("no class has enough free capacity to satisfy the request")]
    NoMemory,

    #[error("corruption detected{location}")]
    Overflow { location: Location },

    #[error("category table invariant violated{location}")]
    InconsistentBlocks { location: Location },

    #[error("pointer is not the head of a valid block in this pool")]
    PointerParamError,
}

impl MempoolError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MempoolError::InconsistentSettings => ErrorCode::InconsistentSettings,
            MempoolError::ThreadSyncError => ErrorCode::ThreadSyncError,
            MempoolError::OutputParamError => ErrorCode::OutputParamError,
            MempoolError::InvalidMempool => ErrorCode::InvalidMempool,
            MempoolError::NoMemory => ErrorCode::NoMemory,
            MempoolError::Overflow { .. } => ErrorCode::Overflow,
            MempoolError::InconsistentBlocks { .. } => ErrorCode::InconsistentBlocks,
            MempoolError::PointerParamError => ErrorCode::PointerParamError,
        }
    }

    pub(crate) fn overflow(offset: Option<usize>) -> Self {
        MempoolError::Overflow {
            location: Location(offset),
        }
    }

    pub(crate) fn inconsistent_blocks(offset: Option<usize>) -> Self {
        MempoolError::InconsistentBlocks {
            location: Location(offset),
        }
    }

    /// The region offset this error was pinned to, if any. The message's
    /// location suffix comes from this same value.
    pub fn location_offset(&self) -> Option<usize> {
        match self {
            MempoolError::Overflow { location } | MempoolError::InconsistentBlocks { location } => {
                location.0
            }
            _ => None,
        }
    }

    /// Logs this error at a level appropriate to its code, then returns
    /// `self` unchanged — meant to sit in a `.map_err(MempoolError::logged)`
    /// or be called just before publishing through the last-error slot.
    pub(crate) fn logged(self) -> Self {
        match self.code() {
            ErrorCode::Overflow | ErrorCode::ThreadSyncError | ErrorCode::PointerParamError => {
                log::warn!("{self}");
            }
            _ => log::error!("{self}"),
        }
        self
    }
}

/// The result of an internal operation that may record a non-fatal
/// corruption error alongside an otherwise-successful outcome — detected
/// corruption triggers best-effort restoration rather than aborting the
/// operation, favoring liveness over fail-fast — distinct from a hard
/// failure that aborts the operation entirely (`NoMemory`,
/// `PointerParamError`, ...).
pub(crate) enum Outcome<T> {
    /// Completed cleanly.
    Success(T),
    /// Completed, but a corruption error was detected and recorded along
    /// the way (restored best-effort); the operation still succeeds.
    SuccessWithWarning(T, MempoolError),
    /// Did not complete; no mutation beyond defensive restoration occurred.
    Failure(MempoolError),
}

impl<T> Outcome<T> {
    /// Peeks at a recorded error without consuming the outcome — used to
    /// decide whether a sink needs notifying before the value is unwrapped.
    pub(crate) fn warning(&self) -> Option<&MempoolError> {
        match self {
            Outcome::Success(_) => None,
            Outcome::SuccessWithWarning(_, e) => Some(e),
            Outcome::Failure(e) => Some(e),
        }
    }

    pub(crate) fn into_parts(self) -> (Option<T>, Option<MempoolError>) {
        match self {
            Outcome::Success(v) => (Some(v), None),
            Outcome::SuccessWithWarning(v, e) => (Some(v), Some(e)),
            Outcome::Failure(e) => (None, Some(e)),
        }
    }
}
