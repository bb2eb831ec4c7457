//! The corruption-reporting fan-out: last-error slot, user callback, dump
//! file, log record. The log record itself is produced where the error is
//! constructed ([`crate::error::MempoolError::logged`]); this module owns
//! the other three sinks.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::error::{ErrorCode, MempoolError};
use crate::settings::PoolSettings;

struct LastErrorInner {
    code: u8,
    offset: Option<usize>,
    message: String,
}

/// The last-error slot. Guarded by its own lock rather than the pool's main
/// one — reading or writing it is exempt from the pool-wide mutex, so
/// contending operations only ever see a stale-but-valid snapshot, never a
/// torn one.
pub(crate) struct LastError {
    inner: Mutex<LastErrorInner>,
}

impl LastError {
    pub(crate) fn new() -> Self {
        LastError {
            inner: Mutex::new(LastErrorInner {
                code: ErrorCode::no_err_code(),
                offset: None,
                message: String::new(),
            }),
        }
    }

    pub(crate) fn record(&self, err: &MempoolError) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.code = err.code() as u8;
        inner.offset = err.location_offset();
        inner.message = err.to_string();
    }

    /// Resets the slot to `NoErr`. Every public operation clears this on
    /// entry before it does anything else, with one documented exception: a
    /// null pointer passed to `free` must not clear it. Callers honor that
    /// exception by simply not calling this before that path.
    pub(crate) fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.code = ErrorCode::no_err_code();
        inner.offset = None;
        inner.message.clear();
    }

    pub(crate) fn code(&self) -> u8 {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).code
    }

    pub(crate) fn message(&self) -> String {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .message
            .clone()
    }
}

/// Deletes any pre-existing file at `path`. The dump file is cleared at
/// pool-creation time rather than appended to across pool lifetimes.
pub(crate) fn prepare_dump_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn write_hex_dump(f: &mut impl Write, region: &[u8]) -> io::Result<()> {
    for (row, chunk) in region.chunks(16).enumerate() {
        write!(f, "{:08x}  ", row * 16)?;
        for byte in chunk {
            write!(f, "{byte:02x} ")?;
        }
        writeln!(f)?;
    }
    writeln!(f)
}

fn append_dump(path: &Path, message: &str, region: &[u8]) {
    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut f| {
            writeln!(f, "{message}")?;
            write_hex_dump(&mut f, region)
        });
    if let Err(e) = result {
        log::error!("failed to append corruption dump to {}: {e}", path.display());
    }
}

/// Fans a detected error out to every configured sink except the log
/// (already handled by [`MempoolError::logged`] at construction time):
/// the last-error slot, the caller's error callback, and the dump file.
pub(crate) fn report(
    last_error: &LastError,
    settings: &PoolSettings,
    region: &[u8],
    err: &MempoolError,
) {
    last_error.record(err);
    if let Some(callback) = settings.error_callback {
        callback(err.code(), err.location_offset(), &err.to_string());
    }
    if let Some(path) = settings.dump_path.as_deref() {
        append_dump(path, &err.to_string(), region);
    }
}
