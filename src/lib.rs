//! `segpool` is a fixed-capacity memory pool split into eight segregated
//! size classes (32B through 4096B). Every block is framed by 16-byte
//! sentinel patterns on both sides so that heap corruption — a write that
//! runs past the end of an allocation, a stray write into freed memory —
//! shows up as a detectable invariant violation rather than silent
//! misbehavior. That trade, simplicity and auditability over raw
//! throughput, is the point: the pool is meant for long-running or
//! embedded workloads where a corrupted heap going undiagnosed is worse
//! than a slower allocator.
//!
//! A request too large for its natural size class can still be satisfied
//! by merging a contiguous run of blocks from a smaller class; see
//! [`Pool::allocate`] and the crate's design notes for how that interacts
//! with reallocation.
//!
//! ```
//! use segpool::{Pool, PoolSettingsBuilder, SizeClass};
//!
//! let outcome = PoolSettingsBuilder::new()
//!     .block_count(SizeClass::C64, 16)
//!     .block_count(SizeClass::C256, 4)
//!     .build()
//!     .expect("non-empty settings");
//! let pool = Pool::new(outcome);
//!
//! let p = pool.allocate(40).expect("pool has room");
//! pool.free(p);
//! ```

#[macro_use]
mod extra_assert;

mod block;
mod category;
mod dump;
mod error;
mod free;
mod layout;
mod lock;
mod planner;
mod pool;
mod realloc;
mod sentinel;
mod settings;

pub use error::{ErrorCode, MempoolError};
pub use pool::Pool;
pub use settings::{BuildOutcome, ErrorCallback, PoolSettings, PoolSettingsBuilder, SizeClass};
