//! Region layout constants and the four fixed byte patterns that mark pool
//! and block boundaries.
//!
//! The patterns are part of the on-memory format: a hex-dump consumer (see
//! [`crate::dump`]) identifies structure purely by matching these bytes, so
//! they must never change.

use std::ptr;

#[cfg(not(target_pointer_width = "64"))]
compile_error!("segpool only implements the sentinel/stride arithmetic of the spec for 64-bit targets; want to send a pull request? :)");

/// `sizeof(usize)` on the target, i.e. one machine word.
pub(crate) const WORD: usize = std::mem::size_of::<usize>();

/// `2 * sizeof(usize)`: the section- and header-padding boundary, called
/// *A* throughout the design notes.
pub(crate) const ALIGN: usize = 2 * WORD;

/// The "free" marker stored in both `used_blocks` and `data_size` counters.
pub(crate) const NOT_SET: usize = usize::MAX;

/// The canonical fill byte for free payloads and allocator-owned slack.
pub(crate) const INIT_BYTE: u8 = 0xAC;

pub(crate) const POOL_START: [u8; 16] = [
    0xDE, 0xCE, 0xCA, 0xDE, 0xF0, 0xCA, 0xAC, 0xDC, 0xF0, 0x0D, 0xFA, 0xCE, 0xDE, 0xAD, 0xBE,
    0xEF,
];

pub(crate) const POOL_END: [u8; 16] = [
    0xDE, 0xAD, 0xBE, 0xEF, 0xF0, 0x0D, 0xFA, 0xCE, 0xAC, 0xDC, 0xDE, 0xCE, 0xCA, 0xDE, 0xF0,
    0xCA,
];

pub(crate) const BLOCK_START: [u8; 16] = [
    0xF0, 0x0D, 0xFA, 0xCE, 0xDE, 0xAD, 0xBE, 0xEF, 0xDE, 0xCE, 0xCA, 0xDE, 0xF0, 0xCA, 0xAC,
    0xDC,
];

pub(crate) const BLOCK_END: [u8; 16] = [
    0xAC, 0xDC, 0xDE, 0xCE, 0xCA, 0xDE, 0xF0, 0xCA, 0xDE, 0xAD, 0xBE, 0xEF, 0xF0, 0x0D, 0xFA,
    0xCE,
];

// The four sentinel patterns above are a fixed 16 bytes regardless of target;
// on the 64-bit targets this crate supports that happens to equal `ALIGN`,
// which is what lets a sentinel occupy exactly one padded section slot.
const _: () = assert!(ALIGN == 16);

/// Stamps a 16-byte pattern at `at`. Safety: `at` must be valid for 16
/// writes.
#[inline]
pub(crate) unsafe fn stamp(at: *mut u8, pattern: &[u8; 16]) {
    ptr::copy_nonoverlapping(pattern.as_ptr(), at, 16);
}

/// Checks whether the 16 bytes at `at` match `pattern`. Safety: `at` must be
/// valid for 16 reads.
#[inline]
pub(crate) unsafe fn matches(at: *const u8, pattern: &[u8; 16]) -> bool {
    std::slice::from_raw_parts(at, 16) == pattern
}
