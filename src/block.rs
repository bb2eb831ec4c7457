//! A single block within a class arena: start sentinel, two counter words,
//! payload, end sentinel.
//!
//! `BlockView` is a thin, `Copy` handle over a raw pointer into the pool's
//! region. It carries no lifetime of its own — callers hold the pool lock
//! for the duration of any access, the same discipline `Exclusive<T>`
//! enforces one level up.

use std::ptr;

use crate::sentinel::{self, ALIGN, INIT_BYTE, NOT_SET, WORD};

#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockView {
    base: *mut u8,
}

impl BlockView {
    /// Safety: `base` must point at the first byte of a block (its start
    /// sentinel) within a live pool region, and the caller must hold the
    /// pool lock.
    #[inline]
    pub(crate) unsafe fn at(base: *mut u8) -> Self {
        BlockView { base }
    }

    #[inline]
    pub(crate) fn base(&self) -> *mut u8 {
        self.base
    }

    #[inline]
    fn used_blocks_ptr(&self) -> *mut usize {
        unsafe { self.base.add(ALIGN) as *mut usize }
    }

    #[inline]
    fn data_size_ptr(&self) -> *mut usize {
        unsafe { self.base.add(ALIGN + WORD) as *mut usize }
    }

    #[inline]
    pub(crate) fn payload_ptr(&self) -> *mut u8 {
        unsafe { self.base.add(2 * ALIGN) }
    }

    #[inline]
    pub(crate) unsafe fn used_blocks(&self) -> usize {
        ptr::read_unaligned(self.used_blocks_ptr())
    }

    #[inline]
    pub(crate) unsafe fn set_used_blocks(&self, value: usize) {
        ptr::write_unaligned(self.used_blocks_ptr(), value);
    }

    #[inline]
    pub(crate) unsafe fn data_size(&self) -> usize {
        ptr::read_unaligned(self.data_size_ptr())
    }

    #[inline]
    pub(crate) unsafe fn set_data_size(&self, value: usize) {
        ptr::write_unaligned(self.data_size_ptr(), value);
    }

    #[inline]
    pub(crate) unsafe fn is_free(&self) -> bool {
        self.used_blocks() == NOT_SET
    }

    pub(crate) unsafe fn verify_start_sentinel(&self) -> bool {
        sentinel::matches(self.base, &sentinel::BLOCK_START)
    }

    pub(crate) unsafe fn stamp_start_sentinel(&self) {
        sentinel::stamp(self.base, &sentinel::BLOCK_START);
    }

    pub(crate) unsafe fn verify_end_sentinel(&self, span_payload: usize) -> bool {
        sentinel::matches(self.payload_ptr().add(span_payload), &sentinel::BLOCK_END)
    }

    pub(crate) unsafe fn stamp_end_sentinel(&self, span_payload: usize) {
        sentinel::stamp(self.payload_ptr().add(span_payload), &sentinel::BLOCK_END);
    }

    pub(crate) unsafe fn fill_payload(&self, byte: u8, len: usize) {
        ptr::write_bytes(self.payload_ptr(), byte, len);
    }

    pub(crate) unsafe fn payload_is_all(&self, byte: u8, len: usize) -> bool {
        std::slice::from_raw_parts(self.payload_ptr(), len)
            .iter()
            .all(|&b| b == byte)
    }

    pub(crate) unsafe fn mark_free(&self) {
        self.set_used_blocks(NOT_SET);
        self.set_data_size(NOT_SET);
    }

    /// Overwrites this cell's start sentinel and counters (the leading `2A`
    /// bytes) with the init byte. Used on every block of a merged run
    /// except the head, both when first merging a run and when extending
    /// one during in-place growth.
    pub(crate) unsafe fn scrub_head(&self) {
        ptr::write_bytes(self.base, INIT_BYTE, 2 * ALIGN);
    }

    /// Overwrites this cell's own end sentinel (`A` bytes starting at
    /// `block_size` into its payload) with the init byte. Used on every
    /// block of a merged run except the tail.
    pub(crate) unsafe fn scrub_tail(&self, block_size: usize) {
        ptr::write_bytes(self.payload_ptr().add(block_size), INIT_BYTE, ALIGN);
    }

    /// Re-stamps this cell as an individually free block of `block_size`:
    /// start/end sentinels restored, counters reset to `NOT_SET`. Does not
    /// touch the payload — callers fill payload separately (it is usually
    /// cheaper to fill the whole merged span in one sweep than block by
    /// block).
    pub(crate) unsafe fn restore_as_free(&self, block_size: usize) {
        self.stamp_start_sentinel();
        self.stamp_end_sentinel(block_size);
        self.mark_free();
    }
}

/// The stride (bytes) between consecutive blocks of a class: header +
/// payload + footer, i.e. `block_size + 3A`.
#[inline]
pub(crate) fn stride(block_size: usize) -> usize {
    block_size + 3 * ALIGN
}
