//! Deterministic byte-level region layout.
//!
//! `Settings`/`CategoryEntry` live as ordinary typed Rust fields beside the
//! region rather than serialized into it — only the parts whose *byte*
//! layout the format actually depends on (the pool sentinels and the block
//! arenas between them) occupy the region itself.

use crate::block::{stride, BlockView};
use crate::category::CategoryEntry;
use crate::sentinel::{self, ALIGN, INIT_BYTE};
use crate::settings::{PoolSettings, SIZE_CLASS_BYTES};

/// Computed offsets into a pool's backing region.
#[derive(Debug, Clone)]
pub(crate) struct RegionLayout {
    pub(crate) total_size: usize,
    pub(crate) arena_offsets: [usize; 8],
    pub(crate) end_sentinel_offset: usize,
}

impl RegionLayout {
    pub(crate) fn compute(settings: &PoolSettings) -> RegionLayout {
        let mut arena_offsets = [0usize; 8];
        let mut offset = ALIGN; // past the pool-start sentinel
        for (i, &block_size) in SIZE_CLASS_BYTES.iter().enumerate() {
            arena_offsets[i] = offset;
            offset += settings.block_counts[i] * stride(block_size);
        }
        let end_sentinel_offset = offset;
        RegionLayout {
            total_size: offset + ALIGN,
            arena_offsets,
            end_sentinel_offset,
        }
    }

    pub(crate) fn build_categories(&self, settings: &PoolSettings) -> [CategoryEntry; 8] {
        let mut categories = [CategoryEntry::empty(0); 8];
        for i in 0..8 {
            categories[i] = CategoryEntry::new(
                SIZE_CLASS_BYTES[i],
                settings.block_counts[i],
                self.arena_offsets[i],
            );
        }
        categories
    }

    /// Stamps a freshly allocated region into its all-free initial state:
    /// pool sentinels at either end, every block individually stamped free
    /// with its payload set to the init byte.
    ///
    /// Safety: `region.len() == self.total_size`, and `categories` must be
    /// the table this layout built for the same settings.
    pub(crate) unsafe fn init_region(&self, region: &mut [u8], categories: &[CategoryEntry; 8]) {
        let base = region.as_mut_ptr();
        sentinel::stamp(base, &sentinel::POOL_START);
        sentinel::stamp(base.add(self.end_sentinel_offset), &sentinel::POOL_END);
        for cat in categories {
            for i in 0..cat.total_blocks {
                let blk = BlockView::at(cat.block_ptr(base, i));
                blk.restore_as_free(cat.block_size);
                blk.fill_payload(INIT_BYTE, cat.block_size);
            }
        }
    }
}
