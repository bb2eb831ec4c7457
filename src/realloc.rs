//! Resizing a previously allocated block in place where possible.
//!
//! `Pool::reallocate` handles the `p == null` ("act as allocate") and
//! `s == 0` ("act as free, return null") cases itself by delegating
//! straight to [`crate::planner::allocate`]/[`crate::free::free`]; this
//! module only implements the four-way state machine for the remaining
//! case, `p` non-null and `s > 0`.

use std::cmp;
use std::ptr;

use crate::block::BlockView;
use crate::category::CategoryEntry;
use crate::error::{MempoolError, Outcome};
use crate::planner::{self, required_run_len};
use crate::sentinel::{ALIGN, INIT_BYTE};
use crate::settings::PoolSettings;

/// Safety: `region` must be a live pool region, and the caller holds the
/// pool lock.
unsafe fn locate(
    region: *mut u8,
    categories: &[CategoryEntry; 8],
    ptr_offset: usize,
) -> Result<(usize, usize, BlockView), MempoolError> {
    if ptr_offset < 2 * ALIGN {
        return Err(MempoolError::PointerParamError.logged());
    }
    let block_offset = ptr_offset - 2 * ALIGN;
    let blk = BlockView::at(region.add(block_offset));
    if !blk.verify_start_sentinel() {
        return Err(MempoolError::PointerParamError.logged());
    }
    let class = categories
        .iter()
        .position(|c| c.contains(block_offset))
        .ok_or_else(|| MempoolError::PointerParamError.logged())?;
    Ok((class, categories[class].index_of(block_offset), blk))
}

/// Resizes the block at `ptr_offset` to `new_size` (`new_size > 0`),
/// returning the payload pointer of the (possibly relocated) block.
///
/// Safety: `region` must be a live pool region, and the caller holds the
/// pool lock.
pub(crate) unsafe fn reallocate(
    region: *mut u8,
    categories: &mut [CategoryEntry; 8],
    settings: &PoolSettings,
    ptr_offset: usize,
    new_size: usize,
) -> Outcome<*mut u8> {
    let (class, start_index, blk) = match locate(region, categories, ptr_offset) {
        Ok(v) => v,
        Err(e) => return Outcome::Failure(e),
    };
    let cat = categories[class];
    let block_size = cat.block_size;
    let used_blocks = blk.used_blocks();
    let data_size = blk.data_size();
    let capacity = block_size * used_blocks + 3 * ALIGN * (used_blocks - 1);

    // 1. No-op: identical size, same pointer.
    if new_size == data_size {
        return Outcome::Success(blk.payload_ptr());
    }

    // 2. Shrink in place, releasing any trailing blocks the smaller size no
    //    longer needs: shrinking must hand unused blocks back to the class
    //    rather than leaving them stranded inside the run.
    if new_size < data_size {
        let needed = required_run_len(block_size, new_size);
        let mut new_used_blocks = used_blocks;
        if needed < used_blocks {
            let released = used_blocks - needed;
            let released_span = block_size * released + 3 * ALIGN * (released - 1);
            let released_head = BlockView::at(cat.block_ptr(region, start_index + needed));
            released_head.fill_payload(INIT_BYTE, released_span);
            for i in 0..released {
                let idx = start_index + needed + i;
                BlockView::at(cat.block_ptr(region, idx)).restore_as_free(block_size);
            }
            let new_tail = BlockView::at(cat.block_ptr(region, start_index + needed - 1));
            new_tail.stamp_end_sentinel(block_size);
            blk.set_used_blocks(needed);
            new_used_blocks = needed;
            categories[class].extend_after_free(
                cat.start_offset + (start_index + needed) * cat.stride(),
                released,
            );
        }
        let new_capacity = block_size * new_used_blocks + 3 * ALIGN * (new_used_blocks - 1);
        let slack_len = new_capacity - new_size;
        if slack_len > 0 {
            ptr::write_bytes(blk.payload_ptr().add(new_size), INIT_BYTE, slack_len);
        }
        blk.set_data_size(new_size);
        return Outcome::Success(blk.payload_ptr());
    }

    // 3. Grow, but the existing run's capacity already covers it.
    if new_size <= capacity {
        if settings.zero_on_alloc() {
            ptr::write_bytes(blk.payload_ptr().add(data_size), 0, new_size - data_size);
        }
        blk.set_data_size(new_size);
        return Outcome::Success(blk.payload_ptr());
    }

    // 4. Grow past capacity: try extending the run with immediately
    //    following free blocks of the same class before migrating.
    let needed = required_run_len(block_size, new_size);
    let extra_needed = needed - used_blocks;
    let available = cat.free_run_from(region, start_index + used_blocks);
    if available >= extra_needed {
        // Every absorbed block already carries a valid end sentinel (it was
        // free); only its start sentinel and counters need scrubbing to
        // fold it into the run. The last absorbed block keeps its end
        // sentinel as-is — it becomes the run's new tail.
        for i in 0..extra_needed {
            let idx = start_index + used_blocks + i;
            BlockView::at(cat.block_ptr(region, idx)).scrub_head();
        }
        blk.set_used_blocks(needed);
        if settings.zero_on_alloc() {
            ptr::write_bytes(blk.payload_ptr().add(data_size), 0, new_size - data_size);
        }
        blk.set_data_size(new_size);
        categories[class].settle_after_alloc(region, start_index + used_blocks, extra_needed);
        return Outcome::Success(blk.payload_ptr());
    }

    // 5. Migrate: allocate fresh, copy the live prefix, free the old block.
    let (new_ptr, alloc_warning) = match planner::allocate(region, categories, settings, new_size) {
        Outcome::Success(p) => (p, None),
        Outcome::SuccessWithWarning(p, e) => (p, Some(e)),
        Outcome::Failure(e) => return Outcome::Failure(e),
    };
    ptr::copy_nonoverlapping(blk.payload_ptr(), new_ptr, cmp::min(data_size, new_size));
    let free_outcome = crate::free::free(region, categories, settings, ptr_offset);
    let (_, free_warning) = free_outcome.into_parts();

    match alloc_warning.or(free_warning) {
        Some(e) => Outcome::SuccessWithWarning(new_ptr, e),
        None => Outcome::Success(new_ptr),
    }
}
