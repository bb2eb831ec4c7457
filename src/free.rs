//! Releasing a previously allocated block.

use crate::block::BlockView;
use crate::category::CategoryEntry;
use crate::error::{MempoolError, Outcome};
use crate::sentinel::{ALIGN, INIT_BYTE, NOT_SET};
use crate::settings::PoolSettings;

/// Locates the class and block a user-facing payload pointer belongs to. A
/// failure here is a hard `PointerParamError` — unlike the corruption
/// checks further down, these checks establish that `ptr_offset` is even a
/// block this pool could have handed out, and there is nothing to restore
/// if it isn't.
///
/// Safety: `region` must be the pool region, and the caller holds the pool
/// lock.
unsafe fn locate(
    region: *mut u8,
    categories: &[CategoryEntry; 8],
    ptr_offset: usize,
) -> Result<(usize, BlockView), MempoolError> {
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
    Ok((class, blk))
}

/// Frees the block at `ptr_offset` (offset of the user payload pointer
/// within the region). A `null` pointer is handled by the caller before
/// reaching here: it is a silent no-op that does not clear last-error.
///
/// Safety: `region` must be a live pool region, and the caller holds the
/// pool lock.
pub(crate) unsafe fn free(
    region: *mut u8,
    categories: &mut [CategoryEntry; 8],
    settings: &PoolSettings,
    ptr_offset: usize,
) -> Outcome<()> {
    let (class, blk) = match locate(region, categories, ptr_offset) {
        Ok(v) => v,
        Err(e) => return Outcome::Failure(e),
    };
    let cat = categories[class];
    let block_size = cat.block_size;
    let block_offset = blk.base() as usize - region as usize;

    let used_blocks = blk.used_blocks();
    let data_size = blk.data_size();

    // The block claims to already be free. Restamp it defensively and
    // stop — we cannot trust `used_blocks` enough to know which, if any,
    // neighboring cells were really part of this allocation, so we only fix
    // the one cell we can reason about rather than risk touching blocks
    // that belong to a live allocation.
    if used_blocks == NOT_SET || data_size == NOT_SET {
        let err = MempoolError::overflow(Some(block_offset)).logged();
        blk.restore_as_free(block_size);
        return Outcome::SuccessWithWarning((), err);
    }

    let payload_span = block_size * used_blocks + 3 * ALIGN * (used_blocks - 1);
    let mut warning: Option<MempoolError> = None;

    // Step 5: the run's own end sentinel, at the far edge of `used_blocks`
    // worth of payload.
    if !blk.verify_end_sentinel(payload_span) {
        let end_offset = block_offset + 2 * ALIGN + payload_span;
        warning = Some(MempoolError::overflow(Some(end_offset)).logged());
        blk.stamp_end_sentinel(payload_span);
    }

    // Step 6: with full_overflow_checks, the slack between data_size and
    // the block's actual payload capacity must still read as init bytes.
    if settings.full_overflow_checks() {
        let slack_len = payload_span - data_size;
        let slack_ok = if slack_len == 0 {
            true
        } else {
            std::slice::from_raw_parts(blk.payload_ptr().add(data_size), slack_len)
                .iter()
                .all(|&b| b == INIT_BYTE)
        };
        if !slack_ok && warning.is_none() {
            warning = Some(MempoolError::overflow(Some(ptr_offset + data_size)).logged());
        }
    }

    // Commit: scrub the whole span back to init bytes, then split it back
    // into `used_blocks` individually free cells.
    blk.fill_payload(INIT_BYTE, payload_span);
    let start_index = cat.index_of(block_offset);
    for i in 0..used_blocks {
        BlockView::at(cat.block_ptr(region, start_index + i)).restore_as_free(block_size);
    }

    categories[class].extend_after_free(block_offset, used_blocks);

    match warning {
        Some(e) => Outcome::SuccessWithWarning((), e),
        None => Outcome::Success(()),
    }
}
