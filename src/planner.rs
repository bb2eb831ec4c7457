//! Allocation class selection and commit.
//!
//! Two phases: find a candidate, then mutate. The candidate search chooses
//! between two strategies: a single best-fit block in the natural class
//! (`L`), or a contiguous run of blocks in some smaller class (`S`).

use std::ptr;

use crate::block::{stride, BlockView};
use crate::category::CategoryEntry;
use crate::error::{MempoolError, Outcome};
use crate::sentinel::{ALIGN, INIT_BYTE, NOT_SET};
use crate::settings::{PoolSettings, SIZE_CLASS_BYTES};

enum Decision {
    Single { class: usize, index: usize },
    Run { class: usize, start_index: usize, len: usize },
}

/// Number of consecutive blocks of `block_size` needed so their merged
/// payload span (`k*block_size + (k-1)*3A`) covers `size` bytes.
pub(crate) fn required_run_len(block_size: usize, size: usize) -> usize {
    let s = stride(block_size);
    let needed = size + 3 * ALIGN;
    (needed + s - 1) / s
}

/// Scans class `cat` for the first run of `k` consecutive free blocks,
/// returning the run's starting offset. `O(k)` per candidate class, bounded
/// by the fact that a class with fewer than `k` blocks total is skipped by
/// the caller before this is ever invoked.
///
/// Safety: `region` must be the pool region this category was built over,
/// and the caller holds the pool lock.
unsafe fn find_contiguous_run(region: *mut u8, cat: &CategoryEntry, k: usize) -> Option<usize> {
    if k > cat.total_blocks {
        return None;
    }
    let mut run_start: Option<usize> = None;
    let mut run_len = 0usize;
    for index in 0..cat.total_blocks {
        let free = BlockView::at(cat.block_ptr(region, index)).is_free();
        if free {
            if run_len == 0 {
                run_start = Some(index);
            }
            run_len += 1;
            if run_len == k {
                return run_start;
            }
        } else {
            run_len = 0;
            run_start = None;
        }
    }
    None
}

/// Chooses between the single-block (`L`) and multi-block (`S`) strategies:
/// prefer whichever leaves more free payload in its class behind; ties
/// favor the multi-block run, since consolidating into fewer, larger free
/// classes tends to serve future requests better than leaving a single
/// oversized block idle.
unsafe fn decide(region: *mut u8, categories: &[CategoryEntry; 8], size: usize) -> Option<Decision> {
    let natural_class = SIZE_CLASS_BYTES.iter().position(|&bs| bs >= size);

    let l = natural_class.and_then(|idx| {
        let cat = &categories[idx];
        if cat.total_blocks > 0 && cat.has_room() {
            Some(idx)
        } else {
            None
        }
    });

    let mut s: Option<(usize, usize, usize)> = None;
    for class in (0..8).rev() {
        let cat = &categories[class];
        if cat.total_blocks == 0 || cat.block_size >= size {
            continue;
        }
        if Some(class) == natural_class {
            continue;
        }
        let k = required_run_len(cat.block_size, size);
        if let Some(start) = find_contiguous_run(region, cat, k) {
            s = Some((class, start, k));
            break;
        }
    }

    match (l, s) {
        (None, None) => None,
        (Some(class), None) => {
            let idx = categories[class].first_free_index().unwrap();
            Some(Decision::Single { class, index: idx })
        }
        (None, Some((class, start, k))) => Some(Decision::Run {
            class,
            start_index: start,
            len: k,
        }),
        (Some(lc), Some((sc, start, k))) => {
            let cat_l = &categories[lc];
            let residual_l = cat_l.block_size * (cat_l.total_blocks - cat_l.occupied_blocks - 1);
            let cat_s = &categories[sc];
            let residual_s = cat_s.block_size * (cat_s.total_blocks - cat_s.occupied_blocks - k);
            if residual_l > residual_s {
                let idx = cat_l.first_free_index().unwrap();
                Some(Decision::Single { class: lc, index: idx })
            } else {
                Some(Decision::Run {
                    class: sc,
                    start_index: start,
                    len: k,
                })
            }
        }
    }
}

/// Allocates `size` bytes, returning the payload pointer. A recorded
/// corruption error does not fail the allocation once a decision has been
/// committed to — liveness is favored over fail-fast: the block is restored
/// and the request still completes, with the error surfaced alongside
/// success.
///
/// Safety: `region` must be a live pool region of at least
/// `settings`-implied size, and the caller holds the pool lock.
pub(crate) unsafe fn allocate(
    region: *mut u8,
    categories: &mut [CategoryEntry; 8],
    settings: &PoolSettings,
    size: usize,
) -> Outcome<*mut u8> {
    let decision = match decide(region, categories, size) {
        Some(d) => d,
        None => return Outcome::Failure(MempoolError::NoMemory.logged()),
    };

    let (class, start_index, k) = match decision {
        Decision::Single { class, index } => (class, index, 1),
        Decision::Run {
            class,
            start_index,
            len,
        } => (class, start_index, len),
    };
    let cat = categories[class];
    let block_size = cat.block_size;

    let mut warning: Option<MempoolError> = None;

    // Step 1: re-verify each target cell's sentinels and free-counters;
    // restore any mismatch to a clean free block before proceeding.
    for i in 0..k {
        let idx = start_index + i;
        let blk = BlockView::at(cat.block_ptr(region, idx));
        let consistent = blk.verify_start_sentinel()
            && blk.verify_end_sentinel(block_size)
            && blk.is_free()
            && blk.data_size() == NOT_SET;
        if !consistent {
            warning.get_or_insert_with(|| {
                MempoolError::overflow(Some(cat.start_offset + idx * cat.stride())).logged()
            });
            blk.restore_as_free(block_size);
        }
    }

    // Step 2: with full_overflow_checks, verify the payload itself was
    // still all-init; otherwise scrub it back rather than hand out
    // clobbered bytes.
    if settings.full_overflow_checks() {
        for i in 0..k {
            let idx = start_index + i;
            let blk = BlockView::at(cat.block_ptr(region, idx));
            if !blk.payload_is_all(INIT_BYTE, block_size) {
                warning.get_or_insert_with(|| {
                    MempoolError::overflow(Some(cat.start_offset + idx * cat.stride())).logged()
                });
                blk.fill_payload(INIT_BYTE, block_size);
            }
        }
    }

    // Step 3: merge — scrub every interior boundary so the run reads back
    // as one block bounded by the head's start sentinel and the tail's end
    // sentinel.
    for i in 0..k {
        let idx = start_index + i;
        let blk = BlockView::at(cat.block_ptr(region, idx));
        if i != 0 {
            blk.scrub_head();
        }
        if i != k - 1 {
            blk.scrub_tail(block_size);
        }
    }

    // Steps 4-5: stamp the head's counters, zero the requested span if
    // configured. Only the first `size` bytes are zeroed, not the whole
    // merged capacity — the slack beyond it must stay the init byte, which
    // is what `full_overflow_checks` verifies on the next free.
    extra_assert!(size <= k * block_size + 3 * ALIGN * (k - 1));

    let head = BlockView::at(cat.block_ptr(region, start_index));
    head.set_used_blocks(k);
    head.set_data_size(size);
    if settings.zero_on_alloc() {
        ptr::write_bytes(head.payload_ptr(), 0, size);
    }

    // Step 6: fold the consumed run into the category's bookkeeping.
    categories[class].settle_after_alloc(region, start_index, k);

    match warning {
        Some(e) => Outcome::SuccessWithWarning(head.payload_ptr(), e),
        None => Outcome::Success(head.payload_ptr()),
    }
}
