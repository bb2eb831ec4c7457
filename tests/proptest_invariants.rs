//! Property-based checks that a sequence of allocate/free/reallocate calls
//! never corrupts a block still held live, and that the pool never panics
//! or hands out overlapping memory.

use std::collections::HashMap;

use proptest::prelude::*;
use segpool::{Pool, PoolSettingsBuilder, SizeClass};

#[derive(Debug, Clone)]
enum Op {
    Alloc { size: usize, tag: u8 },
    Free { which: usize },
    Realloc { which: usize, new_size: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1usize..300, any::<u8>()).prop_map(|(size, tag)| Op::Alloc { size, tag }),
        (0usize..16).prop_map(|which| Op::Free { which }),
        (0usize..16, 1usize..300).prop_map(|(which, new_size)| Op::Realloc { which, new_size }),
    ]
}

fn build_pool() -> Pool {
    let outcome = PoolSettingsBuilder::new()
        .block_count(SizeClass::C32, 6)
        .block_count(SizeClass::C64, 6)
        .block_count(SizeClass::C128, 6)
        .block_count(SizeClass::C256, 4)
        .full_overflow_checks(true)
        .zero_on_alloc(true)
        .build()
        .unwrap();
    Pool::new(outcome)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every live allocation's tag byte (written at allocation time and
    /// re-checked before every subsequent op) must read back unchanged
    /// right up until that allocation is freed or reallocated away — any
    /// mismatch means some other operation scribbled over memory it did
    /// not own.
    #[test]
    fn live_blocks_are_never_clobbered(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let pool = build_pool();
        // index -> (pointer, size, tag byte the whole payload was filled with)
        let mut live: HashMap<usize, (*mut u8, usize, u8)> = HashMap::new();
        let mut next_id = 0usize;

        for op in ops {
            for (ptr, size, tag) in live.values() {
                let bytes = unsafe { std::slice::from_raw_parts(*ptr, *size) };
                prop_assert!(bytes.iter().all(|&b| b == *tag));
            }

            match op {
                Op::Alloc { size, tag } => {
                    if let Some(p) = pool.allocate(size) {
                        unsafe { std::ptr::write_bytes(p, tag, size) };
                        live.insert(next_id, (p, size, tag));
                        next_id += 1;
                    }
                }
                Op::Free { which } => {
                    if let Some(&(p, _, _)) = live.get(&which) {
                        pool.free(p);
                        live.remove(&which);
                    }
                }
                Op::Realloc { which, new_size } => {
                    if let Some(&(p, old_size, tag)) = live.get(&which) {
                        if let Some(new_p) = pool.reallocate(p, new_size) {
                            let keep = old_size.min(new_size);
                            let prefix = unsafe { std::slice::from_raw_parts(new_p, keep) };
                            prop_assert!(prefix.iter().all(|&b| b == tag));
                            if new_size > old_size {
                                unsafe {
                                    std::ptr::write_bytes(new_p.add(old_size), tag, new_size - old_size);
                                }
                            }
                            live.insert(which, (new_p, new_size, tag));
                        } else {
                            live.remove(&which);
                        }
                    }
                }
            }
        }

        for (p, _, _) in live.values() {
            pool.free(*p);
        }
    }
}
