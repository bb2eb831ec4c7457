//! Compile-time-gated assertions for the `extra_assertions` feature. The
//! `full_overflow_checks` pool setting is the *runtime* knob over payload-
//! scrub checks during allocate/free; this is the compile-time knob over
//! category-table invariants, which are cheap enough to always compute but
//! not cheap enough to want unconditionally in a release build serving a
//! hot allocation path.

#[cfg(feature = "extra_assertions")]
macro_rules! extra_assert {
    ( $condition:expr $( , $args:expr )* ) => {
        assert!($condition $( , $args )* )
    }
}

#[cfg(not(feature = "extra_assertions"))]
macro_rules! extra_assert {
    ( $condition:expr $( , $args:expr )* ) => {
        if false {
            let _ = $condition;
            $( let _ = $args; )*
        }
    }
}
