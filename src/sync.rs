//! Atomic primitives, swapped for their `loom` counterparts when model
//! checking.

cfg_if::cfg_if! {
    if #[cfg(loom)] {
        pub(crate) use loom::sync::atomic::{fence, AtomicPtr, AtomicUsize, Ordering};
    } else {
        pub(crate) use std::sync::atomic::{fence, AtomicPtr, AtomicUsize, Ordering};
    }
}
