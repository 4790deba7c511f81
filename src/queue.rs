//! The intrusive stack underneath every retire list.
//!
//! Retired records are pushed one at a time (or as a requeued run) with a CAS
//! on the head pointer and leave the stack only as a whole, when a
//! reclamation pass swaps the head for `null`.
//! Because single nodes are never popped, the head can not suffer from ABA
//! and the stack needs no reclamation scheme of its own.

use core::ptr;

use crate::sanitize;
use crate::sync::{AtomicPtr, Ordering};

////////////////////////////////////////////////////////////////////////////////////////////////////
// RawNode (trait)
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Access to the intrusive link of a retired record's node.
pub(crate) trait RawNode {
    /// Reads the link of `node`.
    ///
    /// # Safety
    ///
    /// `node` must be alive and owned by the caller, either because it has
    /// not been pushed yet or because it belongs to a drained run.
    unsafe fn next(node: *mut Self) -> *mut Self;

    /// Links `node` to `next`.
    ///
    /// # Safety
    ///
    /// See [`next`][RawNode::next].
    unsafe fn set_next(node: *mut Self, next: *mut Self);
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// RawQueue
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A lock-free LIFO of retired record nodes, linked through their own
/// `next` fields.
///
/// The only way out is [`take_all`][RawQueue::take_all], which hands the
/// whole run to a single reclaiming thread.
#[derive(Debug)]
pub(crate) struct RawQueue<N> {
    head: AtomicPtr<N>,
}

/********** impl inherent *************************************************************************/

impl<N> RawQueue<N> {
    #[inline]
    pub fn new() -> Self {
        Self { head: AtomicPtr::new(ptr::null_mut()) }
    }
}

impl<N: RawNode> RawQueue<N> {
    /// Returns `true` if no retired nodes are waiting.
    ///
    /// This is only a hint, a concurrent push may follow right after.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Relaxed).is_null()
    }

    /// Pushes a single freshly retired `node`.
    ///
    /// # Safety
    ///
    /// `node` must be non-null, alive and exclusively owned by the caller.
    #[inline]
    pub unsafe fn push(&self, node: *mut N) {
        self.push_many((node, node));
    }

    /// Pushes a run of nodes that is already linked from `first` to `last`,
    /// e.g. the unprocessed rest of a drained chain.
    ///
    /// # Safety
    ///
    /// Following the links from `first` must reach `last`, and every node
    /// on the way must be exclusively owned by the caller.
    #[inline]
    pub unsafe fn push_many(&self, (first, last): (*mut N, *mut N)) {
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            N::set_next(last, head);

            // (QUE:1) this `Release` CAS synchronizes-with the `Acquire` swap (QUE:2)
            match self.head.compare_exchange_weak(
                head,
                first,
                sanitize::RELEASE_SUCCESS,
                sanitize::RELEASE_FAIL,
            ) {
                Ok(_) => return,
                Err(actual) => head = actual,
            }
        }
    }

    /// Detaches every queued node at once and returns the first one.
    ///
    /// The caller becomes the sole owner of the returned run, while nodes
    /// pushed afterwards start a new one.
    #[inline]
    pub fn take_all(&self) -> *mut N {
        // avoids the swap if the queue is empty
        if self.is_empty() {
            return ptr::null_mut();
        }

        // (QUE:2) this `Acquire` swap synchronizes-with the `Release` CAS (QUE:1)
        self.head.swap(ptr::null_mut(), Ordering::Acquire)
    }
}
