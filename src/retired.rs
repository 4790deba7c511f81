//! Caching for retired records until they can be safely deleted.
//!
//! # Retired Nodes
//!
//! Every retired record is wrapped in a heap allocated [`RetiredNode`], which
//! stores the record's type-erased address together with a boxed deleter
//! that still knows the record's original type.
//! Nodes are linked into the [`RetireList`], a lock-free stack shared by all
//! threads of a domain.
//!
//! # Draining
//!
//! The list is never searched or partially removed from.
//! Instead, a reclaiming thread swaps out the entire list at once and becomes
//! the exclusive owner of the returned [`Chain`], while concurrently retired
//! records start a new list.

use core::fmt;
use core::ptr::{self, NonNull};

use crate::queue::{RawNode, RawQueue};

/// A type-erased deleter, that destroys the record at the given address.
pub(crate) type Deleter = Box<dyn FnOnce(NonNull<()>) + Send + 'static>;

////////////////////////////////////////////////////////////////////////////////////////////////////
// RetiredNode
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A retired record that has not yet been reclaimed.
pub(crate) struct RetiredNode {
    address: NonNull<()>,
    deleter: Deleter,
    next: *mut RetiredNode,
}

/********** impl inherent *************************************************************************/

impl RetiredNode {
    /// Creates a new node for the record at `record`, which is destroyed by
    /// `deleter` once reclaimed.
    #[inline]
    pub fn new<T: 'static, F>(record: NonNull<T>, deleter: F) -> Box<Self>
    where
        F: FnOnce(*mut T) + Send + 'static,
    {
        Box::new(Self {
            address: record.cast(),
            deleter: Box::new(move |address: NonNull<()>| deleter(address.cast().as_ptr())),
            next: ptr::null_mut(),
        })
    }

    /// Returns the address of the retired record.
    #[inline]
    pub fn address(&self) -> *const () {
        self.address.as_ptr()
    }

    /// Destroys the retired record by calling its deleter and deallocates the
    /// node.
    ///
    /// # Safety
    ///
    /// No thread may still access the retired record.
    #[inline]
    pub unsafe fn reclaim(self: Box<Self>) {
        let RetiredNode { address, deleter, .. } = *self;
        deleter(address);
    }
}

/********** impl Debug ****************************************************************************/

impl fmt::Debug for RetiredNode {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RetiredNode").field("address", &self.address).finish()
    }
}

/********** impl RawNode **************************************************************************/

impl RawNode for RetiredNode {
    #[inline]
    unsafe fn next(node: *mut Self) -> *mut Self {
        (*node).next
    }

    #[inline]
    unsafe fn set_next(node: *mut Self, next: *mut Self) {
        (*node).next = next;
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// RetireList
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The unbounded lock-free list of records awaiting reclamation.
#[derive(Debug)]
pub(crate) struct RetireList {
    queue: RawQueue<RetiredNode>,
}

/********** impl inherent *************************************************************************/

impl RetireList {
    /// Creates a new empty list.
    #[inline]
    pub fn new() -> Self {
        Self { queue: RawQueue::new() }
    }

    /// Returns `true` if no records are currently queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pushes `node` to the front of the list.
    #[inline]
    pub fn push(&self, node: Box<RetiredNode>) {
        unsafe { self.queue.push(Box::into_raw(node)) };
    }

    /// Takes all currently queued records at once and returns them as a chain
    /// only the calling thread can access.
    #[inline]
    pub fn drain_all(&self) -> Chain<'_> {
        Chain { list: self, head: self.queue.take_all() }
    }
}

/********** impl Default **************************************************************************/

impl Default for RetireList {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/********** impl Drop *****************************************************************************/

impl Drop for RetireList {
    #[inline(never)]
    fn drop(&mut self) {
        // reclaims the rest of the chain, should one of the deleters panic
        struct Remaining<'a>(Chain<'a>);

        impl Drop for Remaining<'_> {
            fn drop(&mut self) {
                for node in &mut self.0 {
                    unsafe { node.reclaim() };
                }
            }
        }

        // exclusive access means no hazard can protect any of the records anymore
        let mut remaining = Remaining(self.drain_all());
        for node in &mut remaining.0 {
            unsafe { node.reclaim() };
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// Chain
////////////////////////////////////////////////////////////////////////////////////////////////////

/// An exclusively owned sequence of retired nodes taken from a [`RetireList`].
///
/// Nodes that are neither reclaimed nor re-queued by the time the chain is
/// dropped (e.g. because a deleter panicked) are pushed back into the list
/// they were taken from.
pub(crate) struct Chain<'a> {
    list: &'a RetireList,
    head: *mut RetiredNode,
}

/********** impl Iterator *************************************************************************/

impl Iterator for Chain<'_> {
    type Item = Box<RetiredNode>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.head.is_null() {
            return None;
        }

        let mut node = unsafe { Box::from_raw(self.head) };
        self.head = node.next;
        node.next = ptr::null_mut();
        Some(node)
    }
}

/********** impl Drop *****************************************************************************/

impl Drop for Chain<'_> {
    #[cold]
    fn drop(&mut self) {
        if self.head.is_null() {
            return;
        }

        let first = self.head;
        let mut last = first;
        unsafe {
            while !RetiredNode::next(last).is_null() {
                last = RetiredNode::next(last);
            }

            self.list.queue.push_many((first, last));
        }
    }
}
