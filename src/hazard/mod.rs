mod table;

use core::num::NonZeroUsize;
use core::ptr;
use std::sync::atomic::{AtomicUsize as StdAtomicUsize, Ordering as StdOrdering};

use crate::sync::{AtomicPtr, AtomicUsize, Ordering};

pub(crate) use self::table::HazardTable;

/// State of a slot's owner field while no handle has claimed it.
const UNOWNED: usize = 0;

////////////////////////////////////////////////////////////////////////////////////////////////////
// OwnerId
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The identity a handle claims a hazard slot under.
///
/// Identities are handed out from a process-wide counter, so no two live
/// handles ever share one, even across different domains.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct OwnerId(NonZeroUsize);

/********** impl inherent *************************************************************************/

impl OwnerId {
    /// Returns a fresh, never before used identity.
    #[inline]
    pub(crate) fn next() -> Self {
        // not part of the reclamation protocol, so always a std atomic
        static NEXT: StdAtomicUsize = StdAtomicUsize::new(1);
        loop {
            if let Some(id) = NonZeroUsize::new(NEXT.fetch_add(1, StdOrdering::Relaxed)) {
                return Self(id);
            }
        }
    }

    /// Returns the raw integer value of the identity.
    #[inline]
    pub fn get(self) -> usize {
        self.0.get()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// HazardSlot
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A slot that must be visible to all threads, marking the address it guards
/// as in use by its owner and therefore protected from reclamation.
#[derive(Debug)]
pub(crate) struct HazardSlot {
    owner: AtomicUsize,
    guarded: AtomicPtr<()>,
}

/********** impl inherent *************************************************************************/

impl HazardSlot {
    /// Creates a new unowned slot guarding nothing.
    #[inline]
    pub fn new() -> Self {
        Self { owner: AtomicUsize::new(UNOWNED), guarded: AtomicPtr::new(ptr::null_mut()) }
    }

    /// Attempts to claim the slot for `owner`, which succeeds only if the slot
    /// is currently unowned.
    #[inline]
    pub fn try_claim(&self, owner: OwnerId) -> bool {
        // (HAZ:1) this `Acquire` CAS synchronizes-with the `Release` store (HAZ:3)
        self.owner.load(Ordering::Relaxed) == UNOWNED
            && self
                .owner
                .compare_exchange(UNOWNED, owner.get(), Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
    }

    /// Returns the current owner of the slot, if there is one.
    #[inline]
    pub fn owner(&self, order: Ordering) -> Option<OwnerId> {
        NonZeroUsize::new(self.owner.load(order)).map(OwnerId)
    }

    /// Stops guarding and hands the slot back to the table.
    ///
    /// The guarded address is cleared before the owner is reset, so a new
    /// owner can never find a stale address left in its slot.
    #[inline]
    pub fn release(&self) {
        self.clear(Ordering::Release);
        // (HAZ:3) this `Release` store synchronizes-with the `Acquire` CAS (HAZ:1)
        self.owner.store(UNOWNED, Ordering::Release);
    }

    /// Publishes `protect` as guarded.
    ///
    /// The store must be sequentially consistent, otherwise a concurrent scan
    /// could miss it while the owner already dereferences the address.
    #[inline]
    pub fn set_guarded(&self, protect: *const (), order: Ordering) {
        debug_assert_eq!(order, Ordering::SeqCst, "this method requires sequential consistency");
        // (HAZ:2) this `SeqCst` store is totally ordered with the `SeqCst` fence (TAB:1)
        self.guarded.store(protect as *mut (), Ordering::SeqCst);
    }

    /// Clears the guarded address.
    #[inline]
    pub fn clear(&self, order: Ordering) {
        self.guarded.store(ptr::null_mut(), order);
    }

    /// Returns the guarded address or `null`.
    #[inline]
    pub fn guarded(&self, order: Ordering) -> *const () {
        self.guarded.load(order)
    }
}

/********** impl Default **************************************************************************/

impl Default for HazardSlot {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
