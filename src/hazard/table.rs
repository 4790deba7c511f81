//! The fixed-capacity table of hazard slots shared by all handles of a
//! domain.

use crossbeam_utils::CachePadded;

use crate::error::{Error, Result};
use crate::hazard::{HazardSlot, OwnerId};
use crate::sanitize;
use crate::sync::{fence, Ordering};

////////////////////////////////////////////////////////////////////////////////////////////////////
// HazardTable
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A fixed number of hazard slots, allocated once and never resized.
///
/// Each slot lives on its own cache line, since every slot is written by its
/// owner and read by every scanning thread.
#[derive(Debug)]
pub(crate) struct HazardTable {
    slots: Box<[CachePadded<HazardSlot>]>,
}

/********** impl inherent *************************************************************************/

impl HazardTable {
    /// Creates a new table with `capacity` unowned slots.
    #[inline]
    pub fn new(capacity: usize) -> Self {
        Self { slots: (0..capacity).map(|_| CachePadded::new(HazardSlot::new())).collect() }
    }

    /// Returns the number of slots in the table.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Claims an unowned slot for `owner`.
    ///
    /// The scan starts at an index derived from `owner` and wraps around, so
    /// that concurrently registering handles do not all race for slot 0.
    /// Each slot is tried once, the first successful CAS wins.
    ///
    /// # Errors
    ///
    /// Fails with [`ResourceExhausted`][Error::ResourceExhausted] if every slot
    /// is owned.
    /// The claim is never retried.
    pub fn claim(&self, owner: OwnerId) -> Result<&HazardSlot> {
        let capacity = self.capacity();
        let start = owner.get() % capacity;

        for idx in (start..capacity).chain(0..start) {
            let slot = &*self.slots[idx];
            if slot.try_claim(owner) {
                tracing::trace!(slot = idx, owner = owner.get(), "claimed hazard slot");
                return Ok(slot);
            }
        }

        tracing::debug!(capacity, owner = owner.get(), "hazard table exhausted");
        Err(Error::ResourceExhausted { capacity })
    }

    /// Returns `true` if any slot currently guards `addr`.
    ///
    /// This is a single wait-free pass over all slots.
    pub fn is_address_guarded(&self, addr: *const ()) -> bool {
        if addr.is_null() {
            return false;
        }

        // (TAB:1) this `SeqCst` fence is totally ordered with the `SeqCst` stores (HAZ:2), every
        // protection published before it is visible to the loads below
        fence(Ordering::SeqCst);

        self.slots.iter().any(|slot| slot.guarded(sanitize::RELAXED_LOAD) == addr)
    }

    /// Returns the number of currently owned slots.
    #[inline]
    pub fn owned(&self) -> usize {
        self.slots.iter().filter(|slot| slot.owner(Ordering::Relaxed).is_some()).count()
    }
}
