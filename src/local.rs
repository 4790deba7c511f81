//! Per-thread handles owning a single hazard slot.

use core::cell::Cell;

use crate::domain::{Domain, Reclaimed};
use crate::error::Result;
use crate::guard::Guard;
use crate::hazard::{HazardSlot, OwnerId};
use crate::sync::{AtomicPtr, Ordering};

////////////////////////////////////////////////////////////////////////////////////////////////////
// LocalHandle
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A handle owning exactly one hazard slot of a [`Domain`].
///
/// A handle is meant to be created once per thread (through
/// [`Domain::register`]) and be re-used for every operation of that thread.
/// It can protect a single address at a time.
/// Dropping the handle clears its protection and returns the slot to the
/// domain's table.
#[derive(Debug)]
pub struct LocalHandle<'d> {
    domain: &'d Domain,
    slot: &'d HazardSlot,
    owner: OwnerId,
    /// The counter for determining when to attempt reclamation of retired
    /// records.
    ops_count: Cell<u32>,
}

/********** impl inherent *************************************************************************/

impl<'d> LocalHandle<'d> {
    #[inline]
    pub(crate) fn new(domain: &'d Domain) -> Result<Self> {
        let owner = OwnerId::next();
        let slot = domain.hazards().claim(owner)?;
        Ok(Self { domain, slot, owner, ops_count: Cell::new(0) })
    }

    /// Returns the domain the handle is registered with.
    #[inline]
    pub fn domain(&self) -> &'d Domain {
        self.domain
    }

    /// Returns the identity the handle owns its slot under.
    #[inline]
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Returns the currently protected address or `null`.
    #[inline]
    pub fn protected(&self) -> *const () {
        self.slot.guarded(Ordering::Relaxed)
    }

    /// Publishes `ptr` as protected, replacing any previous protection.
    ///
    /// This must happen before `ptr` is dereferenced.
    /// Protecting a pointer alone does not make dereferencing it safe: the
    /// pointer must still be reachable after it was protected (see
    /// [`protect_load`][LocalHandle::protect_load]).
    #[inline]
    pub fn protect<T>(&self, ptr: *const T) {
        self.slot.set_guarded(ptr as *const (), Ordering::SeqCst);
    }

    /// Clears the protection.
    #[inline]
    pub fn clear(&self) {
        // (LOC:1) this `Release` store ensures all reads through the protected pointer happen
        // before it can be observed as unprotected
        self.slot.clear(Ordering::Release);
    }

    /// Loads the pointer from `src` and protects it.
    ///
    /// The pointer is re-loaded after it has been protected until the loaded
    /// value is stable.
    /// The returned pointer is therefore protected at a point where it was
    /// still stored in `src`, which ensures that it can not have been retired
    /// and reclaimed before.
    /// When the loaded pointer is `null`, the protection is cleared.
    #[inline]
    pub fn protect_load<T>(&self, src: &AtomicPtr<T>) -> *mut T {
        let mut ptr = src.load(Ordering::Relaxed);
        loop {
            if ptr.is_null() {
                self.clear();
                return ptr;
            }

            self.protect(ptr);
            // (LOC:2) this `SeqCst` load can not be ordered before the `SeqCst` store (HAZ:2) and
            // synchronizes-with the `Release` store that originally published `ptr`
            let reloaded = src.load(Ordering::SeqCst);
            if reloaded == ptr {
                return ptr;
            }

            ptr = reloaded;
        }
    }

    /// Protects `ptr` until the returned [`Guard`] is dropped.
    #[inline]
    pub fn guard<T>(&mut self, ptr: *const T) -> Guard<'_, 'd> {
        self.protect(ptr);
        Guard::new(self)
    }

    /// Protects `ptr` for the duration of `read`.
    ///
    /// The protection is cleared on all exit paths, including unwinding.
    #[inline]
    pub fn with_protected_read<T, R>(
        &mut self,
        ptr: *const T,
        read: impl FnOnce(*const T) -> R,
    ) -> R {
        let _guard = self.guard(ptr);
        read(ptr)
    }

    /// Loads and protects the pointer stored in `src` (see
    /// [`protect_load`][LocalHandle::protect_load]) and passes a reference to
    /// `read`.
    ///
    /// The protection is cleared on all exit paths, including unwinding.
    ///
    /// # Safety
    ///
    /// Every non-null pointer ever stored in `src` must point to a valid value
    /// until it is retired in this handle's domain.
    #[inline]
    pub unsafe fn with_protected_load<T, R>(
        &mut self,
        src: &AtomicPtr<T>,
        read: impl FnOnce(Option<&T>) -> R,
    ) -> R {
        let ptr = self.protect_load(src);
        let _guard = Guard::new(self);
        read(ptr.as_ref())
    }

    /// Retires the record at `ptr` (see [`Domain::retire`]) and counts the
    /// call towards the configured scan threshold.
    ///
    /// When the threshold is reached the handle runs a reclamation pass and
    /// returns its outcome.
    ///
    /// # Safety
    ///
    /// The same requirements as for [`Domain::retire`] apply.
    #[inline]
    pub unsafe fn retire_and_maybe_reclaim<T: Send + 'static, F>(
        &self,
        ptr: *mut T,
        deleter: F,
    ) -> Option<Reclaimed>
    where
        F: FnOnce(*mut T) + Send + 'static,
    {
        self.domain.retire(ptr, deleter);
        self.increase_ops_count()
    }

    /// Increases the operations count and triggers a scan if the threshold is
    /// reached.
    #[inline]
    fn increase_ops_count(&self) -> Option<Reclaimed> {
        let count = self.ops_count.get() + 1;
        if count >= self.domain.config().scan_threshold() {
            self.ops_count.set(0);
            Some(self.domain.reclaim())
        } else {
            self.ops_count.set(count);
            None
        }
    }
}

/********** impl Drop *****************************************************************************/

impl Drop for LocalHandle<'_> {
    #[inline]
    fn drop(&mut self) {
        self.slot.release();
        tracing::trace!(owner = self.owner.get(), "released hazard slot");
    }
}
