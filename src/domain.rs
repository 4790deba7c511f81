//! The shared reclamation context: the hazard table, the list of retired
//! records and the scan that reclaims them.

use core::ptr::NonNull;

use crate::config::Config;
use crate::error::Result;
use crate::hazard::HazardTable;
use crate::local::LocalHandle;
use crate::retired::{RetireList, RetiredNode};
use crate::sync::{AtomicUsize, Ordering};

////////////////////////////////////////////////////////////////////////////////////////////////////
// Domain
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A hazard pointer domain.
///
/// All handles registered with the same domain protect records from being
/// reclaimed by any thread retiring them into that domain.
/// Domains are fully independent from one another; records retired in one
/// domain are never checked against the hazards of another.
///
/// The capacity of the hazard table is fixed when the domain is created and
/// bounds the number of handles that can be alive at the same time.
#[derive(Debug)]
pub struct Domain {
    config: Config,
    hazards: HazardTable,
    retired: RetireList,
    pending: AtomicUsize,
}

/********** impl Default **************************************************************************/

impl Default for Domain {
    #[inline]
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/********** impl inherent *************************************************************************/

impl Domain {
    /// Creates a new domain with the given `config`.
    #[inline]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            hazards: HazardTable::new(config.capacity()),
            retired: RetireList::new(),
            pending: AtomicUsize::new(0),
        }
    }

    /// Creates a new domain with room for `capacity` simultaneous handles and
    /// an otherwise default configuration.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(crate::ConfigBuilder::new().capacity(capacity).build())
    }

    /// Returns the domain's configuration.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the fixed number of hazard slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.hazards.capacity()
    }

    #[inline]
    pub(crate) fn hazards(&self) -> &HazardTable {
        &self.hazards
    }

    /// Returns the number of handles currently registered.
    #[inline]
    pub fn registered(&self) -> usize {
        self.hazards.owned()
    }

    /// Returns the number of retired records, that have not yet been
    /// reclaimed.
    ///
    /// The value is only a snapshot and may be outdated as soon as it is
    /// returned if other threads retire or reclaim concurrently.
    #[inline]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    /// Claims a hazard slot and returns a handle owning it.
    ///
    /// The handle is meant to be created once per thread and then be re-used
    /// for all operations; it releases its slot when dropped.
    ///
    /// # Errors
    ///
    /// Fails with [`ResourceExhausted`][crate::Error::ResourceExhausted], if
    /// all slots are currently owned by other handles.
    #[inline]
    pub fn register(&self) -> Result<LocalHandle<'_>> {
        LocalHandle::new(self)
    }

    /// Returns `true` if any handle of this domain currently protects `ptr`.
    #[inline]
    pub fn is_guarded<T>(&self, ptr: *const T) -> bool {
        self.hazards.is_address_guarded(ptr as *const ())
    }

    /// Retires the record at `ptr`, which will be destroyed by `deleter` once
    /// no handle protects it anymore and a reclamation pass runs.
    ///
    /// Retiring a `null` pointer has no effect.
    ///
    /// # Safety
    ///
    /// The record must already be unlinked from any shared structure, so that
    /// no thread can acquire a new reference to it, and it must not be retired
    /// more than once.
    ///
    /// `deleter` runs on whichever thread reclaims the record, so records
    /// must be `Send`:
    ///
    /// ```compile_fail
    /// use std::rc::Rc;
    ///
    /// let domain = hazard_reclaim::Domain::with_capacity(1);
    /// let record = Box::into_raw(Box::new(Rc::new(1)));
    /// unsafe { domain.retire_boxed(record) };
    /// ```
    #[inline]
    pub unsafe fn retire<T: Send + 'static, F>(&self, ptr: *mut T, deleter: F)
    where
        F: FnOnce(*mut T) + Send + 'static,
    {
        if let Some(record) = NonNull::new(ptr) {
            self.pending.fetch_add(1, Ordering::Relaxed);
            self.retired.push(RetiredNode::new(record, deleter));
        }
    }

    /// Retires a record that was allocated as a [`Box`].
    ///
    /// # Safety
    ///
    /// In addition to the requirements of [`retire`][Domain::retire], `ptr`
    /// must have been created by [`Box::into_raw`] or [`Box::leak`].
    #[inline]
    pub unsafe fn retire_boxed<T: Send + 'static>(&self, ptr: *mut T) {
        self.retire(ptr, |ptr| drop(Box::from_raw(ptr)));
    }

    /// Destroys the record at `ptr` right away if no handle currently
    /// protects it, otherwise retires it.
    ///
    /// # Safety
    ///
    /// The same requirements as for [`retire`][Domain::retire] apply.
    /// Any thread that protects the record after this call must validate its
    /// protection (e.g. through
    /// [`protect_load`][crate::LocalHandle::protect_load]) before
    /// dereferencing it.
    #[inline]
    pub unsafe fn retire_or_delete<T: Send + 'static, F>(&self, ptr: *mut T, deleter: F) -> Disposal
    where
        F: FnOnce(*mut T) + Send + 'static,
    {
        if ptr.is_null() || self.is_guarded(ptr) {
            self.retire(ptr, deleter);
            Disposal::Retired
        } else {
            deleter(ptr);
            Disposal::Deleted
        }
    }

    /// Reclaims all retired records that are not protected by any handle.
    ///
    /// The current list of retired records is taken at once and each record is
    /// checked exactly once: unprotected records are destroyed, protected ones
    /// are retired again for a later pass.
    /// Records retired while the pass is running are left for the next one.
    /// Any number of threads may call this concurrently.
    pub fn reclaim(&self) -> Reclaimed {
        let mut res = Reclaimed::default();
        if self.retired.is_empty() {
            return res;
        }

        let mut chain = self.retired.drain_all();
        for node in &mut chain {
            if self.hazards.is_address_guarded(node.address()) {
                self.retired.push(node);
                res.requeued += 1;
            } else {
                // safety: the record is unlinked and no hazard protects it, so any thread
                // attempting to protect it now must fail its validation
                self.pending.fetch_sub(1, Ordering::Relaxed);
                unsafe { node.reclaim() };
                res.reclaimed += 1;
            }
        }

        tracing::trace!(reclaimed = res.reclaimed, requeued = res.requeued, "reclamation pass");
        res
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// Reclaimed
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The outcome of a single reclamation pass.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Reclaimed {
    /// The number of records that were destroyed.
    pub reclaimed: usize,
    /// The number of records that were still protected and retired again.
    pub requeued: usize,
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// Disposal
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The outcome of [`retire_or_delete`][Domain::retire_or_delete].
#[derive(Copy, Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Disposal {
    /// The record was unprotected and has been destroyed immediately.
    Deleted,
    /// The record was protected and has been retired.
    Retired,
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::{Disposal, Domain, Reclaimed};

    struct DropCount(Arc<AtomicUsize>);
    impl Drop for DropCount {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record(count: &Arc<AtomicUsize>) -> *mut DropCount {
        Box::into_raw(Box::new(DropCount(Arc::clone(count))))
    }

    #[test]
    fn reclaim_unprotected() {
        let count = Arc::new(AtomicUsize::new(0));
        let domain = Domain::with_capacity(2);

        unsafe {
            domain.retire_boxed(record(&count));
            domain.retire_boxed(record(&count));
        }

        assert_eq!(domain.pending(), 2);
        assert_eq!(count.load(Ordering::Relaxed), 0);
        assert_eq!(domain.reclaim(), Reclaimed { reclaimed: 2, requeued: 0 });
        assert_eq!(count.load(Ordering::Relaxed), 2);
        assert_eq!(domain.pending(), 0);
        assert_eq!(domain.reclaim(), Reclaimed::default());
    }

    #[test]
    fn retire_null() {
        let domain = Domain::with_capacity(1);
        unsafe { domain.retire_boxed(std::ptr::null_mut::<i32>()) };
        assert_eq!(domain.pending(), 0);
    }

    #[test]
    fn custom_deleter() {
        let deleted = Arc::new(AtomicUsize::new(0));
        let domain = Domain::with_capacity(1);

        let ptr = Box::into_raw(Box::new(17usize));
        let witness = Arc::clone(&deleted);
        unsafe {
            domain.retire(ptr, move |ptr| {
                let value = Box::from_raw(ptr);
                witness.store(*value, Ordering::Relaxed);
            })
        };

        domain.reclaim();
        assert_eq!(deleted.load(Ordering::Relaxed), 17);
    }

    #[test]
    fn retire_or_delete() {
        let count = Arc::new(AtomicUsize::new(0));
        let domain = Domain::with_capacity(1);
        let handle = domain.register().unwrap();

        let protected = record(&count);
        handle.protect(protected);

        let deleter = |ptr: *mut DropCount| unsafe { drop(Box::from_raw(ptr)) };
        assert_eq!(unsafe { domain.retire_or_delete(record(&count), deleter) }, Disposal::Deleted);
        assert_eq!(count.load(Ordering::Relaxed), 1);
        assert_eq!(unsafe { domain.retire_or_delete(protected, deleter) }, Disposal::Retired);
        assert_eq!(count.load(Ordering::Relaxed), 1);

        handle.clear();
        assert_eq!(domain.reclaim().reclaimed, 1);
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn drop_reclaims_pending() {
        let count = Arc::new(AtomicUsize::new(0));
        let domain = Domain::with_capacity(1);
        {
            let handle = domain.register().unwrap();
            let ptr = record(&count);
            handle.protect(ptr);
            unsafe { domain.retire_boxed(ptr) };
            assert_eq!(domain.reclaim().requeued, 1);
        }

        drop(domain);
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }
}
