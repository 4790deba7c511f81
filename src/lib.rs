//! Hazard pointer based concurrent memory reclamation with a fixed-capacity
//! table of hazard slots.
//!
//! A difficult problem that has to be considered when implementing lock-free
//! collections or data structures is deciding, when a removed entry can be
//! safely deallocated.
//! It is usually not correct to deallocate removed entries right away, because
//! different threads might still hold references to such entries and could
//! consequently access already freed memory.
//!
//! The hazard pointer reclamation scheme was described by Maged M. Michael in
//! 2004 [[1]].
//! It requires every *read* of an entry from shared memory to be accompanied by
//! a global announcement marking the read entry as protected.
//! Removed entries are *retired* instead of freed and reclaimed in bulk at a
//! later point, once no hazard pointer protects them anymore.
//!
//! # Domains and Handles
//!
//! All shared state lives in a [`Domain`]: a table with a fixed number of
//! hazard slots and a lock-free list of retired records.
//! Domains are explicit values, so independent structures (or tests) can use
//! independent domains.
//! A thread participates by registering a [`LocalHandle`], which claims one
//! slot for as long as the handle lives.
//! When every slot is owned, registering fails with
//! [`Error::ResourceExhausted`] and it is up to the caller how to proceed.
//!
//! A process-wide domain with thread local handles is available in the
//! [`default`] module.
//!
//! # Protecting and Retiring
//!
//! Readers publish the address they are about to dereference through
//! [`protect`][LocalHandle::protect] (or the validating
//! [`protect_load`][LocalHandle::protect_load]) and clear it when done.
//! The scoped [`with_protected_read`][LocalHandle::with_protected_read] and
//! [`Guard`] clear the protection on every exit path.
//!
//! Writers that have unlinked a record call [`retire`][Domain::retire] with a
//! deleter for it, and at some point [`reclaim`][Domain::reclaim], which
//! destroys every retired record no slot protects and keeps the others for a
//! later pass.
//! [`retire_and_maybe_reclaim`][LocalHandle::retire_and_maybe_reclaim] does
//! both, reclaiming whenever the configured scan threshold is reached.
//!
//! ```
//! use std::ptr;
//! use std::sync::atomic::{AtomicPtr, Ordering};
//!
//! use hazard_reclaim::Domain;
//!
//! let domain = Domain::with_capacity(4);
//! let shared = AtomicPtr::new(Box::into_raw(Box::new(1)));
//!
//! let mut handle = domain.register().unwrap();
//! let read = unsafe { handle.with_protected_load(&shared, |value| value.copied()) };
//! assert_eq!(read, Some(1));
//!
//! let unlinked = shared.swap(ptr::null_mut(), Ordering::AcqRel);
//! unsafe { domain.retire_boxed(unlinked) };
//! assert_eq!(domain.reclaim().reclaimed, 1);
//! ```
//!
//! [1]: https://dl.acm.org/citation.cfm?id=987595

#![warn(missing_docs)]

#[cfg(not(loom))]
pub mod default;

mod config;
mod domain;
mod error;
mod guard;
mod hazard;
mod local;
mod queue;
mod retired;
mod sync;


pub use crate::config::{Config, ConfigBuilder};
pub use crate::domain::{Disposal, Domain, Reclaimed};
pub use crate::error::{Error, Result};
pub use crate::guard::Guard;
pub use crate::hazard::OwnerId;
pub use crate::local::LocalHandle;

// The ThreadSanitizer can not correctly asses ordering restraints from explicit
// fences, so memory operations around such fences need stricter ordering than
// `Relaxed`, when instrumentation is chosen.

#[cfg(not(any(feature = "sanitize-threads", loom)))]
mod sanitize {
    use crate::sync::Ordering;

    pub const RELAXED_LOAD: Ordering = Ordering::Relaxed;

    pub const RELEASE_SUCCESS: Ordering = Ordering::Release;
    pub const RELEASE_FAIL: Ordering = Ordering::Relaxed;
}

#[cfg(any(feature = "sanitize-threads", loom))]
mod sanitize {
    use crate::sync::Ordering;

    pub const RELAXED_LOAD: Ordering = Ordering::Acquire;

    pub const RELEASE_SUCCESS: Ordering = Ordering::AcqRel;
    pub const RELEASE_FAIL: Ordering = Ordering::Acquire;
}
