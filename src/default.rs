//! A process-wide default domain and thread local handles for it.
//!
//! The default domain is created lazily on first use.
//! Its configuration can be set once through [`configure`], which must
//! happen before any thread uses the domain.
//! Each thread claims a hazard slot the first time it needs one and keeps it
//! until the thread exits.

use core::cell::Cell;

use conquer_once::OnceCell;

use crate::config::Config;
use crate::domain::{Domain, Reclaimed};
use crate::error::Result;
use crate::local::LocalHandle;
use crate::sync::AtomicPtr;

/********** globals & thread-locals ***************************************************************/

/// The global hazard pointer domain.
static GLOBAL: OnceCell<Domain> = OnceCell::uninit();

thread_local!(static LOCAL: Cell<Option<LocalHandle<'static>>> = Cell::new(None));

/********** public functions **********************************************************************/

/// Initializes the default domain with `config`.
///
/// # Errors
///
/// Fails and hands back `config`, if the default domain has already been
/// initialized, either by a previous call or by its first use.
#[inline]
pub fn configure(config: Config) -> core::result::Result<(), Config> {
    match GLOBAL.try_init_once(|| Domain::new(config)) {
        Ok(_) => {
            tracing::debug!(
                capacity = config.capacity(),
                scan_threshold = config.scan_threshold(),
                "configured default hazard domain"
            );
            Ok(())
        }
        Err(_) => Err(config),
    }
}

/// Returns the default domain, initializing it with the default
/// configuration if necessary.
#[inline]
pub fn global() -> &'static Domain {
    GLOBAL.get_or_init(Domain::default)
}

/// Protects `ptr` with the calling thread's handle for the duration of
/// `read`.
///
/// # Errors
///
/// Fails with [`ResourceExhausted`][crate::Error::ResourceExhausted], if the
/// thread has no handle yet and all slots of the default domain are owned.
/// The next call retries the claim.
#[inline]
pub fn with_protected_read<T, R>(ptr: *const T, read: impl FnOnce(*const T) -> R) -> Result<R> {
    with_local(|local| local.with_protected_read(ptr, read))
}

/// Loads and protects the pointer in `src` with the calling thread's handle
/// and passes a reference to `read`.
///
/// # Errors
///
/// See [`with_protected_read`].
///
/// # Safety
///
/// Every non-null pointer ever stored in `src` must point to a valid value
/// until it is retired in the default domain.
#[inline]
pub unsafe fn with_protected_load<T, R>(
    src: &AtomicPtr<T>,
    read: impl FnOnce(Option<&T>) -> R,
) -> Result<R> {
    with_local(|local| local.with_protected_load(src, read))
}

/// Retires the record at `ptr` in the default domain and reclaims records
/// once the calling thread's retire count reaches the scan threshold.
///
/// # Errors
///
/// See [`with_protected_read`].
///
/// # Safety
///
/// The same requirements as for [`Domain::retire`] apply.
#[inline]
pub unsafe fn retire_and_maybe_reclaim<T: Send + 'static, F>(
    ptr: *mut T,
    deleter: F,
) -> Result<Option<Reclaimed>>
where
    F: FnOnce(*mut T) + Send + 'static,
{
    with_local(|local| local.retire_and_maybe_reclaim(ptr, deleter))
}

/// Runs a reclamation pass on the default domain.
#[inline]
pub fn reclaim() -> Reclaimed {
    global().reclaim()
}

/// Runs `f` with the calling thread's cached handle, claiming one if there is
/// none yet.
///
/// The handle is taken out of the cache while `f` runs, so a nested call
/// claims a second slot instead of overwriting the outer protection.
#[inline]
fn with_local<R>(f: impl FnOnce(&mut LocalHandle<'static>) -> R) -> Result<R> {
    // during thread teardown the cache may already be gone
    let cached = LOCAL.try_with(Cell::take).ok().flatten();
    let mut local = match cached {
        Some(local) => local,
        None => global().register()?,
    };

    let res = f(&mut local);
    // if the cache is already gone, the handle is dropped and releases its slot
    let _ = LOCAL.try_with(move |cell| cell.set(Some(local)));
    Ok(res)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use crate::config::{Config, ConfigBuilder};

    struct DropCount(Arc<AtomicUsize>);
    impl Drop for DropCount {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn configure_after_first_use() {
        let _ = super::global();
        let config = ConfigBuilder::new().capacity(3).build();
        assert_eq!(super::configure(config), Err(config));
        assert_eq!(super::global().capacity(), Config::default().capacity());
    }

    #[test]
    fn handle_is_cached_per_thread() {
        let value = 1;
        let owner = super::with_protected_read(&value, |_| {
            super::with_local(|local| local.owner()).unwrap()
        })
        .unwrap();

        // the nested call borrowed a second slot, the outer handle is cached now
        let cached = super::with_local(|local| local.owner()).unwrap();
        assert_ne!(owner, cached);
        assert_eq!(cached, super::with_local(|local| local.owner()).unwrap());
    }

    #[test]
    fn thread_exit_releases_slot() {
        static VALUE: i32 = 1;
        thread::spawn(|| {
            // leaves the protection in place in the cached handle
            super::with_local(|local| local.protect(&VALUE)).unwrap();
            assert!(super::global().is_guarded(&VALUE as *const i32));
        })
        .join()
        .unwrap();

        assert!(!super::global().is_guarded(&VALUE as *const i32));
    }

    #[test]
    fn retire_and_reclaim() {
        let count = Arc::new(AtomicUsize::new(0));
        let record = Box::into_raw(Box::new(DropCount(Arc::clone(&count))));
        unsafe {
            super::retire_and_maybe_reclaim(record, |ptr| drop(Box::from_raw(ptr))).unwrap();
        }

        // other tests may protect unrelated records, but never this one
        let mut passes = 0;
        while count.load(Ordering::Relaxed) == 0 && passes < 8 {
            super::reclaim();
            passes += 1;
        }

        assert_eq!(count.load(Ordering::Relaxed), 1);
    }
}
