//! The default domain is process-wide, so these checks live in their own test
//! binary and run as a single test.

#![cfg(not(loom))]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use matches::assert_matches;

use hazard_reclaim::default;
use hazard_reclaim::{ConfigBuilder, Error};

struct DropCount(Arc<AtomicUsize>);
impl Drop for DropCount {
    #[inline]
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn configured_capacity_and_claim_retry() {
    let config = ConfigBuilder::new().capacity(2).scan_threshold(16).build();
    assert_eq!(default::configure(config), Ok(()));
    assert_eq!(default::global().capacity(), 2);
    assert_eq!(default::configure(config), Err(config));

    let first = default::global().register().unwrap();
    let second = default::global().register().unwrap();

    let value = 2;
    let res = default::with_protected_read(&value, |ptr| unsafe { *ptr });
    assert_matches!(res, Err(Error::ResourceExhausted { capacity: 2 }));

    let count = Arc::new(AtomicUsize::new(0));
    let deleter = |ptr: *mut DropCount| unsafe { drop(Box::from_raw(ptr)) };
    let record = Box::into_raw(Box::new(DropCount(Arc::clone(&count))));
    let res = unsafe { default::retire_and_maybe_reclaim(record, deleter) };
    assert_matches!(res, Err(Error::ResourceExhausted { capacity: 2 }));
    // the record was not retired, so it still belongs to this thread
    assert_eq!(default::global().pending(), 0);
    assert_eq!(count.load(Ordering::Relaxed), 0);

    drop(first);
    let res = default::with_protected_read(&value, |ptr| unsafe { *ptr });
    assert_eq!(res, Ok(2));
    assert_eq!(default::global().registered(), 2);

    // the handle claimed by the read is cached and re-used
    let res = unsafe { default::retire_and_maybe_reclaim(record, deleter) };
    assert_matches!(res, Ok(None));
    assert_eq!(default::global().registered(), 2);
    assert_eq!(default::global().pending(), 1);

    assert_eq!(default::reclaim().reclaimed, 1);
    assert_eq!(count.load(Ordering::Relaxed), 1);
    drop(second);
}
