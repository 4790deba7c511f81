use std::hint::black_box;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use hazard_reclaim::{ConfigBuilder, Domain};

/// Benchmark: protecting a shared pointer and clearing the protection again.
fn bench_protect_load(c: &mut Criterion) {
    let domain = Domain::with_capacity(1);
    let handle = domain.register().unwrap();
    let shared = AtomicPtr::new(Box::into_raw(Box::new(1u64)));

    c.bench_function("protect_load", |b| {
        b.iter(|| {
            black_box(handle.protect_load(&shared));
            handle.clear();
        })
    });

    unsafe { domain.retire_boxed(shared.swap(ptr::null_mut(), Ordering::Relaxed)) };
}

/// Benchmark: replacing a shared record and retiring the old one, with a
/// reclamation pass every `scan_threshold` retires.
fn bench_retire(c: &mut Criterion) {
    let mut group = c.benchmark_group("retire_and_maybe_reclaim");

    for scan_threshold in [1u32, 16, 128].iter() {
        group.bench_with_input(
            BenchmarkId::new("scan_threshold", scan_threshold),
            scan_threshold,
            |b, &scan_threshold| {
                let config =
                    ConfigBuilder::new().capacity(1).scan_threshold(scan_threshold).build();
                let domain = Domain::new(config);
                let handle = domain.register().unwrap();
                let shared = AtomicPtr::new(Box::into_raw(Box::new(0u64)));

                b.iter(|| {
                    let unlinked = shared.swap(Box::into_raw(Box::new(1)), Ordering::AcqRel);
                    let res = unsafe {
                        handle.retire_and_maybe_reclaim(unlinked, |ptr| drop(Box::from_raw(ptr)))
                    };
                    black_box(res);
                });

                unsafe { domain.retire_boxed(shared.swap(ptr::null_mut(), Ordering::Relaxed)) };
            },
        );
    }

    group.finish();
}

/// Benchmark: a reclamation pass over 100 retired records while a varying
/// number of handles protect unrelated addresses.
fn bench_reclaim_with_protected(c: &mut Criterion) {
    const RECORDS: usize = 100;
    let mut group = c.benchmark_group("reclaim_with_protected");

    for protected in [0usize, 4, 16, 64].iter() {
        group.bench_with_input(BenchmarkId::new("handles", protected), protected, |b, &protected| {
            let domain = Domain::with_capacity(64);
            let values: Vec<_> = (0..protected).map(Box::new).collect();
            let handles: Vec<_> = values
                .iter()
                .map(|value| {
                    let handle = domain.register().unwrap();
                    handle.protect(&**value);
                    handle
                })
                .collect();

            b.iter(|| {
                for i in 0..RECORDS {
                    unsafe { domain.retire_boxed(Box::into_raw(Box::new(i))) };
                }

                black_box(domain.reclaim());
            });

            drop(handles);
        });
    }

    group.finish();
}

criterion_group!(benches, bench_protect_load, bench_retire, bench_reclaim_with_protected);
criterion_main!(benches);
