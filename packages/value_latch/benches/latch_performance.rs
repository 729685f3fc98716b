//! Benchmarks for the core latch operations.

#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use value_latch::Latch;

fn close_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("close_cycle");

    group.bench_function("create_close_read", |b| {
        b.iter(|| {
            let latch = Latch::<i32>::new(None);
            latch.close(Some(Arc::new(hint::black_box(42)))).unwrap();
            let (payload, closed) = latch.read();
            hint::black_box((payload, closed));
        });
    });

    group.bench_function("create_close_reopen_close", |b| {
        b.iter(|| {
            let latch = Latch::<i32>::new(None);
            latch.close(Some(Arc::new(1))).unwrap();
            latch.reopen(Some(Arc::new(2)));
            latch.close(None).unwrap();
            hint::black_box(latch.read());
        });
    });

    group.finish();
}

fn set_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_throughput");

    group.bench_function("set_without_history", |b| {
        let latch = Latch::<u64>::new(None);
        let mut value = 0_u64;
        b.iter(|| {
            value = value.wrapping_add(1);
            hint::black_box(latch.set(Some(Arc::new(value))));
        });
    });

    group.bench_function("set_with_history_8", |b| {
        let latch = Latch::<u64>::with_history(None, 8);
        let mut value = 0_u64;
        b.iter(|| {
            value = value.wrapping_add(1);
            hint::black_box(latch.set(Some(Arc::new(value))));
        });
    });

    group.finish();
}

fn waiter_handles(c: &mut Criterion) {
    let mut group = c.benchmark_group("waiter_handles");

    group.bench_function("when_closed_unfired", |b| {
        let latch = Latch::<i32>::new(None);
        b.iter(|| {
            hint::black_box(latch.when_closed());
        });
    });

    group.bench_function("when_closed_await_fired", |b| {
        let latch = Latch::<i32>::new(None);
        latch.close(None).unwrap();
        b.iter(|| {
            futures::executor::block_on(latch.when_closed());
        });
    });

    group.finish();
}

criterion_group!(benches, close_cycle, set_throughput, waiter_handles);
criterion_main!(benches);
