//! Benchmark for monitor entry/exit overhead.
//!
//! Run with: cargo bench --package turnstile_core --bench monitor_benchmark

#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use turnstile_core::{ActorId, ActorKind, ChannelNotifier, MonitorConfig, ReaderWriterMonitor};

fn quiet_config() -> MonitorConfig {
    MonitorConfig {
        trace_admissions: false,
        ..MonitorConfig::default()
    }
}

fn benchmark_uncontended(c: &mut Criterion) {
    let monitor = ReaderWriterMonitor::with_config(quiet_config());

    c.bench_function("uncontended_read_cycle", |b| {
        b.iter(|| {
            black_box(monitor.start_read(ActorId(1)).unwrap());
            monitor.stop_read(ActorId(1)).unwrap();
        });
    });

    c.bench_function("uncontended_write_cycle", |b| {
        b.iter(|| {
            black_box(monitor.start_write(ActorId(1)).unwrap());
            monitor.stop_write(ActorId(1)).unwrap();
        });
    });

    c.bench_function("try_start_read_cycle", |b| {
        b.iter(|| {
            black_box(monitor.try_start_read(ActorId(1)).unwrap());
            monitor.stop_read(ActorId(1)).unwrap();
        });
    });
}

fn benchmark_with_notifier(c: &mut Criterion) {
    let (notifier, events) = ChannelNotifier::unbounded();
    let monitor = ReaderWriterMonitor::with_config(quiet_config()).with_notifier(Arc::new(notifier));

    c.bench_function("read_cycle_channel_notifier", |b| {
        b.iter(|| {
            black_box(monitor.start_read(ActorId(1)).unwrap());
            monitor.stop_read(ActorId(1)).unwrap();
            // Keep the channel from growing across iterations.
            events.try_iter().for_each(drop);
        });
    });
}

fn benchmark_shared_readers(c: &mut Criterion) {
    let monitor = Arc::new(ReaderWriterMonitor::with_config(quiet_config()));
    let stop = Arc::new(AtomicBool::new(false));

    // Background readers keep the read side busy.
    let background: Vec<_> = (0..3)
        .map(|_| {
            let monitor = Arc::clone(&monitor);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    let id = monitor.next_actor_id(ActorKind::Reader);
                    let session = monitor.read(id).unwrap();
                    black_box(session.waited());
                }
            })
        })
        .collect();

    c.bench_function("read_cycle_with_3_background_readers", |b| {
        b.iter(|| {
            black_box(monitor.start_read(ActorId(0)).unwrap());
            monitor.stop_read(ActorId(0)).unwrap();
        });
    });

    stop.store(true, Ordering::Relaxed);
    for handle in background {
        handle.join().unwrap();
    }
}

criterion_group!(
    benches,
    benchmark_uncontended,
    benchmark_with_notifier,
    benchmark_shared_readers
);
criterion_main!(benches);
