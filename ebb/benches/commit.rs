//! Benchmarks for the append and commit path.
//!
//! Run with: `cargo bench -p ebb -- commit`

#![allow(missing_docs, clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ebb::{Component, ComponentOptions, Durability, Labels, RetentionConfig, SeriesRef};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tempfile::tempdir;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Opens a component with a one-hour window in a fresh directory.
fn setup(durability: Durability) -> (Component, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let options = ComponentOptions::new(temp_dir.path()).with_durability(durability);
    let config = RetentionConfig::new(Duration::from_secs(3600)).unwrap();
    let component = Component::open_with(options, config).unwrap();
    (component, temp_dir)
}

fn series(count: usize) -> Vec<Labels> {
    (0..count)
        .map(|i| Labels::metric("bench_metric", [("id", i.to_string())]))
        .collect()
}

fn bench_append(c: &mut Criterion) {
    let (component, _dir) = setup(Durability::Buffered);
    let labels = series(1).remove(0);
    let ts = now_ms();

    c.bench_function("append/add_fast", |b| {
        let mut app = component.new_appender();
        let series: SeriesRef = app.add(&labels, ts, 0.0).unwrap();
        b.iter(|| {
            black_box(
                app.add_fast(black_box(series), black_box(ts), black_box(42.5))
                    .unwrap(),
            );
        });
        app.rollback().unwrap();
    });
}

fn bench_commit_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit/batch_size");

    for size in [1usize, 10, 100, 1000] {
        let (component, _dir) = setup(Durability::Buffered);
        let labels = series(size);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let ts = now_ms();
                let mut app = component.new_appender();
                for (i, l) in labels.iter().enumerate() {
                    app.add(l, ts, i as f64).unwrap();
                }
                black_box(app.commit().unwrap());
            });
        });
    }

    group.finish();
}

fn bench_commit_fsync(c: &mut Criterion) {
    let (component, _dir) = setup(Durability::Fsync);
    let labels = series(30);

    c.bench_function("commit/fsync_30_series", |b| {
        b.iter(|| {
            let ts = now_ms();
            let mut app = component.new_appender();
            for l in &labels {
                app.add(l, ts, 99.9).unwrap();
            }
            black_box(app.commit().unwrap());
        });
    });
}

fn bench_commit_all_stale(c: &mut Criterion) {
    let (component, _dir) = setup(Durability::Buffered);
    let labels = series(30);

    c.bench_function("commit/all_stale_30_series", |b| {
        b.iter(|| {
            let mut app = component.new_appender();
            for l in &labels {
                app.add(l, 0, 1.0).unwrap();
            }
            black_box(app.commit().unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_append,
    bench_commit_batch,
    bench_commit_fsync,
    bench_commit_all_stale,
);
criterion_main!(benches);
