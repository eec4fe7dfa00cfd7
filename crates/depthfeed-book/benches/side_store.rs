//! Benchmarks for bounded-depth side store operations
//!
//! Run with: cargo bench --bench side_store

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use depthfeed_book::SideStore;
use depthfeed_types::{BookSide, LevelDelta};

/// Create N additions stepping away from the best price
fn create_deltas(side: BookSide, count: usize) -> Vec<LevelDelta> {
    (0..count)
        .map(|i| {
            let price = match side {
                BookSide::Bid => 100_000.0 - i as f64,
                BookSide::Ask => 100_001.0 + i as f64,
            };
            LevelDelta::new(side, price, 1.0 + i as f64 / 10.0, i as i64)
        })
        .collect()
}

fn bench_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("side_store_fill");

    for size in [10, 100, 500, 1000] {
        let deltas = create_deltas(BookSide::Bid, size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), &deltas, |b, deltas| {
            b.iter(|| {
                let mut store = SideStore::new(BookSide::Bid, 10);
                let changes = store.apply(black_box(deltas));
                black_box((store, changes))
            })
        });
    }

    group.finish();
}

fn bench_boundary_churn(c: &mut Criterion) {
    // 1000 stored levels behind a 10-level window
    let mut store = SideStore::new(BookSide::Ask, 10);
    store.apply(&create_deltas(BookSide::Ask, 1000));

    let mut group = c.benchmark_group("side_store_churn");

    group.bench_function("best_level_flicker", |b| {
        let insert = [LevelDelta::new(BookSide::Ask, 100_000.5, 1.0, 0)];
        let remove = [LevelDelta::new(BookSide::Ask, 100_000.5, -1.0, 0)];
        b.iter(|| {
            black_box(store.apply(black_box(&insert)));
            black_box(store.apply(black_box(&remove)));
        })
    });

    group.bench_function("hidden_update", |b| {
        let delta = [LevelDelta::new(BookSide::Ask, 100_500.0, 0.5, 0)];
        b.iter(|| black_box(store.apply(black_box(&delta))))
    });

    group.bench_function("visible_window", |b| {
        b.iter(|| black_box(store.visible_vec()))
    });

    group.finish();
}

criterion_group!(benches, bench_fill, bench_boundary_churn);
criterion_main!(benches);
