//! Benchmarks for regional cell classification.
//!
//! Run with: `cargo bench --bench classify_bench`
//!
//! Enable the `parallel` feature to compare against the rayon path.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use expreccs::correspondence::{classify_regional_cells, find_site_corners};
use expreccs::grid::{AxisPartition, GridKind, build_grid};
use expreccs::types::Footprint;

fn bench_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_regional_cells");
    for n in [50usize, 100, 200] {
        let regional = build_grid(
            GridKind::Regional,
            [0.0; 3],
            [10_000.0, 10_000.0, 100.0],
            &[
                AxisPartition::Uniform(n),
                AxisPartition::Uniform(n),
                AxisPartition::Uniform(5),
            ],
        )
        .unwrap();
        let footprint = Footprint::new([3000.0, 4000.0, 0.0], [6000.0, 7000.0, 100.0]);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let classes = classify_regional_cells(black_box(&regional), black_box(&footprint));
                black_box(find_site_corners(&classes, regional.dims()).unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_classification);
criterion_main!(benches);
