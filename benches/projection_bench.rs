//! Benchmarks for boundary projection.
//!
//! Run with: `cargo bench --bench projection_bench`
//!
//! Compares scattered interpolation in two and three dimensions with the
//! regular pressure projection of a co-generated site.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use expreccs::config::ExpreccsConfig;
use expreccs::correspondence::{classify_regional_cells, conforming_face_sets, find_site_corners};
use expreccs::projection::{BoundaryKind, BoundaryProjection, RegionalState, ScatteredInterpolator};

/// Regular lattice of support points with a small deterministic perturbation.
fn support(n: usize, layers: usize) -> Vec<[f64; 3]> {
    let mut points = Vec::with_capacity(n * n * layers);
    for k in 0..layers {
        for j in 0..n {
            for i in 0..n {
                let wobble = 0.1 * ((i * 7 + j * 13 + k * 3) % 5) as f64;
                points.push([i as f64 * 10.0 + wobble, j as f64 * 10.0 - wobble, k as f64 * 5.0]);
            }
        }
    }
    points
}

/// Query points along a line crossing the support.
fn queries(n: usize, count: usize, z: f64) -> Vec<[f64; 3]> {
    let span = (n - 1) as f64 * 10.0;
    (0..count)
        .map(|m| {
            let t = (m as f64 + 0.5) / count as f64;
            [0.1 * span + 0.8 * span * t, 0.5 * span, z]
        })
        .collect()
}

fn bench_scattered(c: &mut Criterion) {
    let mut group = c.benchmark_group("scattered_interpolation");
    for n in [8usize, 16, 32] {
        let planar = ScatteredInterpolator::planar(support(n, 1));
        let values: Vec<f64> = (0..planar.len()).map(|p| p as f64).collect();
        let q = queries(n, 64, 0.0);
        group.bench_with_input(BenchmarkId::new("planar", n), &n, |b, _| {
            b.iter(|| black_box(planar.eval_many(black_box(&values), black_box(&q))))
        });

        let spatial = ScatteredInterpolator::spatial(support(n, 3));
        let values: Vec<f64> = (0..spatial.len()).map(|p| p as f64).collect();
        let q = queries(n, 64, 2.5);
        group.bench_with_input(BenchmarkId::new("spatial", n), &n, |b, _| {
            b.iter(|| black_box(spatial.eval_many(black_box(&values), black_box(&q))))
        });
    }
    group.finish();
}

fn bench_boundary_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("boundary_projection");
    for cells in [20usize, 40] {
        let text = format!(
            "[grid]\nregional_dims = [2000.0, 2000.0, 50.0]\nregional_cells = [{cells}, {cells}, 5]\n\
             site_location = [600.0, 600.0, 0.0, 1400.0, 1400.0, 50.0]\nsite_cells = [{s}, {s}, 5]\n\
             [schedule]\ninjection = [[10.0, 5.0, 1.0]]\n",
            s = cells * 2 / 5 * 2,
        );
        let config = ExpreccsConfig::from_str(&text).unwrap();
        let grids = config.nested_grids().unwrap();
        let classes = classify_regional_cells(&grids.regional, &grids.footprint);
        let corners = find_site_corners(&classes, grids.regional.dims()).unwrap();
        let faces = conforming_face_sets(&grids.site, &grids.regional, &corners, &grids.ratio).unwrap();
        let n = grids.regional.n_cells();
        let pressure: Vec<f64> = (0..n).map(|c| 100.0 + (c % 97) as f64).collect();
        let flux: Vec<f64> = (0..n).map(|c| (c % 13) as f64 - 6.0).collect();
        let state = RegionalState {
            pressure: &pressure,
            flux_i: &flux,
            flux_j: &flux,
        };
        for kind in [BoundaryKind::Flux, BoundaryKind::Pres, BoundaryKind::Pres2p] {
            let projection =
                BoundaryProjection::new(kind, &grids.regional, &grids.site, corners, grids.ratio, &faces)
                    .unwrap();
            group.bench_with_input(BenchmarkId::new(kind.name(), cells), &cells, |b, _| {
                b.iter(|| black_box(projection.project_step(black_box(&state)).unwrap()))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_scattered, bench_boundary_projection);
criterion_main!(benches);
