//! Criterion benchmarks for pricer_core scenario linear algebra.
//!
//! Measures the per-path pseudo-inverse and least-squares regression
//! across path counts to characterise scaling behaviour.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pricer_core::math::{polynomial_basis, ConditionalExpectation, RegressionEstimator};
use pricer_core::scenario::{ScenarioMatrix, ScenarioValue};

/// Lower bidiagonal swap-rate style Jacobian with path noise.
fn generate_jacobian(n: usize, n_paths: usize) -> ScenarioMatrix {
    ScenarioMatrix::from_fn(n, n, n_paths, |r, c| {
        if r == c {
            Some(ScenarioValue::from_fn(n_paths, |p| {
                (r + 1) as f64 + 0.01 * ((p * 7 + r) % 13) as f64
            }))
        } else if c + 1 == r {
            Some(ScenarioValue::constant(-(r as f64)))
        } else {
            None
        }
    })
}

/// Benchmark the per-path pseudo-inverse.
fn bench_pseudo_inverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("pseudo_inverse");

    for (n, n_paths) in [(10, 100), (40, 100), (40, 1000)] {
        let label = format!("{}x{}_{}paths", n, n, n_paths);
        let m = generate_jacobian(n, n_paths);
        group.bench_with_input(BenchmarkId::new("svd", &label), &m, |b, m| {
            b.iter(|| black_box(m).pseudo_inverse());
        });
    }

    group.finish();
}

/// Benchmark regression estimator construction and conditioning.
fn bench_regression(c: &mut Criterion) {
    let mut group = c.benchmark_group("regression");

    for n_paths in [500, 5000] {
        let x = ScenarioValue::from_fn(n_paths, |p| 0.02 + 0.001 * ((p % 97) as f64 - 48.0) / 48.0);
        let y = ScenarioValue::from_fn(n_paths, |p| x.get(p) * 100.0 + ((p * 31) % 17) as f64);
        let basis = polynomial_basis(&[x.clone()], 2);

        group.bench_with_input(BenchmarkId::new("construction", n_paths), &basis, |b, basis| {
            b.iter(|| RegressionEstimator::new(black_box(basis), n_paths));
        });

        if let Ok(estimator) = RegressionEstimator::new(&basis, n_paths) {
            group.bench_with_input(BenchmarkId::new("expectation", n_paths), &y, |b, y| {
                b.iter(|| estimator.expectation(black_box(y)));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_pseudo_inverse, bench_regression);
criterion_main!(benches);
