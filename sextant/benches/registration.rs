//! Benchmarks for the registration engine.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use glam::DVec2;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use sextant::config::RansacConfig;
use sextant::{
    IdentityProjection, KdTree, MatchConfig, PointSet, RegistrationConfig, Registrator,
    SimilarityTransform, TransformModel, fit_robust, match_points,
};

/// Uniform random field with a shifted, slightly jittered copy.
fn generate_field(count: usize, seed: u64) -> (Vec<DVec2>, Vec<DVec2>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let transform = SimilarityTransform::new(DVec2::new(2.5, -1.5), 0.01, 1.002);

    let reference: Vec<DVec2> = (0..count)
        .map(|_| DVec2::new(rng.random_range(0.0..2000.0), rng.random_range(0.0..2000.0)))
        .collect();
    let target = reference
        .iter()
        .map(|&p| {
            let jitter = DVec2::new(rng.random_range(-0.1..0.1), rng.random_range(-0.1..0.1));
            transform.apply(p) + jitter
        })
        .collect();
    (reference, target)
}

fn benchmark_kdtree(c: &mut Criterion) {
    let mut group = c.benchmark_group("kdtree");

    for count in [100, 1_000, 10_000] {
        let (points, queries) = generate_field(count, 1);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_function(BenchmarkId::new("build", count), |b| {
            b.iter(|| black_box(KdTree::build(black_box(&points))))
        });

        let tree = KdTree::build(&points);
        group.bench_function(BenchmarkId::new("nearest", count), |b| {
            b.iter(|| {
                for &q in &queries {
                    let _ = black_box(tree.nearest(black_box(q)));
                }
            })
        });
    }

    group.finish();
}

fn benchmark_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("tolerance_match");
    let config = MatchConfig::default();

    for count in [100, 500, 2_000] {
        let (reference, target) = generate_field(count, 2);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(BenchmarkId::new("match_points", count), |b| {
            b.iter(|| black_box(match_points(&reference, &target, &config, 20.0)))
        });
    }

    group.finish();
}

fn benchmark_ransac(c: &mut Criterion) {
    let mut group = c.benchmark_group("ransac");
    let config = RansacConfig {
        seed: Some(42),
        ..Default::default()
    };

    for count in [20, 100, 500] {
        let (reference, target) = generate_field(count, 3);
        group.bench_function(BenchmarkId::new("similarity", count), |b| {
            b.iter(|| {
                black_box(fit_robust(
                    black_box(&reference),
                    black_box(&target),
                    TransformModel::Similarity,
                    &config,
                ))
            })
        });
    }

    group.finish();
}

fn benchmark_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");
    let registrator = Registrator::new(RegistrationConfig::default());

    for count in [200, 1_000] {
        let (reference, target) = generate_field(count, 4);
        let reference = PointSet::new(reference);
        let target = PointSet::new(target);
        group.bench_function(BenchmarkId::new("register", count), |b| {
            b.iter(|| black_box(registrator.register(&reference, &target, &IdentityProjection)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_kdtree,
    benchmark_matching,
    benchmark_ransac,
    benchmark_registration
);
criterion_main!(benches);
