//! Testing utilities: tracing setup and deterministic synthetic fields.

#![allow(dead_code)]

use glam::DVec2;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::transform::SimilarityTransform;

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// The displacement used by the known-transform scenarios.
pub fn known_displacement() -> SimilarityTransform {
    SimilarityTransform::new(DVec2::new(3.2, -1.7), 0.05, 1.01)
}

/// `n × n` grid with the given spacing, centered on the origin.
pub fn grid(n: usize, spacing: f64) -> Vec<DVec2> {
    let half = (n as f64 - 1.0) * spacing * 0.5;
    (0..n)
        .flat_map(|row| {
            (0..n).map(move |col| {
                DVec2::new(col as f64 * spacing - half, row as f64 * spacing - half)
            })
        })
        .collect()
}

/// Uniformly distributed points in `[-half_width, half_width]²`.
pub fn random_points(count: usize, half_width: f64, seed: u64) -> Vec<DVec2> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            DVec2::new(
                rng.random_range(-half_width..half_width),
                rng.random_range(-half_width..half_width),
            )
        })
        .collect()
}

/// Standard normal pair via Box-Muller.
pub fn gaussian_pair<R: Rng>(rng: &mut R) -> DVec2 {
    let u1: f64 = rng.random_range(f64::EPSILON..1.0);
    let u2: f64 = rng.random();
    let r = (-2.0 * u1.ln()).sqrt();
    let theta = std::f64::consts::TAU * u2;
    DVec2::new(r * theta.cos(), r * theta.sin())
}

/// Add isotropic Gaussian noise with standard deviation `sigma` per axis.
pub fn add_noise(points: &[DVec2], sigma: f64, seed: u64) -> Vec<DVec2> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    points
        .iter()
        .map(|&p| p + gaussian_pair(&mut rng) * sigma)
        .collect()
}

/// Replace `count` randomly chosen points with uniform random positions.
///
/// Returns the contaminated list and the sorted replaced indices.
pub fn replace_with_spurious(
    points: &[DVec2],
    count: usize,
    half_width: f64,
    seed: u64,
) -> (Vec<DVec2>, Vec<usize>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..points.len()).collect();
    indices.shuffle(&mut rng);
    indices.truncate(count);
    indices.sort_unstable();

    let mut out = points.to_vec();
    for &i in &indices {
        out[i] = DVec2::new(
            rng.random_range(-half_width..half_width),
            rng.random_range(-half_width..half_width),
        );
    }
    (out, indices)
}
