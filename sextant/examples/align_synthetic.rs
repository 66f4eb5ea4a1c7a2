//! Register a synthetic star field and align a synthetic three-exposure visit.
//!
//! ```sh
//! cargo run -p sextant --example align_synthetic
//! RUST_LOG=sextant=debug cargo run -p sextant --example align_synthetic
//! ```

use anyhow::Result;
use common::log_setup::{LogConfig, setup_logging};
use glam::DVec2;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use sextant::catalog::{filter_magnitude, trim_to_field};
use sextant::intra_visit::shift_log_lines;
use sextant::prelude::*;

fn synthetic_catalog(rng: &mut ChaCha8Rng, count: usize, half_width: f64) -> PointSet {
    let points = (0..count)
        .map(|_| {
            DVec2::new(
                rng.random_range(-half_width..half_width),
                rng.random_range(-half_width..half_width),
            )
        })
        .collect();
    let magnitudes = (0..count).map(|_| rng.random_range(16.0..26.0)).collect();
    PointSet::new(points).with_magnitudes(magnitudes)
}

fn jitter(rng: &mut ChaCha8Rng, points: &[DVec2], amplitude: f64) -> Vec<DVec2> {
    points
        .iter()
        .map(|&p| {
            p + DVec2::new(
                rng.random_range(-amplitude..amplitude),
                rng.random_range(-amplitude..amplitude),
            )
        })
        .collect()
}

fn main() -> Result<()> {
    setup_logging(&LogConfig::default());

    let mut rng = ChaCha8Rng::seed_from_u64(2024);

    // Reference catalog covers a wider area than the image
    let reference = synthetic_catalog(&mut rng, 600, 800.0);
    let displacement = SimilarityTransform::new(DVec2::new(4.2, -2.8), 0.004, 1.0005);

    let inside: Vec<usize> = reference
        .points()
        .iter()
        .enumerate()
        .filter(|(_, p)| p.x.abs() < 500.0 && p.y.abs() < 500.0)
        .map(|(i, _)| i)
        .collect();
    let image = reference.select(&inside);
    let target = image.with_points(jitter(
        &mut rng,
        &displacement.apply_all(image.points()),
        0.08,
    ));

    let target = filter_magnitude(&target, 15.0, 25.0);
    let reference = trim_to_field(&reference, &target, 1.1);

    let config = RegistrationConfig {
        termination: Termination::Converged {
            max_iterations: 8,
            shift: 1e-3,
            rotation: 1e-6,
            scale: 1e-6,
        },
        ..Default::default()
    };
    let result = Registrator::new(config).register(&reference, &target, &IdentityProjection)?;

    for line in result.log_lines() {
        println!("{line}");
    }
    println!("applied:   {displacement}");
    println!("recovered: {}", result.transform);

    let base = jitter(&mut rng, target.points(), 0.02);
    let offsets = [DVec2::ZERO, DVec2::new(0.35, -0.2), DVec2::new(40.0, 40.0)];
    let exposures: Vec<Exposure<'_>> = offsets
        .iter()
        .enumerate()
        .map(|(i, &offset)| Exposure {
            label: format!("exp_{i}"),
            detections: PointSet::new(base.iter().map(|&p| p + offset).collect()),
            projection: &IdentityProjection,
        })
        .collect();

    let shifts = IntraVisitAligner::new(IntraVisitConfig::default()).align(&exposures)?;
    for line in shift_log_lines(&shifts) {
        println!("{line}");
    }

    Ok(())
}
