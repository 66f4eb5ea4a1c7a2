use glam::DVec2;

use super::*;
use crate::config::{EscalationConfig, FitMethod, RansacConfig, Termination};
use crate::outliers::{dispersion, flag_outliers, residual_norms};
use crate::testing::{add_noise, grid, init_tracing, known_displacement, replace_with_spurious};
use crate::transform::TransformModel;

const NOISE_SIGMA: f64 = 0.05;

/// Reference displaced by the known transform; target is the true field plus noise.
fn displaced_field(seed: u64) -> (PointSet, PointSet) {
    let truth = grid(8, 25.0);
    let reference = known_displacement().apply_all(&truth);
    let target = add_noise(&truth, NOISE_SIGMA, seed);
    (PointSet::new(reference), PointSet::new(target))
}

fn five_iterations() -> RegistrationConfig {
    RegistrationConfig {
        termination: Termination::Fixed { iterations: 5 },
        ..Default::default()
    }
}

/// The recovered transform must undo the applied displacement.
fn assert_recovers_inverse(result: &RegistrationResult) {
    let residual = result.transform.compose(&known_displacement());
    let (shift, rotation, scale) = residual.deviation_from_identity();
    assert!(shift < 0.1, "residual shift {}", shift);
    assert!(rotation < 0.002, "residual rotation {}", rotation);
    assert!(scale < 0.002, "residual scale {}", scale);
}

#[test]
fn test_identity_registration() {
    init_tracing();
    let points = PointSet::new(grid(6, 25.0));
    let result = register(&points, &points, &RegistrationConfig::default()).unwrap();

    assert_eq!(result.iterations.len(), 3);
    assert_eq!(result.num_good, 36);
    let (shift, rotation, scale) = result.transform.deviation_from_identity();
    assert!(shift < 1e-9 && rotation < 1e-12 && scale < 1e-12);
    assert_eq!(result.dispersion, 0.0);
}

#[test]
fn test_known_transform_recovery() {
    init_tracing();
    let (reference, target) = displaced_field(17);
    let result = register(&reference, &target, &five_iterations()).unwrap();

    assert_eq!(result.iterations.len(), 5);
    assert_recovers_inverse(&result);
    assert!(
        result.dispersion < 4.0 * NOISE_SIGMA,
        "dispersion {} not commensurate with noise",
        result.dispersion
    );
    assert!(result.num_good >= 56);

    // Steps shrink once the solution has settled
    let last = result.last().unwrap();
    assert!(last.step.deviation_from_identity().0 < 0.05);
}

#[test]
fn test_accumulated_transform_is_composition_of_steps() {
    let (reference, target) = displaced_field(23);
    let result = register(&reference, &target, &five_iterations()).unwrap();

    let composed = result
        .iterations
        .iter()
        .fold(SimilarityTransform::identity(), |acc, r| r.step.compose(&acc));
    let (shift, rotation, scale) = composed
        .compose(&result.transform.inverse())
        .deviation_from_identity();
    assert!(shift < 1e-9 && rotation < 1e-12 && scale < 1e-12);
    assert_eq!(result.iterations.last().unwrap().total, result.transform);
}

#[test]
fn test_outlier_robustness() {
    init_tracing();
    let truth = grid(8, 25.0);
    let reference = PointSet::new(known_displacement().apply_all(&truth));
    let clean = add_noise(&truth, NOISE_SIGMA, 5);
    // 13 of 64 ≈ 20% contamination
    let (contaminated, replaced) = replace_with_spurious(&clean, 13, 100.0, 6);
    let target = PointSet::new(contaminated);

    let result = register(&reference, &target, &five_iterations()).unwrap();
    assert_recovers_inverse(&result);

    let norms = residual_norms(&result.transform, reference.points(), target.points());
    let flags = flag_outliers(&norms, dispersion(&norms), 4.0);
    let flagged = flags.iter().filter(|&&f| f).count() as f64 / flags.len() as f64;
    assert!(
        (0.15..=0.25).contains(&flagged),
        "flagged fraction {} inconsistent with 20% contamination",
        flagged
    );
    for &i in &replaced {
        assert!(flags[i], "spurious point {} not flagged", i);
    }
}

#[test]
fn test_ransac_fit_method() {
    let (reference, target) = displaced_field(31);
    let config = RegistrationConfig {
        fit: FitMethod::Ransac(RansacConfig {
            seed: Some(3),
            ..Default::default()
        }),
        ..five_iterations()
    };
    let result = register(&reference, &target, &config).unwrap();
    assert_recovers_inverse(&result);
}

#[test]
fn test_translation_model() {
    let truth = grid(8, 25.0);
    let offset = DVec2::new(-6.5, 4.0);
    let reference = PointSet::new(truth.iter().map(|&p| p - offset).collect());
    let target = PointSet::new(add_noise(&truth, NOISE_SIGMA, 8));

    let config = RegistrationConfig {
        model: TransformModel::Translation,
        ..Default::default()
    };
    let result = register(&reference, &target, &config).unwrap();

    assert!((result.transform.translation - offset).length() < 0.05);
    for record in &result.iterations {
        assert_eq!(record.step.rotation, 0.0);
        assert_eq!(record.step.scale, 1.0);
    }
}

#[test]
fn test_projection_applied_before_matching() {
    // The reference lives in a frame rotated and shifted away from the target;
    // the projection brings it back.
    let truth = grid(8, 25.0);
    let frame = SimilarityTransform::new(DVec2::new(500.0, -300.0), 1.2, 2.0);
    let reference = PointSet::new(frame.apply_all(&truth));
    let target = PointSet::new(add_noise(&truth, NOISE_SIGMA, 12));
    let to_pixels = frame.inverse();

    let calls = std::cell::Cell::new(0);
    let projection = |p: DVec2| {
        calls.set(calls.get() + 1);
        to_pixels.apply(p)
    };

    let registrator = Registrator::new(RegistrationConfig::default());
    let result = registrator
        .register(&reference, &target, &projection)
        .unwrap();

    assert_eq!(calls.get(), 3 * reference.len());
    assert!(result.transform.deviation_from_identity().0 < 0.05);
}

#[test]
fn test_convergence_policy_stops_early() {
    let points = PointSet::new(grid(6, 25.0));
    let config = RegistrationConfig {
        termination: Termination::Converged {
            max_iterations: 10,
            shift: 1e-3,
            rotation: 1e-5,
            scale: 1e-5,
        },
        ..Default::default()
    };
    let result = register(&points, &points, &config).unwrap();
    assert_eq!(result.iterations.len(), 1);
}

#[test]
fn test_convergence_policy_respects_max_iterations() {
    let (reference, target) = displaced_field(41);
    let config = RegistrationConfig {
        termination: Termination::Converged {
            max_iterations: 2,
            shift: 1e-12,
            rotation: 1e-12,
            scale: 1e-12,
        },
        ..Default::default()
    };
    let result = register(&reference, &target, &config).unwrap();
    assert_eq!(result.iterations.len(), 2);
}

#[test]
fn test_failure_carries_partial_result() {
    init_tracing();
    let reference = PointSet::new(grid(6, 25.0));
    let target = PointSet::new(
        grid(6, 25.0)
            .into_iter()
            .map(|p| p + DVec2::new(5000.0, 0.0))
            .collect(),
    );

    let err = register(&reference, &target, &RegistrationConfig::default()).unwrap_err();
    match &err {
        Error::RegistrationFailure {
            iteration,
            source,
            partial,
        } => {
            assert_eq!(*iteration, 1);
            assert!(matches!(**source, Error::NoMatches { .. }));
            assert!(partial.iterations.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_failure_after_completed_iterations() {
    // The projection drifts away after the first call, so iteration 2 finds nothing.
    let points = grid(6, 25.0);
    let reference = PointSet::new(points.clone());
    let target = PointSet::new(points);

    let calls = std::cell::Cell::new(0usize);
    let n = reference.len();
    let projection = |p: DVec2| {
        calls.set(calls.get() + 1);
        if calls.get() > n {
            p + DVec2::new(1.0e6, 0.0)
        } else {
            p
        }
    };

    let err = Registrator::new(RegistrationConfig::default())
        .register(&reference, &target, &projection)
        .unwrap_err();
    let partial = err.partial_result().unwrap();
    assert_eq!(partial.iterations.len(), 1);
    assert_eq!(partial.iterations[0].n_good, 36);
    assert!(matches!(
        err,
        Error::RegistrationFailure { iteration: 2, .. }
    ));
}

#[test]
fn test_clip_radius_grows_when_nothing_survives() {
    // Offset 30 px: beyond the default 20 px clip radius, inside 40 px
    let reference = PointSet::new(grid(6, 200.0));
    let target = PointSet::new(
        grid(6, 200.0)
            .into_iter()
            .map(|p| p + DVec2::new(30.0, 0.0))
            .collect(),
    );
    let config = RegistrationConfig {
        termination: Termination::Fixed { iterations: 2 },
        escalation: EscalationConfig {
            step: 10.0,
            ..Default::default()
        },
        ..Default::default()
    };
    let result = register(&reference, &target, &config).unwrap();

    assert_eq!(result.iterations[0].n_matched, 36);
    assert!(result.iterations[0].tolerance >= 30.0);
    assert!((result.transform.translation - DVec2::new(30.0, 0.0)).length() < 1e-6);
}

#[test]
fn test_log_lines() {
    let points = PointSet::new(grid(6, 25.0));
    let result = register(&points, &points, &RegistrationConfig::default()).unwrap();
    let lines = result.log_lines();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], REGISTRATION_LOG_HEADER);
    assert_eq!(
        lines[1],
        "    1        0.0000        0.0000        0.0000       1.00000         0.000   36"
    );
}

#[test]
fn test_result_serializes_to_json() {
    let points = PointSet::new(grid(6, 25.0));
    let result = register(&points, &points, &RegistrationConfig::default()).unwrap();

    let json = serde_json::to_string(&result).unwrap();
    let back: RegistrationResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back.iterations.len(), 3);
    assert_eq!(back.num_good, result.num_good);
}

#[test]
#[should_panic(expected = "outlier_sigma must be positive")]
fn test_invalid_config_rejected_at_construction() {
    let _ = Registrator::new(RegistrationConfig {
        outlier_sigma: 0.0,
        ..Default::default()
    });
}
