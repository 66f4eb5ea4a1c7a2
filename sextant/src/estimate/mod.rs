//! Transform estimation from point correspondences.
//!
//! [`fit_simple`] is the closed-form least-squares (Umeyama) solution used for
//! every accepted correspondence list; [`fit_robust`] wraps it in RANSAC for
//! jobs whose matches are expected to carry gross outliers.


mod ransac;

pub use ransac::{RobustFit, fit_robust};

use glam::DVec2;

use crate::config::FitMethod;
use crate::constants::MIN_REFERENCE_VARIANCE;
use crate::error::Error;
use crate::transform::{SimilarityTransform, TransformModel};

/// Least-squares transform minimizing `Σ |T(ref) - target|²`.
///
/// `Translation` needs one pair (mean offset), `Similarity` needs two.
pub fn fit_simple(
    ref_points: &[DVec2],
    target_points: &[DVec2],
    model: TransformModel,
) -> Result<SimilarityTransform, Error> {
    debug_assert_eq!(
        ref_points.len(),
        target_points.len(),
        "point lists must be paired"
    );

    let required = model.min_points();
    if ref_points.len() < required {
        return Err(Error::InsufficientPoints {
            found: ref_points.len(),
            required,
        });
    }

    match model {
        TransformModel::Translation => Ok(estimate_translation(ref_points, target_points)),
        TransformModel::Similarity => estimate_similarity(ref_points, target_points),
    }
}

/// Fit with the job's estimator.
///
/// Returns the transform plus, for RANSAC, the inlier mask over the input
/// pairs. Least squares reports every pair as an inlier.
pub fn fit_with(
    method: &FitMethod,
    ref_points: &[DVec2],
    target_points: &[DVec2],
    model: TransformModel,
) -> Result<RobustFit, Error> {
    match method {
        FitMethod::LeastSquares => {
            let transform = fit_simple(ref_points, target_points, model)?;
            Ok(RobustFit {
                transform,
                inliers: vec![true; ref_points.len()],
            })
        }
        FitMethod::Ransac(config) => fit_robust(ref_points, target_points, model, config),
    }
}

fn centroid(points: &[DVec2]) -> DVec2 {
    points.iter().copied().sum::<DVec2>() / points.len() as f64
}

fn estimate_translation(ref_points: &[DVec2], target_points: &[DVec2]) -> SimilarityTransform {
    SimilarityTransform::translation(centroid(target_points) - centroid(ref_points))
}

fn estimate_similarity(
    ref_points: &[DVec2],
    target_points: &[DVec2],
) -> Result<SimilarityTransform, Error> {
    let ref_centroid = centroid(ref_points);
    let tar_centroid = centroid(target_points);

    // Cross-covariance terms of the centered lists
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syx = 0.0;
    let mut syy = 0.0;
    let mut ref_var = 0.0;

    for (&r, &t) in ref_points.iter().zip(target_points) {
        let r = r - ref_centroid;
        let t = t - tar_centroid;
        sxx += r.x * t.x;
        sxy += r.x * t.y;
        syx += r.y * t.x;
        syy += r.y * t.y;
        ref_var += r.length_squared();
    }

    if ref_var < MIN_REFERENCE_VARIANCE {
        return Err(Error::DegenerateFit);
    }

    let angle = (sxy - syx).atan2(sxx + syy);
    let (sin_a, cos_a) = angle.sin_cos();
    let scale = ((sxx + syy) * cos_a + (sxy - syx) * sin_a) / ref_var;

    if !(scale > 0.0 && scale.is_finite()) {
        return Err(Error::DegenerateFit);
    }

    let rotated = DVec2::from_angle(angle).rotate(ref_centroid) * scale;
    Ok(SimilarityTransform::new(
        tar_centroid - rotated,
        angle,
        scale,
    ))
}
