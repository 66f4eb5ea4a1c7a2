//! Robust residual dispersion and k-sigma outlier flagging.

use glam::DVec2;

use crate::math::statistics;
use crate::transform::SimilarityTransform;

/// Robust dispersion (NMAD) of residual norms: `1.4826 * median(|x - median(x)|)`.
///
/// Returns 0.0 for an empty slice.
pub fn dispersion(residual_norms: &[f64]) -> f64 {
    statistics::nmad(residual_norms)
}

/// Flag residuals larger than `k * sigma`.
///
/// With `sigma == 0` the threshold collapses to zero and every nonzero
/// residual is flagged.
pub fn flag_outliers(residual_norms: &[f64], sigma: f64, k: f64) -> Vec<bool> {
    let threshold = k * sigma;
    residual_norms.iter().map(|&r| r > threshold).collect()
}

/// Residual norm `|T(ref) - target|` of every pair.
pub fn residual_norms(
    transform: &SimilarityTransform,
    ref_points: &[DVec2],
    target_points: &[DVec2],
) -> Vec<f64> {
    debug_assert_eq!(ref_points.len(), target_points.len());
    ref_points
        .iter()
        .zip(target_points)
        .map(|(&r, &t)| (transform.apply(r) - t).length())
        .collect()
}
