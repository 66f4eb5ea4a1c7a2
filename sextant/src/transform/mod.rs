//! Similarity transform and the coordinate projection seam.


use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Transform parametrization fitted by the estimators.
///
/// Selected once per job; both variants produce a [`SimilarityTransform`]
/// (`Translation` fixes rotation at 0 and scale at 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformModel {
    /// Shift only (2 DOF: dx, dy)
    Translation,
    /// Shift + rotation + uniform scale (4 DOF)
    #[default]
    Similarity,
}

impl TransformModel {
    /// Minimum number of point correspondences required to estimate this model.
    pub fn min_points(&self) -> usize {
        match self {
            TransformModel::Translation => 1,
            TransformModel::Similarity => 2,
        }
    }
}

impl std::fmt::Display for TransformModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformModel::Translation => write!(f, "translation"),
            TransformModel::Similarity => write!(f, "similarity"),
        }
    }
}

/// 2-D similarity transform: `p' = scale * R(rotation) * p + translation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityTransform {
    /// Translation (dx, dy).
    pub translation: DVec2,
    /// Counter-clockwise rotation in radians.
    pub rotation: f64,
    /// Uniform scale factor, always positive.
    pub scale: f64,
}

impl Default for SimilarityTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::fmt::Display for SimilarityTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Similarity(dx={:.4}, dy={:.4}, rot={:.4}°, scale={:.5})",
            self.translation.x,
            self.translation.y,
            self.rotation.to_degrees(),
            self.scale
        )
    }
}

impl SimilarityTransform {
    pub fn identity() -> Self {
        Self {
            translation: DVec2::ZERO,
            rotation: 0.0,
            scale: 1.0,
        }
    }

    pub fn new(translation: DVec2, rotation: f64, scale: f64) -> Self {
        debug_assert!(scale > 0.0, "similarity scale must be positive, got {scale}");
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn translation(t: DVec2) -> Self {
        Self::new(t, 0.0, 1.0)
    }

    /// Map one point.
    #[inline]
    pub fn apply(&self, p: DVec2) -> DVec2 {
        self.linear_part().rotate(p) + self.translation
    }

    /// Map every point of a slice.
    pub fn apply_all(&self, points: &[DVec2]) -> Vec<DVec2> {
        points.iter().map(|&p| self.apply(p)).collect()
    }

    /// Inverse transform: `inverse().apply(apply(p)) == p`.
    pub fn inverse(&self) -> Self {
        let inv_scale = 1.0 / self.scale;
        let rotation = -self.rotation;
        let linear = DVec2::from_angle(rotation) * inv_scale;
        Self {
            translation: -linear.rotate(self.translation),
            rotation,
            scale: inv_scale,
        }
    }

    /// Compose two transforms: `self ∘ other` (apply `other` first, then `self`).
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            translation: self.apply(other.translation),
            rotation: wrap_angle(self.rotation + other.rotation),
            scale: self.scale * other.scale,
        }
    }

    /// Largest parameter deviation from identity, per component.
    ///
    /// Returns `(|translation|, |rotation|, |scale - 1|)`.
    pub fn deviation_from_identity(&self) -> (f64, f64, f64) {
        (
            self.translation.length(),
            self.rotation.abs(),
            (self.scale - 1.0).abs(),
        )
    }

    /// Check that all parameters are finite and the scale is positive.
    pub fn is_valid(&self) -> bool {
        self.translation.is_finite()
            && self.rotation.is_finite()
            && self.scale.is_finite()
            && self.scale > 0.0
    }

    /// `scale * (cos θ, sin θ)`; rotating by it applies the linear part.
    #[inline]
    fn linear_part(&self) -> DVec2 {
        DVec2::from_angle(self.rotation) * self.scale
    }
}

/// Wrap an angle into (-π, π].
pub fn wrap_angle(angle: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped == -PI { PI } else { wrapped }
}

/// External coordinate projection service.
///
/// Maps a batch of points from one frame into another (for example catalog
/// tangent-plane coordinates into detector pixels through a WCS solution).
/// Implementations must return exactly one output point per input point and
/// be deterministic for a fixed solution.
pub trait Projection {
    fn project(&self, points: &[DVec2]) -> Vec<DVec2>;
}

/// Projection that returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityProjection;

impl Projection for IdentityProjection {
    fn project(&self, points: &[DVec2]) -> Vec<DVec2> {
        points.to_vec()
    }
}

impl Projection for SimilarityTransform {
    fn project(&self, points: &[DVec2]) -> Vec<DVec2> {
        self.apply_all(points)
    }
}

impl<F> Projection for F
where
    F: Fn(DVec2) -> DVec2,
{
    fn project(&self, points: &[DVec2]) -> Vec<DVec2> {
        points.iter().map(|&p| self(p)).collect()
    }
}
