//! Caller-side catalog pre-filters applied before registration.

use crate::types::PointSet;

/// Keep the points whose magnitude lies strictly inside `(min, max)`.
///
/// A set without magnitudes is returned unchanged.
pub fn filter_magnitude(set: &PointSet, min: f64, max: f64) -> PointSet {
    let Some(magnitudes) = set.magnitudes() else {
        return set.clone();
    };
    let keep: Vec<usize> = magnitudes
        .iter()
        .enumerate()
        .filter(|&(_, &m)| m > min && m < max)
        .map(|(i, _)| i)
        .collect();

    tracing::debug!(kept = keep.len(), total = set.len(), min, max, "Magnitude filter");
    set.select(&keep)
}

/// Drop reference points outside the field covered by `target`.
///
/// The field is a circle around the target's median center whose radius is
/// `margin` times the largest target distance from that center.
pub fn trim_to_field(reference: &PointSet, target: &PointSet, margin: f64) -> PointSet {
    let Some(center) = target.median() else {
        return reference.clone();
    };
    let max_radius = target
        .points()
        .iter()
        .map(|p| p.distance(center))
        .fold(0.0, f64::max);
    let limit = max_radius * margin;

    let keep: Vec<usize> = reference
        .points()
        .iter()
        .enumerate()
        .filter(|&(_, p)| p.distance(center) <= limit)
        .map(|(i, _)| i)
        .collect();

    tracing::debug!(
        kept = keep.len(),
        total = reference.len(),
        radius = limit,
        "Trimmed reference to target field"
    );
    reference.select(&keep)
}
