//! Core data types: point sets and correspondences.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::math::statistics;

/// An ordered list of 2-D points with optional per-point magnitudes and flags.
///
/// Attribute vectors, when present, always have the same length as `points`.
/// Order carries no meaning beyond index bookkeeping for correspondences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointSet {
    points: Vec<DVec2>,
    magnitudes: Option<Vec<f64>>,
    flags: Option<Vec<u32>>,
}

impl PointSet {
    pub fn new(points: Vec<DVec2>) -> Self {
        Self {
            points,
            magnitudes: None,
            flags: None,
        }
    }

    /// Build a point set from `(x, y)` tuples.
    pub fn from_xy(coords: &[(f64, f64)]) -> Self {
        Self::new(coords.iter().map(|&(x, y)| DVec2::new(x, y)).collect())
    }

    /// Attach magnitudes.
    ///
    /// # Panics
    /// Panics if the length differs from the number of points.
    pub fn with_magnitudes(mut self, magnitudes: Vec<f64>) -> Self {
        assert_eq!(
            magnitudes.len(),
            self.points.len(),
            "magnitudes length must match points length"
        );
        self.magnitudes = Some(magnitudes);
        self
    }

    /// Attach integer flags.
    ///
    /// # Panics
    /// Panics if the length differs from the number of points.
    pub fn with_flags(mut self, flags: Vec<u32>) -> Self {
        assert_eq!(
            flags.len(),
            self.points.len(),
            "flags length must match points length"
        );
        self.flags = Some(flags);
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[DVec2] {
        &self.points
    }

    pub fn magnitudes(&self) -> Option<&[f64]> {
        self.magnitudes.as_deref()
    }

    pub fn flags(&self) -> Option<&[u32]> {
        self.flags.as_deref()
    }

    /// Subset by index, preserving the given order and all attributes.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            points: indices.iter().map(|&i| self.points[i]).collect(),
            magnitudes: self
                .magnitudes
                .as_ref()
                .map(|m| indices.iter().map(|&i| m[i]).collect()),
            flags: self
                .flags
                .as_ref()
                .map(|f| indices.iter().map(|&i| f[i]).collect()),
        }
    }

    /// Same attributes, new coordinates (one per existing point).
    ///
    /// # Panics
    /// Panics if `points` has a different length.
    pub fn with_points(&self, points: Vec<DVec2>) -> Self {
        assert_eq!(
            points.len(),
            self.points.len(),
            "replacement coordinates must keep the point count"
        );
        Self {
            points,
            magnitudes: self.magnitudes.clone(),
            flags: self.flags.clone(),
        }
    }

    /// Component-wise median of the coordinates.
    pub fn median(&self) -> Option<DVec2> {
        median_point(&self.points)
    }
}

impl From<Vec<DVec2>> for PointSet {
    fn from(points: Vec<DVec2>) -> Self {
        Self::new(points)
    }
}

/// Component-wise median of a list of points, `None` when empty.
pub fn median_point(points: &[DVec2]) -> Option<DVec2> {
    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
    Some(DVec2::new(statistics::median(&xs)?, statistics::median(&ys)?))
}

/// A matched pair between a reference list and a target list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    /// Index in the reference list.
    pub ref_idx: usize,
    /// Index in the target list.
    pub target_idx: usize,
    /// Distance between the pair when it was matched.
    pub residual: f64,
}

/// Collect the paired coordinates of `matches` as two parallel vectors.
pub fn gather_pairs(
    matches: &[Correspondence],
    reference: &[DVec2],
    target: &[DVec2],
) -> (Vec<DVec2>, Vec<DVec2>) {
    matches
        .iter()
        .map(|m| (reference[m.ref_idx], target[m.target_idx]))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_preserves_attributes_and_order() {
        let set = PointSet::from_xy(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)])
            .with_magnitudes(vec![15.0, 16.0, 17.0])
            .with_flags(vec![0, 1, 2]);

        let subset = set.select(&[2, 0]);
        assert_eq!(subset.points(), &[DVec2::new(2.0, 2.0), DVec2::ZERO]);
        assert_eq!(subset.magnitudes(), Some(&[17.0, 15.0][..]));
        assert_eq!(subset.flags(), Some(&[2, 0][..]));
    }

    #[test]
    #[should_panic(expected = "magnitudes length must match")]
    fn test_magnitude_length_mismatch_panics() {
        let _ = PointSet::from_xy(&[(0.0, 0.0)]).with_magnitudes(vec![1.0, 2.0]);
    }

    #[test]
    fn test_median_point() {
        let set = PointSet::from_xy(&[(0.0, 10.0), (4.0, 0.0), (2.0, 5.0)]);
        assert_eq!(set.median(), Some(DVec2::new(2.0, 5.0)));
        assert_eq!(PointSet::default().median(), None);
    }

    #[test]
    fn test_with_points_keeps_attributes() {
        let set = PointSet::from_xy(&[(0.0, 0.0), (1.0, 0.0)]).with_magnitudes(vec![20.0, 21.0]);
        let moved = set.with_points(vec![DVec2::new(5.0, 5.0), DVec2::new(6.0, 5.0)]);
        assert_eq!(moved.magnitudes(), set.magnitudes());
        assert_eq!(moved.points()[1], DVec2::new(6.0, 5.0));
    }

    #[test]
    fn test_gather_pairs() {
        let reference = [DVec2::new(0.0, 0.0), DVec2::new(1.0, 0.0)];
        let target = [DVec2::new(10.0, 0.0), DVec2::new(11.0, 0.0), DVec2::new(12.0, 0.0)];
        let matches = [Correspondence {
            ref_idx: 1,
            target_idx: 2,
            residual: 0.0,
        }];
        let (r, t) = gather_pairs(&matches, &reference, &target);
        assert_eq!(r, vec![DVec2::new(1.0, 0.0)]);
        assert_eq!(t, vec![DVec2::new(12.0, 0.0)]);
    }
}
