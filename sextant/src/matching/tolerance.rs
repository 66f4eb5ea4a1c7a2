//! Tolerance matcher: one-to-one pairing of two lists within a distance.
//!
//! The input list is mapped about the reference median through every
//! candidate (magnification, rotation) of the search grid; each candidate is
//! paired greedily by ascending distance and the candidate with the most pairs
//! (then the lowest summed residual) wins.

use glam::DVec2;

use crate::config::MatchConfig;
use crate::error::MatchFailureReason;
use crate::spatial::KdTree;
use crate::types::{Correspondence, median_point};

/// Pair `input` points with `reference` points within `tolerance`.
///
/// Returned indices refer to the original lists; each index appears at most
/// once. Correspondences are ordered by reference index.
pub fn match_points(
    reference: &[DVec2],
    input: &[DVec2],
    config: &MatchConfig,
    tolerance: f64,
) -> Result<Vec<Correspondence>, MatchFailureReason> {
    if reference.iter().chain(input).any(|p| !p.is_finite()) {
        return Err(MatchFailureReason::NonFiniteCoordinates);
    }

    let ref_keep = isolated_indices(reference, config.separation);
    let inp_keep = isolated_indices(input, config.separation);
    if ref_keep.is_empty() || inp_keep.is_empty() {
        return Err(MatchFailureReason::EmptyInput);
    }

    let ref_points: Vec<DVec2> = ref_keep.iter().map(|&i| reference[i]).collect();
    let inp_points: Vec<DVec2> = inp_keep.iter().map(|&i| input[i]).collect();
    let origin = median_point(&ref_points).ok_or(MatchFailureReason::EmptyInput)?;
    let tree = KdTree::build(&ref_points);

    let mut best: Option<Candidate> = None;
    let mut mapped = Vec::with_capacity(inp_points.len());
    let mut scratch = Vec::new();

    for magnification in search_axis(config.magnification, config.search_steps) {
        for rotation in search_axis(config.rotation, config.search_steps) {
            let linear = DVec2::from_angle(rotation) * magnification;
            mapped.clear();
            mapped.extend(inp_points.iter().map(|&p| origin + linear.rotate(p - origin)));

            let candidate = pair_greedy(&tree, &mapped, tolerance, &mut scratch);
            if best.as_ref().is_none_or(|b| candidate.beats(b)) {
                best = Some(candidate);
            }
        }
    }

    let best = best.unwrap_or_default();
    if best.pairs.len() < config.min_matches {
        return Err(MatchFailureReason::TooFewMatches {
            found: best.pairs.len(),
            required: config.min_matches,
        });
    }

    let mut matches: Vec<Correspondence> = best
        .pairs
        .iter()
        .map(|&(r, t, residual)| Correspondence {
            ref_idx: ref_keep[r],
            target_idx: inp_keep[t],
            residual,
        })
        .collect();
    matches.sort_by_key(|m| m.ref_idx);
    Ok(matches)
}

/// Indices of the points with no other point of the same list closer than
/// `separation`.
pub fn isolated_indices(points: &[DVec2], separation: f64) -> Vec<usize> {
    if separation <= 0.0 || points.len() < 2 {
        return (0..points.len()).collect();
    }

    let tree = KdTree::build(points);
    (0..points.len())
        .filter(|&i| {
            tree.k_nearest(points[i], 2)
                .iter()
                .find(|n| n.index != i)
                .is_none_or(|n| n.distance() >= separation)
        })
        .collect()
}

/// Evenly spaced samples of `(lo, hi)`; a single sample sits at the midpoint.
fn search_axis((lo, hi): (f64, f64), steps: usize) -> Vec<f64> {
    if steps <= 1 || hi <= lo {
        return vec![0.5 * (lo + hi)];
    }
    let step = (hi - lo) / (steps - 1) as f64;
    (0..steps).map(|i| lo + step * i as f64).collect()
}

#[derive(Debug, Default)]
struct Candidate {
    /// `(reference, input, distance)` in culled-list indices.
    pairs: Vec<(usize, usize, f64)>,
    residual_sum: f64,
}

impl Candidate {
    fn beats(&self, other: &Self) -> bool {
        self.pairs.len() > other.pairs.len()
            || (self.pairs.len() == other.pairs.len() && self.residual_sum < other.residual_sum)
    }
}

/// One-to-one pairing: every pair within `tolerance`, accepted by ascending
/// distance while neither side is taken.
fn pair_greedy(
    tree: &KdTree,
    mapped: &[DVec2],
    tolerance: f64,
    scratch: &mut Vec<usize>,
) -> Candidate {
    let mut options: Vec<(f64, usize, usize)> = Vec::new();
    for (j, &p) in mapped.iter().enumerate() {
        tree.radius_indices_into(p, tolerance, scratch);
        options.extend(scratch.iter().map(|&r| (p.distance(tree.point(r)), r, j)));
    }
    options.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then(a.1.cmp(&b.1))
            .then(a.2.cmp(&b.2))
    });

    let mut ref_taken = vec![false; tree.len()];
    let mut inp_taken = vec![false; mapped.len()];
    let mut candidate = Candidate::default();
    for (dist, r, j) in options {
        if ref_taken[r] || inp_taken[j] {
            continue;
        }
        ref_taken[r] = true;
        inp_taken[j] = true;
        candidate.pairs.push((r, j, dist));
        candidate.residual_sum += dist;
    }
    candidate
}
