//! Forward/backward nearest-neighbor consistency clip.

use glam::DVec2;

use crate::constants::DEFAULT_LEAF_SIZE;
use crate::error::{ClipPass, Error};
use crate::spatial::KdTree;
use crate::types::PointSet;

/// Clip two lists down to the points that have a counterpart within `radius`.
///
/// Forward pass: keep the points of `set_a` whose nearest `set_b` point is
/// closer than `radius`. Backward pass: keep the points of `set_b` whose
/// nearest surviving `set_a` point is closer than `radius`. Relative order and
/// attributes are preserved.
pub fn clip(set_a: &PointSet, set_b: &PointSet, radius: f64) -> Result<(PointSet, PointSet), Error> {
    let (keep_a, keep_b) = clip_indices(set_a.points(), set_b.points(), radius, DEFAULT_LEAF_SIZE)?;
    Ok((set_a.select(&keep_a), set_b.select(&keep_b)))
}

/// Index form of [`clip`]: the surviving indices of `a` and of `b`, ascending.
pub fn clip_indices(
    a: &[DVec2],
    b: &[DVec2],
    radius: f64,
    leaf_size: usize,
) -> Result<(Vec<usize>, Vec<usize>), Error> {
    let b_tree = KdTree::with_leaf_size(b, leaf_size);
    let keep_a = survivors(&b_tree, a, radius);
    if keep_a.is_empty() {
        return Err(Error::NoMatches {
            radius,
            pass: ClipPass::Forward,
        });
    }

    let kept_a: Vec<DVec2> = keep_a.iter().map(|&i| a[i]).collect();
    let a_tree = KdTree::with_leaf_size(&kept_a, leaf_size);
    let keep_b = survivors(&a_tree, b, radius);
    if keep_b.is_empty() {
        return Err(Error::NoMatches {
            radius,
            pass: ClipPass::Backward,
        });
    }

    tracing::debug!(
        radius,
        kept_a = keep_a.len(),
        total_a = a.len(),
        kept_b = keep_b.len(),
        total_b = b.len(),
        "Clip"
    );

    Ok((keep_a, keep_b))
}

/// Indices of `queries` with an indexed point strictly closer than `radius`.
///
/// Non-finite queries and an empty index never survive.
fn survivors(tree: &KdTree, queries: &[DVec2], radius: f64) -> Vec<usize> {
    queries
        .iter()
        .enumerate()
        .filter(|&(_, &q)| tree.nearest(q).is_ok_and(|n| n.distance() < radius))
        .map(|(i, _)| i)
        .collect()
}
