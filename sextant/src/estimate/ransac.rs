//! RANSAC (Random Sample Consensus) wrapper around [`fit_simple`].
//!
//! 1. Randomly sample `min_samples` distinct correspondences
//! 2. Fit a candidate transform to the sample
//! 3. Count inliers (residual below threshold)
//! 4. Keep the best candidate
//! 5. Refit with least squares on its inliers

use glam::DVec2;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use super::fit_simple;
use crate::config::RansacConfig;
use crate::error::Error;
use crate::transform::{SimilarityTransform, TransformModel};

/// Transform plus the inlier mask it was refitted on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobustFit {
    pub transform: SimilarityTransform,
    /// One entry per input pair.
    pub inliers: Vec<bool>,
}

impl RobustFit {
    pub fn num_inliers(&self) -> usize {
        self.inliers.iter().filter(|&&inlier| inlier).count()
    }
}

/// Robust fit: RANSAC over minimal samples followed by a least-squares refit.
pub fn fit_robust(
    ref_points: &[DVec2],
    target_points: &[DVec2],
    model: TransformModel,
    config: &RansacConfig,
) -> Result<RobustFit, Error> {
    debug_assert_eq!(ref_points.len(), target_points.len());

    let n = ref_points.len();
    let sample_size = config.min_samples.max(model.min_points());
    if n < sample_size {
        return Err(Error::InsufficientPoints {
            found: n,
            required: sample_size,
        });
    }

    let mut rng: ChaCha8Rng = match config.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_os_rng(),
    };

    let mut best: Option<Hypothesis> = None;

    let mut sample_indices: Vec<usize> = Vec::with_capacity(sample_size);
    let mut sample_ref: Vec<DVec2> = Vec::with_capacity(sample_size);
    let mut sample_target: Vec<DVec2> = Vec::with_capacity(sample_size);

    for _ in 0..config.max_trials {
        random_sample_into(&mut rng, n, sample_size, &mut sample_indices);

        sample_ref.clear();
        sample_target.clear();
        for &i in &sample_indices {
            sample_ref.push(ref_points[i]);
            sample_target.push(target_points[i]);
        }

        let Ok(transform) = fit_simple(&sample_ref, &sample_target, model) else {
            continue;
        };

        let candidate = Hypothesis::score(
            transform,
            ref_points,
            target_points,
            config.residual_threshold,
        );
        if best.as_ref().is_none_or(|b| candidate.beats(b)) {
            best = Some(candidate);
        }
    }

    let best_inliers = best.as_ref().map_or(0, |b| b.num_inliers);
    let Some(best) = best.filter(|b| b.num_inliers >= model.min_points()) else {
        return Err(Error::RobustFitFailed {
            trials: config.max_trials,
            best_inliers,
        });
    };

    let (inlier_ref, inlier_target): (Vec<DVec2>, Vec<DVec2>) = best
        .inliers
        .iter()
        .enumerate()
        .filter(|&(_, &inlier)| inlier)
        .map(|(i, _)| (ref_points[i], target_points[i]))
        .unzip();

    let refined = fit_simple(&inlier_ref, &inlier_target, model).unwrap_or(best.transform);
    let inliers = inlier_mask(
        &refined,
        ref_points,
        target_points,
        config.residual_threshold,
    );

    tracing::debug!(
        inliers = best.num_inliers,
        total = n,
        trials = config.max_trials,
        "RANSAC consensus"
    );

    Ok(RobustFit {
        transform: refined,
        inliers,
    })
}

struct Hypothesis {
    transform: SimilarityTransform,
    inliers: Vec<bool>,
    num_inliers: usize,
    residual_sum: f64,
}

impl Hypothesis {
    fn score(
        transform: SimilarityTransform,
        ref_points: &[DVec2],
        target_points: &[DVec2],
        threshold: f64,
    ) -> Self {
        let mut inliers = Vec::with_capacity(ref_points.len());
        let mut num_inliers = 0;
        let mut residual_sum = 0.0;
        for (&r, &t) in ref_points.iter().zip(target_points) {
            let residual = (transform.apply(r) - t).length();
            let inlier = residual < threshold;
            if inlier {
                num_inliers += 1;
                residual_sum += residual;
            }
            inliers.push(inlier);
        }
        Self {
            transform,
            inliers,
            num_inliers,
            residual_sum,
        }
    }

    /// More inliers wins; equal counts fall back to the lower residual sum.
    fn beats(&self, other: &Self) -> bool {
        self.num_inliers > other.num_inliers
            || (self.num_inliers == other.num_inliers && self.residual_sum < other.residual_sum)
    }
}

fn inlier_mask(
    transform: &SimilarityTransform,
    ref_points: &[DVec2],
    target_points: &[DVec2],
    threshold: f64,
) -> Vec<bool> {
    ref_points
        .iter()
        .zip(target_points)
        .map(|(&r, &t)| (transform.apply(r) - t).length() < threshold)
        .collect()
}

/// Randomly sample k unique indices from 0..n into a reused buffer.
fn random_sample_into<R: Rng>(rng: &mut R, n: usize, k: usize, buffer: &mut Vec<usize>) {
    debug_assert!(k <= n, "Cannot sample {} indices from {}", k, n);
    buffer.clear();

    if k <= n / 2 {
        // Floyd's algorithm for sampling without replacement
        for j in (n - k)..n {
            let t = rng.random_range(0..=j);
            if buffer.contains(&t) {
                buffer.push(j);
            } else {
                buffer.push(t);
            }
        }
    } else {
        buffer.extend(0..n);
        buffer.shuffle(rng);
        buffer.truncate(k);
    }
}
