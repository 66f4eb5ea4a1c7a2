//! Iterative registration loop.
//!
//! Each iteration walks the stages
//! `Matching → Fitting → OutlierCheck → Accumulate`, then either starts over
//! or stops according to the configured [`Termination`](crate::config::Termination).
//!
//! The working reference is rebuilt from scratch every iteration: the
//! original reference is projected into the target frame and then mapped
//! through the transform accumulated so far. Inputs are never mutated.

#[cfg(test)]
mod tests;

mod result;

pub use result::{IterationRecord, REGISTRATION_LOG_HEADER, RegistrationResult};

use glam::DVec2;

use crate::config::RegistrationConfig;
use crate::error::Error;
use crate::estimate::{fit_simple, fit_with};
use crate::matching::{clip_indices, match_with_escalation};
use crate::outliers::{dispersion, flag_outliers, residual_norms};
use crate::transform::{IdentityProjection, Projection, SimilarityTransform};
use crate::types::{PointSet, gather_pairs};

/// Registers target catalogs against a projected reference catalog.
#[derive(Debug, Clone, Default)]
pub struct Registrator {
    config: RegistrationConfig,
}

/// Paired coordinates handed from one stage to the next.
#[derive(Debug)]
struct Pairs {
    reference: Vec<DVec2>,
    target: Vec<DVec2>,
}

impl Pairs {
    fn len(&self) -> usize {
        self.reference.len()
    }

    fn filter(self, keep: &[bool]) -> Self {
        let (reference, target) = self
            .reference
            .into_iter()
            .zip(self.target)
            .zip(keep)
            .filter(|&(_, &k)| k)
            .map(|(pair, _)| pair)
            .unzip();
        Self { reference, target }
    }
}

/// Per-iteration state.
#[derive(Debug)]
enum Stage {
    Matching,
    Fitting {
        pairs: Pairs,
        tolerance: f64,
    },
    OutlierCheck {
        pairs: Pairs,
        step: SimilarityTransform,
        n_matched: usize,
        tolerance: f64,
    },
    Accumulate {
        step: SimilarityTransform,
        dispersion: f64,
        n_matched: usize,
        n_good: usize,
        tolerance: f64,
    },
    Done,
}

impl Registrator {
    /// Create a new registrator with the given configuration.
    ///
    /// # Panics
    /// Panics if the configuration is invalid.
    pub fn new(config: RegistrationConfig) -> Self {
        config.validate();
        Self { config }
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    /// Register `target` against `reference` seen through `projection`.
    ///
    /// The returned transform maps projected reference coordinates onto the
    /// target. On failure the error carries every iteration completed so far.
    pub fn register<P>(
        &self,
        reference: &PointSet,
        target: &PointSet,
        projection: &P,
    ) -> Result<RegistrationResult, Error>
    where
        P: Projection + ?Sized,
    {
        let config = &self.config;
        let max_iterations = config.termination.max_iterations();

        let mut result = RegistrationResult::default();
        let mut total = SimilarityTransform::identity();
        let mut iteration = 0;
        let mut stage = Stage::Matching;

        tracing::debug!(
            reference = reference.len(),
            target = target.len(),
            model = %config.model,
            max_iterations,
            "Starting registration"
        );

        loop {
            stage = match stage {
                Stage::Matching => {
                    iteration += 1;
                    let projected = projection.project(reference.points());
                    debug_assert_eq!(projected.len(), reference.len());
                    let working = total.apply_all(&projected);

                    match self.match_stage(&working, target.points()) {
                        Ok((pairs, tolerance)) => Stage::Fitting { pairs, tolerance },
                        Err(e) => return Err(failure(iteration, e, result)),
                    }
                }
                Stage::Fitting { pairs, tolerance } => {
                    let n_matched = pairs.len();
                    match fit_with(&config.fit, &pairs.reference, &pairs.target, config.model) {
                        Ok(fit) => Stage::OutlierCheck {
                            pairs: pairs.filter(&fit.inliers),
                            step: fit.transform,
                            n_matched,
                            tolerance,
                        },
                        Err(e) => return Err(failure(iteration, e, result)),
                    }
                }
                Stage::OutlierCheck {
                    pairs,
                    step,
                    n_matched,
                    tolerance,
                } => match self.reject_outliers(pairs, step) {
                    Ok((step, dispersion, n_good)) => Stage::Accumulate {
                        step,
                        dispersion,
                        n_matched,
                        n_good,
                        tolerance,
                    },
                    Err(e) => return Err(failure(iteration, e, result)),
                },
                Stage::Accumulate {
                    step,
                    dispersion,
                    n_matched,
                    n_good,
                    tolerance,
                } => {
                    total = step.compose(&total);
                    let record = IterationRecord {
                        iteration,
                        step,
                        total,
                        dispersion,
                        n_matched,
                        n_good,
                        tolerance,
                    };
                    tracing::info!(
                        "Iteration {}: dx={:.4} dy={:.4} rot={:.4}° scale={:.5} rms={:.3} N={}/{}",
                        iteration,
                        step.translation.x,
                        step.translation.y,
                        step.rotation.to_degrees(),
                        step.scale,
                        dispersion,
                        n_good,
                        n_matched
                    );
                    result.push(record);

                    let (shift, rotation, scale) = step.deviation_from_identity();
                    if iteration >= max_iterations {
                        Stage::Done
                    } else if config.termination.is_converged(shift, rotation, scale) {
                        tracing::debug!(iteration, "Registration converged");
                        Stage::Done
                    } else {
                        Stage::Matching
                    }
                }
                Stage::Done => break,
            };
        }

        Ok(result)
    }

    /// Clip (growing the radius when nothing survives), then match with
    /// tolerance escalation.
    fn match_stage(&self, working: &[DVec2], target: &[DVec2]) -> Result<(Pairs, f64), Error> {
        let clip = &self.config.clip;
        let mut radius = clip.radius;
        let mut expansions = 0;

        let (keep_ref, keep_target) = loop {
            match clip_indices(working, target, radius, self.config.leaf_size) {
                Ok(kept) => break kept,
                Err(Error::NoMatches { pass, .. }) if expansions < clip.max_expansions => {
                    let next = radius * clip.growth;
                    tracing::warn!(
                        "No matches within clip radius {:.2} ({} pass), growing to {:.2}",
                        radius,
                        pass,
                        next
                    );
                    radius = next;
                    expansions += 1;
                }
                Err(e) => return Err(e),
            }
        };

        let clipped_ref: Vec<DVec2> = keep_ref.iter().map(|&i| working[i]).collect();
        let clipped_target: Vec<DVec2> = keep_target.iter().map(|&i| target[i]).collect();

        let outcome = match_with_escalation(
            &clipped_ref,
            &clipped_target,
            &self.config.matching,
            &self.config.escalation,
        )?;
        let (reference, target) =
            gather_pairs(&outcome.correspondences, &clipped_ref, &clipped_target);

        Ok((Pairs { reference, target }, outcome.tolerance))
    }

    /// NMAD k-sigma rejection with a single refit on the survivors.
    ///
    /// Returns the final step, the dispersion of the inliers under it and the
    /// inlier count.
    fn reject_outliers(
        &self,
        pairs: Pairs,
        step: SimilarityTransform,
    ) -> Result<(SimilarityTransform, f64, usize), Error> {
        let norms = residual_norms(&step, &pairs.reference, &pairs.target);
        let sigma = dispersion(&norms);
        let flags = flag_outliers(&norms, sigma, self.config.outlier_sigma);
        let n_outliers = flags.iter().filter(|&&f| f).count();

        if n_outliers == 0 {
            return Ok((step, sigma, pairs.len()));
        }

        tracing::debug!(
            outliers = n_outliers,
            total = pairs.len(),
            sigma,
            "Rejecting outliers"
        );

        let keep: Vec<bool> = flags.iter().map(|&f| !f).collect();
        let inliers = pairs.filter(&keep);
        let step = fit_simple(&inliers.reference, &inliers.target, self.config.model)?;
        let sigma = dispersion(&residual_norms(&step, &inliers.reference, &inliers.target));

        Ok((step, sigma, inliers.len()))
    }
}

/// Register with the identity projection.
pub fn register(
    reference: &PointSet,
    target: &PointSet,
    config: &RegistrationConfig,
) -> Result<RegistrationResult, Error> {
    Registrator::new(config.clone()).register(reference, target, &IdentityProjection)
}

fn failure(iteration: usize, source: Error, partial: RegistrationResult) -> Error {
    tracing::warn!(
        "Registration failed at iteration {} after {} completed: {}",
        iteration,
        partial.iterations.len(),
        source
    );
    Error::RegistrationFailure {
        iteration,
        source: Box::new(source),
        partial: Box::new(partial),
    }
}
