//! Point matching: consistency clipping, tolerance pairing and tolerance
//! escalation.
//!
//! A match attempt that fails is ordinary control flow here: the escalation
//! driver widens the tolerance and retries before reporting
//! [`Error::MatchFailure`].


mod clip;
mod tolerance;

pub use clip::{clip, clip_indices};
pub use tolerance::{isolated_indices, match_points};

use glam::DVec2;
use serde::Serialize;

use crate::config::{EscalationConfig, MatchConfig};
use crate::error::Error;
use crate::types::Correspondence;

/// Accepted match plus the tolerance it was found at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchOutcome {
    pub correspondences: Vec<Correspondence>,
    /// Tolerance of the accepted attempt.
    pub tolerance: f64,
    /// Retries consumed across both escalation policies.
    pub retries: usize,
}

impl MatchOutcome {
    /// Matched fraction of an input list of `input_len` points.
    pub fn yield_fraction(&self, input_len: usize) -> f64 {
        if input_len == 0 {
            return 0.0;
        }
        self.correspondences.len() as f64 / input_len as f64
    }
}

/// Match with automatic tolerance escalation.
///
/// Failures are retried at `tolerance + k * step` up to `max_retries` times.
/// A successful match whose yield is below `min_yield` is retried the same
/// way with its own budget of `max_retries`; a failing low-yield retry keeps
/// the last successful result.
pub fn match_with_escalation(
    reference: &[DVec2],
    input: &[DVec2],
    config: &MatchConfig,
    escalation: &EscalationConfig,
) -> Result<MatchOutcome, Error> {
    let mut tolerance = config.tolerance;
    let mut retries = 0;

    let mut accepted = loop {
        match match_points(reference, input, config, tolerance) {
            Ok(correspondences) => {
                break MatchOutcome {
                    correspondences,
                    tolerance,
                    retries,
                };
            }
            Err(reason) if retries < escalation.max_retries => {
                let next = tolerance + escalation.step;
                tracing::warn!(
                    "Match failed at tolerance {:.2} ({}), retrying at {:.2}",
                    tolerance,
                    reason,
                    next
                );
                tolerance = next;
                retries += 1;
            }
            Err(reason) => {
                return Err(Error::MatchFailure {
                    tolerance,
                    retries,
                    reason,
                });
            }
        }
    };

    let mut yield_retries = 0;
    while accepted.yield_fraction(input.len()) < escalation.min_yield
        && yield_retries < escalation.max_retries
    {
        yield_retries += 1;
        tolerance += escalation.step;
        tracing::warn!(
            "Low match yield {:.3} ({} of {}), retrying at tolerance {:.2}",
            accepted.yield_fraction(input.len()),
            accepted.correspondences.len(),
            input.len(),
            tolerance
        );
        match match_points(reference, input, config, tolerance) {
            Ok(correspondences) => {
                accepted = MatchOutcome {
                    correspondences,
                    tolerance,
                    retries: retries + yield_retries,
                };
            }
            Err(reason) => {
                tracing::debug!("Low-yield retry failed ({}), keeping previous match", reason);
            }
        }
    }

    tracing::debug!(
        matched = accepted.correspondences.len(),
        tolerance = accepted.tolerance,
        retries = accepted.retries,
        "Match accepted"
    );

    Ok(accepted)
}
