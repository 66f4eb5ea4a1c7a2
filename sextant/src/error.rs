//! Error types for matching, fitting and registration.

use thiserror::Error;

use crate::registration::RegistrationResult;

/// Which half of the forward/backward clip found nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipPass {
    Forward,
    Backward,
}

impl std::fmt::Display for ClipPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClipPass::Forward => write!(f, "forward"),
            ClipPass::Backward => write!(f, "backward"),
        }
    }
}

/// Reason a single tolerance-match attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchFailureReason {
    /// Fewer correspondences than the configured minimum.
    TooFewMatches { found: usize, required: usize },
    /// A coordinate in either list is NaN or infinite.
    NonFiniteCoordinates,
    /// One of the lists is empty (before or after separation culling).
    EmptyInput,
}

impl std::fmt::Display for MatchFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchFailureReason::TooFewMatches { found, required } => {
                write!(f, "too few matches ({} < {})", found, required)
            }
            MatchFailureReason::NonFiniteCoordinates => write!(f, "non-finite coordinates"),
            MatchFailureReason::EmptyInput => write!(f, "empty input list"),
        }
    }
}

/// Errors produced by the registration engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Spatial index is empty")]
    EmptyIndex,

    #[error("Non-finite query point ({x}, {y})")]
    NonFiniteQuery { x: f64, y: f64 },

    #[error("No matches within clip radius {radius:.3} ({pass} pass)")]
    NoMatches { radius: f64, pass: ClipPass },

    #[error("Matching failed at tolerance {tolerance:.3} after {retries} retries: {reason}")]
    MatchFailure {
        tolerance: f64,
        retries: usize,
        reason: MatchFailureReason,
    },

    #[error("Insufficient points for fit: found {found}, need {required}")]
    InsufficientPoints { found: usize, required: usize },

    #[error("Degenerate point geometry, transform is undetermined")]
    DegenerateFit,

    #[error("Robust fit failed after {trials} trials (best inlier count: {best_inliers})")]
    RobustFitFailed { trials: usize, best_inliers: usize },

    #[error(
        "Registration failed at iteration {iteration} ({} iterations completed): {source}",
        .partial.iterations.len()
    )]
    RegistrationFailure {
        iteration: usize,
        #[source]
        source: Box<Error>,
        partial: Box<RegistrationResult>,
    },
}

impl Error {
    /// Partial registration result carried by [`Error::RegistrationFailure`].
    pub fn partial_result(&self) -> Option<&RegistrationResult> {
        match self {
            Error::RegistrationFailure { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_index_message() {
        assert_eq!(Error::EmptyIndex.to_string(), "Spatial index is empty");
    }

    #[test]
    fn test_match_failure_message() {
        let err = Error::MatchFailure {
            tolerance: 20.0,
            retries: 3,
            reason: MatchFailureReason::TooFewMatches {
                found: 4,
                required: 10,
            },
        };
        assert_eq!(
            err.to_string(),
            "Matching failed at tolerance 20.000 after 3 retries: too few matches (4 < 10)"
        );
    }

    #[test]
    fn test_no_matches_message() {
        let err = Error::NoMatches {
            radius: 2.5,
            pass: ClipPass::Backward,
        };
        assert_eq!(
            err.to_string(),
            "No matches within clip radius 2.500 (backward pass)"
        );
    }

    #[test]
    fn test_registration_failure_keeps_source_and_partial() {
        use std::error::Error as _;

        let err = Error::RegistrationFailure {
            iteration: 2,
            source: Box::new(Error::InsufficientPoints {
                found: 1,
                required: 2,
            }),
            partial: Box::new(RegistrationResult::default()),
        };
        assert!(err.source().is_some());
        assert_eq!(err.partial_result().map(|r| r.iterations.len()), Some(0));
        assert!(err.to_string().starts_with("Registration failed at iteration 2"));
        assert!(Error::DegenerateFit.partial_result().is_none());
    }
}
