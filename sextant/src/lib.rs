//! Sextant - robust point-set registration for astrometric catalogs.
//!
//! Aligns a target catalog (detections in image pixels) to a reference
//! catalog seen through an external coordinate projection:
//! - Forward/backward nearest-neighbor clipping and tolerance matching
//! - Least-squares and RANSAC similarity/translation fits
//! - NMAD k-sigma outlier rejection
//! - An iterative match/fit/reject loop with per-iteration logs
//! - Translation-only alignment of the exposures of one visit
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sextant::prelude::*;
//!
//! let config = RegistrationConfig::default();
//! let result = Registrator::new(config).register(&reference, &target, &IdentityProjection)?;
//!
//! for line in result.log_lines() {
//!     println!("{line}");
//! }
//! ```

pub mod batch;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod estimate;
pub mod intra_visit;
pub mod matching;
pub(crate) mod math;
pub mod outliers;
pub mod registration;
pub mod spatial;
pub mod transform;
pub mod types;

#[cfg(test)]
pub mod testing;

pub mod prelude;

// ============================================================================
// Core types
// ============================================================================

pub use error::{ClipPass, Error, MatchFailureReason};
pub use types::{Correspondence, PointSet};

// ============================================================================
// Configuration
// ============================================================================

pub use config::{
    ClipConfig, EscalationConfig, FitMethod, IntraVisitConfig, MatchConfig, RansacConfig,
    RegistrationConfig, Termination,
};

// ============================================================================
// Transforms and projection
// ============================================================================

pub use transform::{IdentityProjection, Projection, SimilarityTransform, TransformModel};

// ============================================================================
// Algorithms
// ============================================================================

pub use estimate::{RobustFit, fit_robust, fit_simple};
pub use matching::{MatchOutcome, clip, match_points, match_with_escalation};
pub use outliers::{dispersion, flag_outliers};
pub use spatial::{KdTree, Neighbor};

// ============================================================================
// Registration
// ============================================================================

pub use intra_visit::{Exposure, IntraVisitAligner, ShiftRecord, ShiftStatus};
pub use registration::{IterationRecord, RegistrationResult, Registrator, register};
