//! Registration result, per-iteration records and their log lines.

use serde::{Deserialize, Serialize};

use crate::transform::SimilarityTransform;

/// Header of the per-iteration registration log.
pub const REGISTRATION_LOG_HEADER: &str = "# iter xshift yshift rot scale rms N";

/// One completed match/fit/reject pass. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based iteration index.
    pub iteration: usize,
    /// Transform fitted in this iteration.
    pub step: SimilarityTransform,
    /// Accumulated transform after this iteration.
    pub total: SimilarityTransform,
    /// NMAD of the inlier residuals under `step`.
    pub dispersion: f64,
    /// Correspondences produced by the matcher.
    pub n_matched: usize,
    /// Correspondences kept after outlier rejection.
    pub n_good: usize,
    /// Tolerance the matcher finally used.
    pub tolerance: f64,
}

impl IterationRecord {
    /// `iteration dx dy rotation-degrees scale rms N`, fixed-width.
    pub fn log_line(&self) -> String {
        format!(
            "{:5} {:13.4} {:13.4} {:13.4} {:13.5} {:13.3} {:4}",
            self.iteration,
            self.step.translation.x,
            self.step.translation.y,
            self.step.rotation.to_degrees(),
            self.step.scale,
            self.dispersion,
            self.n_good
        )
    }
}

/// Outcome of a registration job.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RegistrationResult {
    /// Exact composition of every iteration's step, mapping the projected
    /// reference onto the target.
    pub transform: SimilarityTransform,
    /// Robust dispersion of the last iteration.
    pub dispersion: f64,
    /// Good matches of the last iteration.
    pub num_good: usize,
    pub iterations: Vec<IterationRecord>,
}

impl RegistrationResult {
    /// Header plus one line per iteration.
    pub fn log_lines(&self) -> Vec<String> {
        std::iter::once(REGISTRATION_LOG_HEADER.to_string())
            .chain(self.iterations.iter().map(IterationRecord::log_line))
            .collect()
    }

    pub fn last(&self) -> Option<&IterationRecord> {
        self.iterations.last()
    }

    pub(super) fn push(&mut self, record: IterationRecord) {
        self.transform = record.total;
        self.dispersion = record.dispersion;
        self.num_good = record.n_good;
        self.iterations.push(record);
    }
}
