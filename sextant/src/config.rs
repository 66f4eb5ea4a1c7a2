//! Configuration types for the registration engine.
//!
//! All configuration structs and related enums are consolidated here.
//! Every struct deserializes with `#[serde(default)]`, so partial YAML
//! documents only need to name the fields they override.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CLIP_RADIUS, DEFAULT_INTRA_VISIT_MAX_DIST, DEFAULT_LEAF_SIZE, DEFAULT_MATCH_TOLERANCE,
    DEFAULT_MAX_RETRIES, DEFAULT_MIN_MATCHES, DEFAULT_MIN_YIELD, DEFAULT_OUTLIER_SIGMA,
    DEFAULT_SEPARATION, DEFAULT_TOLERANCE_STEP,
};
use crate::transform::TransformModel;

// =============================================================================
// Termination
// =============================================================================

/// When the registration loop stops iterating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Run exactly `iterations` match/fit passes.
    Fixed { iterations: usize },
    /// Stop as soon as one step is below all thresholds, or after
    /// `max_iterations` passes.
    Converged {
        max_iterations: usize,
        /// Translation magnitude threshold (pixels).
        shift: f64,
        /// Rotation threshold (radians).
        rotation: f64,
        /// `|scale - 1|` threshold.
        scale: f64,
    },
}

impl Default for Termination {
    fn default() -> Self {
        Termination::Fixed { iterations: 3 }
    }
}

impl Termination {
    /// Upper bound on the number of iterations.
    pub fn max_iterations(&self) -> usize {
        match *self {
            Termination::Fixed { iterations } => iterations,
            Termination::Converged { max_iterations, .. } => max_iterations,
        }
    }

    /// Whether a step with the given deviation from identity ends the loop early.
    pub fn is_converged(&self, shift: f64, rotation: f64, scale: f64) -> bool {
        match *self {
            Termination::Fixed { .. } => false,
            Termination::Converged {
                shift: max_shift,
                rotation: max_rotation,
                scale: max_scale,
                ..
            } => shift < max_shift && rotation < max_rotation && scale < max_scale,
        }
    }

    pub fn validate(&self) {
        assert!(
            self.max_iterations() > 0,
            "termination must allow at least one iteration"
        );
        if let Termination::Converged {
            shift,
            rotation,
            scale,
            ..
        } = *self
        {
            assert!(
                shift > 0.0 && rotation > 0.0 && scale > 0.0,
                "convergence thresholds must be positive, got shift={}, rotation={}, scale={}",
                shift,
                rotation,
                scale
            );
        }
    }
}

// =============================================================================
// Clipping
// =============================================================================

/// Forward/backward nearest-neighbor clip settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    /// Initial clip radius (pixels).
    pub radius: f64,
    /// Factor applied to the radius when a clip pass finds nothing.
    pub growth: f64,
    /// How many times the radius may grow before the iteration fails.
    pub max_expansions: usize,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_CLIP_RADIUS,
            growth: 2.0,
            max_expansions: 2,
        }
    }
}

impl ClipConfig {
    pub fn validate(&self) {
        assert!(
            self.radius > 0.0,
            "clip radius must be positive, got {}",
            self.radius
        );
        assert!(
            self.growth >= 1.0,
            "clip growth must be at least 1, got {}",
            self.growth
        );
    }
}

// =============================================================================
// Tolerance matcher
// =============================================================================

/// Tolerance matcher settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Initial pairing tolerance (pixels).
    pub tolerance: f64,
    /// Points of one list closer than this to each other are discarded.
    pub separation: f64,
    /// Fewest correspondences accepted as a match.
    pub min_matches: usize,
    /// Magnification search range `(min, max)`.
    pub magnification: (f64, f64),
    /// Rotation search range `(min, max)` in radians.
    pub rotation: (f64, f64),
    /// Samples per search axis. A degenerate range is always sampled once.
    pub search_steps: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_MATCH_TOLERANCE,
            separation: DEFAULT_SEPARATION,
            min_matches: DEFAULT_MIN_MATCHES,
            magnification: (1.0, 1.0),
            rotation: (0.0, 0.0),
            search_steps: 1,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) {
        assert!(
            self.tolerance > 0.0,
            "match tolerance must be positive, got {}",
            self.tolerance
        );
        assert!(
            self.separation >= 0.0,
            "separation must be non-negative, got {}",
            self.separation
        );
        assert!(self.min_matches > 0, "min_matches must be positive");
        let (m_lo, m_hi) = self.magnification;
        assert!(
            m_lo > 0.0 && m_hi >= m_lo,
            "magnification range must satisfy 0 < min <= max, got ({}, {})",
            m_lo,
            m_hi
        );
        let (r_lo, r_hi) = self.rotation;
        assert!(
            r_hi >= r_lo,
            "rotation range must satisfy min <= max, got ({}, {})",
            r_lo,
            r_hi
        );
        assert!(self.search_steps > 0, "search_steps must be positive");
    }
}

/// Tolerance escalation policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Tolerance added on each retry.
    pub step: f64,
    /// Retry budget, applied separately to failures and to low-yield matches.
    pub max_retries: usize,
    /// Matched fraction of the input list below which a wider tolerance is tried.
    pub min_yield: f64,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_TOLERANCE_STEP,
            max_retries: DEFAULT_MAX_RETRIES,
            min_yield: DEFAULT_MIN_YIELD,
        }
    }
}

impl EscalationConfig {
    pub fn validate(&self) {
        assert!(
            self.step > 0.0,
            "escalation step must be positive, got {}",
            self.step
        );
        assert!(
            (0.0..=1.0).contains(&self.min_yield),
            "min_yield must be in [0, 1], got {}",
            self.min_yield
        );
    }
}

// =============================================================================
// Fitting
// =============================================================================

/// RANSAC configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacConfig {
    /// Correspondences drawn per hypothesis.
    pub min_samples: usize,
    /// Inlier residual threshold in pixels.
    pub residual_threshold: f64,
    /// Number of hypotheses.
    pub max_trials: usize,
    /// Random seed for reproducibility (None for OS entropy).
    pub seed: Option<u64>,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            min_samples: 3,
            residual_threshold: 2.0,
            max_trials: 100,
            seed: None,
        }
    }
}

impl RansacConfig {
    pub fn validate(&self) {
        assert!(self.min_samples > 0, "RANSAC min_samples must be positive");
        assert!(
            self.residual_threshold > 0.0,
            "RANSAC residual_threshold must be positive, got {}",
            self.residual_threshold
        );
        assert!(
            self.max_trials > 0,
            "RANSAC max_trials must be positive, got {}",
            self.max_trials
        );
    }
}

/// Estimator used for every fit of one job.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMethod {
    /// Closed-form least squares over all correspondences.
    #[default]
    LeastSquares,
    /// RANSAC followed by a least-squares refit on the inliers.
    Ransac(RansacConfig),
}

// =============================================================================
// Registration
// =============================================================================

/// Full configuration of one registration job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    pub termination: Termination,
    pub clip: ClipConfig,
    pub matching: MatchConfig,
    pub escalation: EscalationConfig,
    pub fit: FitMethod,
    pub model: TransformModel,
    /// Residuals beyond `outlier_sigma` × NMAD are rejected.
    pub outlier_sigma: f64,
    /// Leaf size of every spatial index built during the job.
    pub leaf_size: usize,
}

impl RegistrationConfig {
    /// Parse a (possibly partial) YAML document.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(text)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) {
        self.termination.validate();
        self.clip.validate();
        self.matching.validate();
        self.escalation.validate();
        if let FitMethod::Ransac(ransac) = &self.fit {
            ransac.validate();
        }
        assert!(
            self.outlier_sigma > 0.0,
            "outlier_sigma must be positive, got {}",
            self.outlier_sigma
        );
        assert!(self.leaf_size > 0, "leaf_size must be positive");
    }
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            termination: Termination::default(),
            clip: ClipConfig::default(),
            matching: MatchConfig::default(),
            escalation: EscalationConfig::default(),
            fit: FitMethod::default(),
            model: TransformModel::default(),
            outlier_sigma: DEFAULT_OUTLIER_SIGMA,
            leaf_size: DEFAULT_LEAF_SIZE,
        }
    }
}

// =============================================================================
// Intra-visit alignment
// =============================================================================

/// Settings for aligning the exposures of one visit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntraVisitConfig {
    /// Nearest-neighbor distance (pixels) within which two detections are one source.
    pub max_dist: f64,
    pub leaf_size: usize,
}

impl Default for IntraVisitConfig {
    fn default() -> Self {
        Self {
            max_dist: DEFAULT_INTRA_VISIT_MAX_DIST,
            leaf_size: DEFAULT_LEAF_SIZE,
        }
    }
}

impl IntraVisitConfig {
    pub fn validate(&self) {
        assert!(
            self.max_dist > 0.0,
            "max_dist must be positive, got {}",
            self.max_dist
        );
        assert!(self.leaf_size > 0, "leaf_size must be positive");
    }
}
