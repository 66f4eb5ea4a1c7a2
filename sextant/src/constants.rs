//! Shared constants for the registration engine.
//!
//! Defaults that mirror the astrometric alignment pipeline this engine serves
//! live here so the config types and the algorithms agree on them.

// =============================================================================
// Spatial index
// =============================================================================

/// Default number of points stored in a k-d tree leaf bucket.
pub const DEFAULT_LEAF_SIZE: usize = 10;

// =============================================================================
// Matching
// =============================================================================

/// Default clip radius (pixels) for the forward/backward nearest-neighbor clip.
pub const DEFAULT_CLIP_RADIUS: f64 = 20.0;

/// Default initial pairing tolerance (pixels) of the tolerance matcher.
pub const DEFAULT_MATCH_TOLERANCE: f64 = 5.0;

/// Points of one list closer than this to each other are dropped as ambiguous.
pub const DEFAULT_SEPARATION: f64 = 0.5;

/// Minimum number of correspondences a match must produce.
pub const DEFAULT_MIN_MATCHES: usize = 10;

/// Tolerance increment applied on each escalation retry.
pub const DEFAULT_TOLERANCE_STEP: f64 = 5.0;

/// Retry budget of the tolerance escalation (per policy).
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Matches / candidates below this fraction trigger a low-yield retry.
pub const DEFAULT_MIN_YIELD: f64 = 0.1;

// =============================================================================
// Fitting and rejection
// =============================================================================

/// Residual sigma multiple beyond which a correspondence is an outlier.
pub const DEFAULT_OUTLIER_SIGMA: f64 = 4.0;

/// Reference point spread below which a similarity fit is degenerate.
pub const MIN_REFERENCE_VARIANCE: f64 = 1e-10;

// =============================================================================
// Intra-visit alignment
// =============================================================================

/// Default nearest-neighbor match distance (pixels) between exposures of one visit.
pub const DEFAULT_INTRA_VISIT_MAX_DIST: f64 = 1.0;
