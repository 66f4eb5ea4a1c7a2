//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use sextant::prelude::*;
//! ```

// Data
pub use crate::{Correspondence, Error, PointSet};

// Configuration
pub use crate::{FitMethod, IntraVisitConfig, RegistrationConfig, Termination};

// Transforms
pub use crate::{IdentityProjection, Projection, SimilarityTransform, TransformModel};

// Registration - main API
pub use crate::{
    Exposure, IntraVisitAligner, RegistrationResult, Registrator, ShiftRecord, ShiftStatus,
    register,
};
