//! Parallel drivers for independent registration and alignment jobs.
//!
//! Jobs share no mutable state; each owns its point sets and builds its own
//! indices. Results come back in input order and a failing job never aborts
//! the rest of the batch.

use rayon::prelude::*;

use crate::config::{IntraVisitConfig, RegistrationConfig};
use crate::error::Error;
use crate::intra_visit::{Exposure, IntraVisitAligner, ShiftRecord};
use crate::registration::{RegistrationResult, Registrator};
use crate::transform::Projection;
use crate::types::PointSet;

/// One field to register.
pub struct RegistrationJob<'a> {
    pub label: String,
    pub reference: PointSet,
    pub target: PointSet,
    pub projection: &'a (dyn Projection + Sync),
}

/// Register every job with the same configuration.
pub fn register_batch(
    jobs: &[RegistrationJob<'_>],
    config: &RegistrationConfig,
) -> Vec<Result<RegistrationResult, Error>> {
    let registrator = Registrator::new(config.clone());

    jobs.par_iter()
        .map(|job| {
            let result = registrator.register(&job.reference, &job.target, job.projection);
            match &result {
                Ok(r) => tracing::info!(
                    "{}: registered in {} iterations, rms={:.3}, N={}",
                    job.label,
                    r.iterations.len(),
                    r.dispersion,
                    r.num_good
                ),
                Err(e) => tracing::warn!("{}: registration failed: {}", job.label, e),
            }
            result
        })
        .collect()
}

/// Align the exposures of every visit against that visit's first exposure.
pub fn align_visits(
    visits: &[Vec<Exposure<'_>>],
    config: &IntraVisitConfig,
) -> Vec<Result<Vec<ShiftRecord>, Error>> {
    let aligner = IntraVisitAligner::new(*config);

    visits
        .par_iter()
        .map(|exposures| {
            let result = aligner.align(exposures);
            if let Err(e) = &result {
                let label = exposures.first().map_or("<empty>", |first| first.label.as_str());
                tracing::warn!("Visit starting at {}: alignment failed: {}", label, e);
            }
            result
        })
        .collect()
}
