//! Translation-only alignment of the exposures of one visit.
//!
//! The first exposure's detections are the reference. Every exposure
//! (the reference included) is projected into the reference pixel frame and
//! each detection is paired with its nearest reference detection within
//! `max_dist`. The shift is the per-axis median offset of those pairs.


use std::fmt;

use glam::DVec2;
use serde::Serialize;

use crate::config::IntraVisitConfig;
use crate::error::Error;
use crate::math::statistics;
use crate::spatial::KdTree;
use crate::transform::Projection;
use crate::types::PointSet;

/// Header of the shift log.
pub const SHIFT_LOG_HEADER: &str = "# flt xshift yshift rot scale N rmsx rmsy";

/// One exposure of a visit.
pub struct Exposure<'a> {
    pub label: String,
    pub detections: PointSet,
    /// Maps the exposure's detector coordinates into the reference pixel frame.
    pub projection: &'a (dyn Projection + Sync),
}

impl fmt::Debug for Exposure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exposure")
            .field("label", &self.label)
            .field("detections", &self.detections.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShiftStatus {
    Matched,
    /// No detection fell within `max_dist`; the shift is the identity.
    NoMatch,
}

/// Measured shift of one exposure relative to the reference exposure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShiftRecord {
    pub label: String,
    pub dx: f64,
    pub dy: f64,
    /// Always 0: intra-visit alignment is translation-only.
    pub rotation: f64,
    /// Always 1.
    pub scale: f64,
    pub n_matched: usize,
    /// Per-axis standard error of the median offset.
    pub rms: DVec2,
    pub status: ShiftStatus,
}

impl ShiftRecord {
    fn no_match(label: &str) -> Self {
        Self {
            label: label.to_string(),
            dx: 0.0,
            dy: 0.0,
            rotation: 0.0,
            scale: 1.0,
            n_matched: 0,
            rms: DVec2::ZERO,
            status: ShiftStatus::NoMatch,
        }
    }

    pub fn shift(&self) -> DVec2 {
        DVec2::new(self.dx, self.dy)
    }

    /// `label dx dy rot scale N rmsx rmsy`, fixed-width.
    pub fn log_line(&self) -> String {
        format!(
            "{} {:7.3} {:7.3} {:8.5} {:8.5} {:5} {:6.3} {:6.3}",
            self.label,
            self.dx,
            self.dy,
            self.rotation,
            self.scale,
            self.n_matched,
            self.rms.x,
            self.rms.y
        )
    }
}

/// Header plus one line per record.
pub fn shift_log_lines(records: &[ShiftRecord]) -> Vec<String> {
    std::iter::once(SHIFT_LOG_HEADER.to_string())
        .chain(records.iter().map(ShiftRecord::log_line))
        .collect()
}

/// Measures per-exposure shifts against the first exposure of a visit.
#[derive(Debug, Clone, Default)]
pub struct IntraVisitAligner {
    config: IntraVisitConfig,
}

impl IntraVisitAligner {
    /// # Panics
    /// Panics if the configuration is invalid.
    pub fn new(config: IntraVisitConfig) -> Self {
        config.validate();
        Self { config }
    }

    /// One record per exposure, in input order.
    ///
    /// Exposures without any match yield a [`ShiftStatus::NoMatch`] record and
    /// the batch continues. An empty reference exposure fails with
    /// [`Error::EmptyIndex`].
    pub fn align(&self, exposures: &[Exposure<'_>]) -> Result<Vec<ShiftRecord>, Error> {
        let Some(first) = exposures.first() else {
            return Ok(Vec::new());
        };
        if first.detections.is_empty() {
            return Err(Error::EmptyIndex);
        }

        let tree = KdTree::with_leaf_size(first.detections.points(), self.config.leaf_size);

        let records = exposures
            .iter()
            .map(|exposure| self.measure(&tree, exposure))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn measure(&self, tree: &KdTree, exposure: &Exposure<'_>) -> Result<ShiftRecord, Error> {
        let projected = exposure.projection.project(exposure.detections.points());

        let mut dx = Vec::with_capacity(projected.len());
        let mut dy = Vec::with_capacity(projected.len());
        for &p in &projected {
            if !p.is_finite() {
                continue;
            }
            let neighbor = tree.nearest(p)?;
            if neighbor.distance() < self.config.max_dist {
                let offset = p - tree.point(neighbor.index);
                dx.push(offset.x);
                dy.push(offset.y);
            }
        }

        if dx.is_empty() {
            tracing::warn!("{}: no match within {:.2} px", exposure.label, self.config.max_dist);
            return Ok(ShiftRecord::no_match(&exposure.label));
        }

        let n = dx.len();
        let sqrt_n = (n as f64).sqrt();
        let rms = DVec2::new(
            statistics::std_dev(&dx) / sqrt_n,
            statistics::std_dev(&dy) / sqrt_n,
        );
        let record = ShiftRecord {
            label: exposure.label.clone(),
            dx: statistics::median_f64_mut(&mut dx),
            dy: statistics::median_f64_mut(&mut dy),
            rotation: 0.0,
            scale: 1.0,
            n_matched: n,
            rms,
            status: ShiftStatus::Matched,
        };

        tracing::info!(
            "{}: shift=({:.3}, {:.3}) rms=({:.3}, {:.3}) N={}",
            record.label,
            record.dx,
            record.dy,
            record.rms.x,
            record.rms.y,
            n
        );

        Ok(record)
    }
}
