//! Numeric helpers shared by the matcher, the estimators and the aligners.

pub mod statistics;
