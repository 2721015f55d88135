//! Coverage matrix computer and gap detector.
//!
//! Runs strictly after the topic tree and both graphs are final. The
//! matrix is recomputed from scratch every run and replaced wholesale, so
//! it can never reflect stale graph state.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

mod gaps;
mod matrix;

pub use gaps::{detect_gaps, Recommendation, RecommendationEvidence, RecommendationKind};
pub use matrix::{compute_matrix, CoverageCell, Dimension};
