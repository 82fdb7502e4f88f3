//! Filters Module - per-frame skeleton corrections
//!
//! Sits first in the pipeline; corrected frames are routed on to the
//! gesture recognizers.

pub mod correction;

// Re-export common types
pub use correction::{
    CorrectionFilter, CorrectionFunction, CorrectionStats, IdentityCorrection, OffsetCorrection,
};
