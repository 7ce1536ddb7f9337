//! # Stripflood Algorithms
//!
//! Depression-filling algorithms for DEMs split into horizontal strips:
//!
//! - **flood**: per-strip priority-flood labeling with spill-elevation
//!   graphs, graph renumbering and seam stitching, the global spill solver,
//!   spill application, and a whole-raster single-pass fill

pub mod flood;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::flood::{
        apply_spills, fill_depressions, flood_strip, merge_boundaries, partition_spills,
        solve_spills, FillDepressions, Label, LabelGraph, MergedGraph, SpillMap, StripBoundary,
        StripFlood, StripPosition, EXTERIOR_LABEL,
    };
    pub use stripflood_core::prelude::*;
}
