//! Distributed priority-flood depression filling
//!
//! The pipeline splits a DEM into horizontal strips. Each strip is flooded
//! independently, producing watershed labels and a graph of minimum spill
//! elevations between adjacent labels. The per-strip graphs are renumbered
//! into a disjoint global label space, stitched together along the strip
//! seams, and solved once for global spill elevations, which are then
//! applied back to each strip.
//!
//! Reference:
//! Barnes, R., Lehman, C., & Mulla, D. (2014). Priority-Flood: An optimal
//! depression-filling and watershed-labeling algorithm for digital elevation
//! models. *Computers & Geosciences*, 62, 117-127.

mod apply;
mod fill;
mod graph;
mod merge;
mod solve;
mod strip;

pub use apply::apply_spills;
pub use fill::{fill_depressions, FillDepressions};
pub use graph::{Label, LabelGraph, EXTERIOR_LABEL};
pub use merge::{merge_boundaries, MergedGraph, StripBoundary};
pub use solve::{partition_spills, solve_spills, SpillMap};
pub use strip::{flood_strip, StripFlood, StripPosition};
