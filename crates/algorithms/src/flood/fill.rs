//! Whole-raster depression filling
//!
//! The single-process path: the entire DEM is treated as one strip whose
//! top and bottom rows are both true raster boundary. The distributed
//! pipeline with one worker reduces to exactly this, which is what makes
//! the two comparable bit for bit.

use stripflood_core::raster::Raster;
use stripflood_core::{Algorithm, Error, Result};

use super::apply::apply_spills;
use super::solve::solve_spills;
use super::strip::{flood_strip, StripPosition};

/// Fill all depressions in a DEM in place.
///
/// After this, every non-NoData cell has a monotone non-increasing path to
/// the raster boundary. Elevations only ever increase.
pub fn fill_depressions(dem: &mut Raster<f32>) -> Result<()> {
    let flood = flood_strip(dem, StripPosition::whole())?;
    let spills = solve_spills(&flood.graph);
    apply_spills(dem, &flood.labels, &spills)
}

/// Depression filling algorithm
#[derive(Debug, Clone, Default)]
pub struct FillDepressions;

impl Algorithm for FillDepressions {
    type Input = Raster<f32>;
    type Output = Raster<f32>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Priority-Flood Fill"
    }

    fn description(&self) -> &'static str {
        "Fill depressions so every cell drains to the raster boundary"
    }

    fn execute(&self, mut input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        fill_depressions(&mut input)?;
        Ok(input)
    }
}
