//! Spill writeback
//!
//! Raises every cell to at least its label's spill elevation. This is the
//! last step on each worker: the strip was already filled internally by the
//! flood pass, and the spill map carries the extra height imposed by basins
//! that continue across other strips.

use ndarray::Array2;
use stripflood_core::raster::Raster;
use stripflood_core::{Error, RasterElement, Result};

use super::graph::{Label, EXTERIOR_LABEL};
use super::solve::SpillMap;

/// Raise each cell of `dem` to its label's spill elevation.
///
/// NoData cells are untouched. Cells whose label is absent from the map are
/// expected to belong to the exterior (its spill is the sentinel and never
/// raises anything); any other absent label is a fatal bookkeeping bug.
pub fn apply_spills(
    dem: &mut Raster<f32>,
    labels: &Array2<Label>,
    spills: &SpillMap,
) -> Result<()> {
    let nodata = dem.nodata().ok_or(Error::NoDataNotSet)?;
    let (rows, cols) = dem.shape();
    if labels.dim() != (rows, cols) {
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar: labels.nrows(),
            ac: labels.ncols(),
        });
    }

    for ((row, col), &label) in labels.indexed_iter() {
        let value = unsafe { dem.get_unchecked(row, col) };
        if value.is_nodata(Some(nodata)) {
            continue;
        }
        if label == 0 {
            return Err(Error::Invariant(format!(
                "unlabeled cell ({}, {}) at writeback",
                row, col
            )));
        }
        match spills.get(&label) {
            Some(&spill) => {
                if value < spill {
                    unsafe { dem.set_unchecked(row, col, spill) };
                }
            }
            None => {
                if label != EXTERIOR_LABEL {
                    return Err(Error::Invariant(format!(
                        "unknown label {} at writeback of cell ({}, {})",
                        label, row, col
                    )));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const ND: f32 = -9999.0;

    fn dem(values: &[f32], rows: usize, cols: usize) -> Raster<f32> {
        let mut r = Raster::from_vec(values.to_vec(), rows, cols).unwrap();
        r.set_nodata(Some(ND));
        r
    }

    #[test]
    fn test_raises_to_spill_only() {
        let mut raster = dem(&[2.0, 7.0, 2.0, ND], 2, 2);
        let labels = Array2::from_shape_vec((2, 2), vec![2, 2, 1, 1]).unwrap();
        let spills = BTreeMap::from([(2, 5.0)]);

        apply_spills(&mut raster, &labels, &spills).unwrap();

        assert_eq!(raster.get(0, 0).unwrap(), 5.0); // raised
        assert_eq!(raster.get(0, 1).unwrap(), 7.0); // already above
        assert_eq!(raster.get(1, 0).unwrap(), 2.0); // exterior, no spill
        assert_eq!(raster.get(1, 1).unwrap().to_bits(), ND.to_bits());
    }

    #[test]
    fn test_exterior_sentinel_never_raises() {
        let mut raster = dem(&[-3.0, 0.0], 1, 2);
        let labels = Array2::from_shape_vec((1, 2), vec![1, 1]).unwrap();
        let spills = BTreeMap::from([(EXTERIOR_LABEL, f32::NEG_INFINITY)]);

        apply_spills(&mut raster, &labels, &spills).unwrap();

        assert_eq!(raster.get(0, 0).unwrap(), -3.0);
        assert_eq!(raster.get(0, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_unknown_label_is_fatal() {
        let mut raster = dem(&[1.0], 1, 1);
        let labels = Array2::from_shape_vec((1, 1), vec![5]).unwrap();
        let spills = SpillMap::new();

        assert!(matches!(
            apply_spills(&mut raster, &labels, &spills),
            Err(Error::Invariant(_))
        ));
    }

    #[test]
    fn test_shape_mismatch_is_fatal() {
        let mut raster = dem(&[1.0, 1.0], 1, 2);
        let labels = Array2::from_shape_vec((2, 1), vec![1, 1]).unwrap();
        assert!(matches!(
            apply_spills(&mut raster, &labels, &SpillMap::new()),
            Err(Error::SizeMismatch { .. })
        ));
    }
}
