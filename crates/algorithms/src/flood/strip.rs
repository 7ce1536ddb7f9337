//! Per-strip priority-flood labeling pass
//!
//! Runs the improved priority-flood (Barnes 2014) on one horizontal strip of
//! the DEM: cells are processed from the strip edge inward in elevation
//! order, submerged cells are raised to their local spill elevation through
//! a FIFO, every cell receives a watershed label, and adjacencies between
//! labels are collected into a [`LabelGraph`] of minimum spill elevations.
//!
//! Only the outer boundary of the full raster is labeled as exterior here.
//! Seam rows between strips are seeded without a label so the coordinator
//! can reconcile them after all strips are flooded.

use ndarray::Array2;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use stripflood_core::raster::{Raster, D8_OFFSETS};
use stripflood_core::{Error, RasterElement, Result};

use super::graph::{Label, LabelGraph, EXTERIOR_LABEL};

/// Where a strip sits in the vertical split of the parent raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripPosition {
    /// Strip index, 0 at the top
    pub index: usize,
    /// Total number of strips
    pub count: usize,
}

impl StripPosition {
    pub fn new(index: usize, count: usize) -> Result<Self> {
        if count == 0 || index >= count {
            return Err(Error::InvalidParameter {
                name: "strip",
                value: format!("{}/{}", index, count),
                reason: "strip index must be below the strip count".to_string(),
            });
        }
        Ok(Self { index, count })
    }

    /// The whole raster as a single strip
    pub fn whole() -> Self {
        Self { index: 0, count: 1 }
    }

    /// Does this strip contain the top row of the parent raster?
    pub fn is_topmost(&self) -> bool {
        self.index == 0
    }

    /// Does this strip contain the bottom row of the parent raster?
    pub fn is_bottommost(&self) -> bool {
        self.index + 1 == self.count
    }

    /// Global row range `[first, last)` of this strip for a raster of
    /// `height` rows. Strips tile the raster exactly; the last strip takes
    /// the remainder rows.
    pub fn rows(&self, height: usize) -> Result<(usize, usize)> {
        if self.count > height {
            return Err(Error::InvalidParameter {
                name: "strip_count",
                value: self.count.to_string(),
                reason: format!("raster has only {} rows", height),
            });
        }
        let step = height / self.count;
        let first = step * self.index;
        let last = if self.is_bottommost() {
            height
        } else {
            step * (self.index + 1)
        };
        Ok((first, last))
    }
}

/// Result of flooding one strip.
#[derive(Debug, Clone)]
pub struct StripFlood {
    /// Watershed label of every cell; NoData cells carry [`EXTERIOR_LABEL`]
    pub labels: Array2<Label>,
    /// Minimum spill elevations between adjacent labels within the strip
    pub graph: LabelGraph,
}

/// Labeling state of a cell during the flood.
///
/// A pending cell has inherited a label from the neighbor that enqueued it
/// but has not been processed yet; when popped it adopts that label and
/// becomes claimed. A claimed cell popped again (cells can sit in the open
/// heap and the pit queue at once) is skipped, so no cell is processed
/// twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellState {
    Empty,
    Pending(Label),
    Claimed(Label),
}

/// A cell in flight, carrying the elevation it will be processed at.
///
/// For open-heap entries `z` is the cell's elevation at push time; for pit
/// entries it is the spill elevation inherited from the parent.
#[derive(Debug, Clone, Copy)]
struct FloodCell {
    z: f32,
    row: usize,
    col: usize,
}

impl PartialEq for FloodCell {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloodCell {}

impl PartialOrd for FloodCell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reverse ordering so BinaryHeap (max-heap) acts as a min-heap; ties break
// on (row, col) so pop order is reproducible.
impl Ord for FloodCell {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .z
            .total_cmp(&self.z)
            .then_with(|| other.row.cmp(&self.row))
            .then_with(|| other.col.cmp(&self.col))
    }
}

/// Flood one strip of the DEM.
///
/// Raises submerged cells in place (elevations only ever increase), labels
/// every cell, and returns the label grid together with the strip's label
/// adjacency graph.
///
/// NoData cells are treated as exterior: they keep their sentinel value,
/// receive [`EXTERIOR_LABEL`], and data cells beside them are seeded as
/// draining off the map.
pub fn flood_strip(dem: &mut Raster<f32>, position: StripPosition) -> Result<StripFlood> {
    let nodata = dem.nodata().ok_or(Error::NoDataNotSet)?;
    let (rows, cols) = dem.shape();
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut state = Array2::from_elem((rows, cols), CellState::Empty);
    let mut open: BinaryHeap<FloodCell> = BinaryHeap::new();
    let mut pit: VecDeque<FloodCell> = VecDeque::new();

    // NoData belongs to the exterior and is never enqueued or modified
    for ((row, col), &value) in dem.data().indexed_iter() {
        if value.is_nodata(Some(nodata)) {
            state[(row, col)] = CellState::Claimed(EXTERIOR_LABEL);
        }
    }

    // Data cells beside a NoData hole drain off the map, so they seed the
    // flood exactly like outer-boundary cells
    for row in 0..rows {
        for col in 0..cols {
            if state[(row, col)] == CellState::Claimed(EXTERIOR_LABEL) {
                continue;
            }
            let beside_hole = D8_OFFSETS.iter().any(|&off| {
                dem.neighbor(row, col, off)
                    .map(|(nr, nc)| state[(nr, nc)] == CellState::Claimed(EXTERIOR_LABEL))
                    .unwrap_or(false)
            });
            if beside_hole {
                seed(dem, &mut state, &mut open, row, col, true);
            }
        }
    }

    // Top and bottom rows, interior columns. On internal seams the cells are
    // enqueued without a label; the exterior label would be wrong there and
    // the coordinator reconciles the seam later.
    for col in 1..cols.saturating_sub(1) {
        seed(dem, &mut state, &mut open, 0, col, position.is_topmost());
        seed(dem, &mut state, &mut open, rows - 1, col, position.is_bottommost());
    }
    // Left and right columns are always the raster's outer boundary
    for row in 0..rows {
        seed(dem, &mut state, &mut open, row, 0, true);
        seed(dem, &mut state, &mut open, row, cols - 1, true);
    }

    let mut graph = LabelGraph::new();
    let mut next_label: Label = EXTERIOR_LABEL + 1;

    while let Some(cell) = pit.pop_front().or_else(|| open.pop()) {
        let my_label = match state[(cell.row, cell.col)] {
            CellState::Claimed(_) => continue,
            CellState::Empty => {
                let label = next_label;
                next_label = next_label.checked_add(1).ok_or_else(|| {
                    Error::LabelOverflow("strip label counter would wrap".to_string())
                })?;
                state[(cell.row, cell.col)] = CellState::Claimed(label);
                label
            }
            CellState::Pending(label) => {
                state[(cell.row, cell.col)] = CellState::Claimed(label);
                label
            }
        };

        for &offset in &D8_OFFSETS {
            let Some((nr, nc)) = dem.neighbor(cell.row, cell.col, offset) else {
                continue;
            };

            match state[(nr, nc)] {
                CellState::Pending(other) | CellState::Claimed(other) => {
                    // A literal NoData neighbor never lands here with a
                    // different label: the hole and everything beside it
                    // are exterior before the loop starts
                    if other != my_label {
                        let neighbor_elev = unsafe { dem.get_unchecked(nr, nc) };
                        graph.link(my_label, other, neighbor_elev.max(cell.z));
                    }
                }
                CellState::Empty => {
                    state[(nr, nc)] = CellState::Pending(my_label);
                    let elev = unsafe { dem.get_unchecked(nr, nc) };
                    if elev <= cell.z {
                        // Submerged: raise to the spill elevation and let the
                        // pit queue carry it onward without re-sorting
                        unsafe { dem.set_unchecked(nr, nc, cell.z) };
                        pit.push_back(FloodCell {
                            z: cell.z,
                            row: nr,
                            col: nc,
                        });
                    } else {
                        open.push(FloodCell {
                            z: elev,
                            row: nr,
                            col: nc,
                        });
                    }
                }
            }
        }
    }

    let mut labels = Array2::zeros((rows, cols));
    for ((row, col), &s) in state.indexed_iter() {
        match s {
            CellState::Claimed(label) => labels[(row, col)] = label,
            _ => {
                return Err(Error::Invariant(format!(
                    "cell ({}, {}) left unlabeled after flood",
                    row, col
                )))
            }
        }
    }

    Ok(StripFlood { labels, graph })
}

fn seed(
    dem: &Raster<f32>,
    state: &mut Array2<CellState>,
    open: &mut BinaryHeap<FloodCell>,
    row: usize,
    col: usize,
    exterior: bool,
) {
    let value = unsafe { dem.get_unchecked(row, col) };
    if dem.is_nodata(value) {
        return;
    }
    if exterior && state[(row, col)] == CellState::Empty {
        state[(row, col)] = CellState::Pending(EXTERIOR_LABEL);
    }
    open.push(FloodCell {
        z: value,
        row,
        col,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const ND: f32 = -9999.0;

    fn raster(values: &[f32], rows: usize, cols: usize) -> Raster<f32> {
        let mut r = Raster::from_vec(values.to_vec(), rows, cols).unwrap();
        r.set_nodata(Some(ND));
        r
    }

    fn assert_never_lowered(before: &Raster<f32>, after: &Raster<f32>) {
        for (b, a) in before.data().iter().zip(after.data().iter()) {
            if !b.is_nodata(Some(ND)) {
                assert!(a >= b, "elevation lowered from {} to {}", b, a);
            }
        }
    }

    #[test]
    fn test_flat_plain_is_all_exterior() {
        let mut dem = raster(&[10.0; 25], 5, 5);
        let flood = flood_strip(&mut dem, StripPosition::whole()).unwrap();

        // The exterior label floods inward through the pit queue, so the
        // whole plain joins the exterior and no inter-label edge exists
        assert!(flood.labels.iter().all(|&l| l == EXTERIOR_LABEL));
        assert!(flood.graph.is_empty());
        assert!(dem.data().iter().all(|&v| v == 10.0));
    }

    #[test]
    fn test_single_pit_filled_to_rim() {
        #[rustfmt::skip]
        let values = [
            5.0, 5.0, 5.0, 5.0, 5.0,
            5.0, 1.0, 1.0, 1.0, 5.0,
            5.0, 1.0, 0.0, 1.0, 5.0,
            5.0, 1.0, 1.0, 1.0, 5.0,
            5.0, 5.0, 5.0, 5.0, 5.0,
        ];
        let before = raster(&values, 5, 5);
        let mut dem = before.clone();
        let flood = flood_strip(&mut dem, StripPosition::whole()).unwrap();

        for row in 0..5 {
            for col in 0..5 {
                assert_eq!(dem.get(row, col).unwrap(), 5.0, "cell ({}, {})", row, col);
            }
        }
        assert_never_lowered(&before, &dem);
        assert!(flood.labels.iter().all(|&l| l > 0));
    }

    #[test]
    fn test_monotone_ramp_unchanged() {
        let values: Vec<f32> = (0..25).map(|i| (i % 5) as f32).collect();
        let before = raster(&values, 5, 5);
        let mut dem = before.clone();
        flood_strip(&mut dem, StripPosition::whole()).unwrap();

        for (b, a) in before.data().iter().zip(dem.data().iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_nodata_hole_preserved() {
        let mut values = [10.0_f32; 25];
        values[2 * 5 + 2] = ND;
        let mut dem = raster(&values, 5, 5);
        let flood = flood_strip(&mut dem, StripPosition::whole()).unwrap();

        assert_eq!(dem.get(2, 2).unwrap().to_bits(), ND.to_bits());
        for ((row, col), &v) in dem.data().indexed_iter() {
            if (row, col) != (2, 2) {
                assert_eq!(v, 10.0);
            }
        }
        assert_eq!(flood.labels[(2, 2)], EXTERIOR_LABEL);
    }

    #[test]
    fn test_basin_enclosed_by_nodata_is_filled() {
        // A NoData ring around a 3x3 island with a pit in the middle: the
        // island drains into the hole, so the pit fills to the island rim
        #[rustfmt::skip]
        let values = [
            ND, ND,  ND,  ND,  ND,
            ND, 5.0, 5.0, 5.0, ND,
            ND, 5.0, 1.0, 5.0, ND,
            ND, 5.0, 5.0, 5.0, ND,
            ND, ND,  ND,  ND,  ND,
        ];
        let mut dem = raster(&values, 5, 5);
        let flood = flood_strip(&mut dem, StripPosition::whole()).unwrap();

        assert_eq!(dem.get(2, 2).unwrap(), 5.0);
        for ((row, col), &l) in flood.labels.indexed_iter() {
            assert!(l > 0, "cell ({}, {}) unlabeled", row, col);
        }
    }

    #[test]
    fn test_interior_strip_seam_rows_get_fresh_labels() {
        // Top strip of a two-strip split: the bottom row is an internal
        // seam, so its basin must NOT be folded into the exterior
        #[rustfmt::skip]
        let values = [
            9.0, 9.0, 9.0, 9.0, 9.0,
            9.0, 2.0, 2.0, 2.0, 9.0,
            9.0, 2.0, 2.0, 2.0, 9.0,
        ];
        let mut dem = raster(&values, 3, 5);
        let position = StripPosition::new(0, 2).unwrap();
        let flood = flood_strip(&mut dem, position).unwrap();

        let top: Vec<Label> = flood.labels.row(0).to_vec();
        let bottom: Vec<Label> = flood.labels.row(2).to_vec();
        assert_eq!(top, vec![1, 1, 1, 1, 1]);
        assert_eq!(bottom, vec![1, 2, 2, 2, 1]);

        // The basin meets the exterior over the 9.0 rim only
        assert_eq!(flood.graph.weight(EXTERIOR_LABEL, 2), Some(9.0));
        assert_eq!(flood.graph.num_edges(), 1);

        // Nothing in the strip tells the basin it can drain yet, so its
        // cells keep their own elevation
        assert_eq!(dem.get(1, 1).unwrap(), 2.0);
    }

    #[test]
    fn test_bottom_strip_mirrors_top_strip() {
        #[rustfmt::skip]
        let values = [
            9.0, 2.0, 2.0, 2.0, 9.0,
            9.0, 2.0, 2.0, 2.0, 9.0,
            9.0, 9.0, 9.0, 9.0, 9.0,
        ];
        let mut dem = raster(&values, 3, 5);
        let position = StripPosition::new(1, 2).unwrap();
        let flood = flood_strip(&mut dem, position).unwrap();

        let top: Vec<Label> = flood.labels.row(0).to_vec();
        let bottom: Vec<Label> = flood.labels.row(2).to_vec();
        assert_eq!(top, vec![1, 2, 2, 2, 1]);
        assert_eq!(bottom, vec![1, 1, 1, 1, 1]);
        assert_eq!(flood.graph.weight(EXTERIOR_LABEL, 2), Some(9.0));
    }

    #[test]
    fn test_pit_respects_low_outlet() {
        // Border 10 except a low outlet on the bottom edge; the sink fills
        // only to the outlet level
        #[rustfmt::skip]
        let values = [
            10.0, 10.0, 10.0, 10.0, 10.0,
            10.0, 5.0,  5.0,  5.0,  10.0,
            10.0, 5.0,  1.0,  5.0,  10.0,
            10.0, 5.0,  5.0,  5.0,  10.0,
            10.0, 10.0, 2.0,  10.0, 10.0,
        ];
        let before = raster(&values, 5, 5);
        let mut dem = before.clone();
        flood_strip(&mut dem, StripPosition::whole()).unwrap();

        let center = dem.get(2, 2).unwrap();
        assert!(
            (2.0..=5.0).contains(&center),
            "sink should fill toward the outlet level, got {}",
            center
        );
        assert_never_lowered(&before, &dem);
    }

    #[test]
    fn test_strip_rows_partition_exactly() {
        let height = 10;
        let count = 3;
        let mut covered = 0;
        let mut expected_first = 0;
        for index in 0..count {
            let position = StripPosition::new(index, count).unwrap();
            let (first, last) = position.rows(height).unwrap();
            assert_eq!(first, expected_first);
            assert!(last > first);
            covered += last - first;
            expected_first = last;
        }
        assert_eq!(covered, height);
    }

    #[test]
    fn test_strip_rows_rejects_too_many_strips() {
        let position = StripPosition::new(4, 5).unwrap();
        assert!(position.rows(3).is_err());
    }

    #[test]
    fn test_requires_nodata() {
        let mut dem = Raster::from_vec(vec![1.0_f32; 4], 2, 2).unwrap();
        assert!(matches!(
            flood_strip(&mut dem, StripPosition::whole()),
            Err(Error::NoDataNotSet)
        ));
    }
}
