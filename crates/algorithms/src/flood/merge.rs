//! Coordinator-side graph assembly
//!
//! Per-strip labels overlap (every strip counts from 2), so the coordinator
//! first renumbers each strip's labels into a disjoint global namespace by
//! adding a per-strip offset, then walks the seams between vertically
//! adjacent strips to add the cross-strip edges the workers could not see.

use std::collections::BTreeMap;
use stripflood_core::raster::{translate, D8_DOWNWARD};
use stripflood_core::{Error, RasterElement, Result};

use super::graph::{Label, LabelGraph, EXTERIOR_LABEL};

/// Boundary data uploaded by one worker: the strip's outermost rows after
/// flooding, their labels, and the strip's label graph.
#[derive(Debug, Clone)]
pub struct StripBoundary {
    pub top_elev: Vec<f32>,
    pub bot_elev: Vec<f32>,
    pub top_labels: Vec<Label>,
    pub bot_labels: Vec<Label>,
    pub graph: LabelGraph,
}

/// The master graph over global labels, plus the bookkeeping that maps
/// global labels back to (strip, local label).
#[derive(Debug, Clone)]
pub struct MergedGraph {
    pub master: LabelGraph,
    pub label_to_strip: BTreeMap<Label, usize>,
    pub strip_offsets: Vec<Label>,
}

impl MergedGraph {
    /// Recover the owning strip and the per-strip local label of a global
    /// label. The exterior label is shared by all strips and has no single
    /// owner.
    pub fn to_local(&self, global: Label) -> Option<(usize, Label)> {
        if global == EXTERIOR_LABEL {
            return None;
        }
        let strip = *self.label_to_strip.get(&global)?;
        Some((strip, global - self.strip_offsets[strip]))
    }
}

/// Renumber per-strip labels into a disjoint global namespace and stitch
/// the seams between adjacent strips into one master graph.
///
/// Label rows in `strips` are rewritten to global labels in place.
pub fn merge_boundaries(
    strips: &mut [StripBoundary],
    width: usize,
    nodata: f32,
) -> Result<MergedGraph> {
    let mut master = LabelGraph::new();
    let mut label_to_strip: BTreeMap<Label, usize> = BTreeMap::new();
    let mut strip_offsets: Vec<Label> = Vec::with_capacity(strips.len());
    // Highest global label handed out so far; the next strip's offset.
    // Never reset, so a strip with few labels cannot collapse the namespace.
    let mut max_label: Label = 0;

    for (index, strip) in strips.iter_mut().enumerate() {
        check_row_lengths(index, strip, width)?;

        let offset = max_label;
        strip_offsets.push(offset);
        let mut seen_max: Label = 0;

        for (a, b, weight) in strip.graph.entries() {
            let ga = shift(a, offset, index)?;
            let gb = shift(b, offset, index)?;
            master.link(ga, gb, weight);
            for global in [ga, gb] {
                if global != EXTERIOR_LABEL {
                    label_to_strip.insert(global, index);
                    seen_max = seen_max.max(global);
                }
            }
        }

        for row in [&mut strip.top_labels, &mut strip.bot_labels] {
            for label in row.iter_mut() {
                let global = shift(*label, offset, index)?;
                *label = global;
                if global != EXTERIOR_LABEL {
                    label_to_strip.insert(global, index);
                    seen_max = seen_max.max(global);
                }
            }
        }

        max_label = max_label.max(seen_max);
    }

    stitch_seams(&mut master, strips, width, nodata);
    master.check_symmetry()?;

    Ok(MergedGraph {
        master,
        label_to_strip,
        strip_offsets,
    })
}

/// Add cross-strip edges along each internal seam.
///
/// For every bottom-row cell of the upper strip, the three downward
/// 8-neighbors lie on the lower strip's top row. Each cross-seam adjacency
/// pairs one bottom-row cell with one of those three neighbors, so this
/// walk enumerates every pair exactly once; the upward directions would
/// revisit the same pairs.
///
/// A NoData side carries the exterior label, and its sentinel stays out of
/// the weight: a cell beside a hole drains into it at the cell's own
/// elevation, the same rule the strip flood applies inside a strip.
fn stitch_seams(master: &mut LabelGraph, strips: &[StripBoundary], width: usize, nodata: f32) {
    for index in 0..strips.len().saturating_sub(1) {
        let upper = &strips[index];
        let lower = &strips[index + 1];

        // The seam is a two-row grid: row 0 the upper strip's bottom row,
        // row 1 the lower strip's top row
        for col in 0..width {
            let bottom_elev = upper.bot_elev[col];
            let bottom_nd = bottom_elev.is_nodata(Some(nodata));
            let bottom_label = upper.bot_labels[col];

            for &offset in &D8_DOWNWARD {
                let Some((_, nc)) = translate(0, col, offset, 2, width) else {
                    continue;
                };
                let top_elev = lower.top_elev[nc];
                let top_nd = top_elev.is_nodata(Some(nodata));
                let top_label = lower.top_labels[nc];
                if bottom_label == top_label {
                    continue;
                }
                let weight = match (bottom_nd, top_nd) {
                    (false, false) => bottom_elev.max(top_elev),
                    (true, false) => top_elev,
                    (false, true) => bottom_elev,
                    (true, true) => continue,
                };
                master.link(bottom_label, top_label, weight);
            }
        }
    }
}

fn shift(label: Label, offset: Label, strip: usize) -> Result<Label> {
    if label == 0 {
        return Err(Error::Invariant(format!(
            "unlabeled cell in boundary data of strip {}",
            strip
        )));
    }
    if label == EXTERIOR_LABEL {
        return Ok(label);
    }
    label.checked_add(offset).ok_or_else(|| {
        Error::LabelOverflow(format!(
            "global label for strip {} would exceed 32 bits",
            strip
        ))
    })
}

fn check_row_lengths(index: usize, strip: &StripBoundary, width: usize) -> Result<()> {
    for (name, len) in [
        ("top elevations", strip.top_elev.len()),
        ("bottom elevations", strip.bot_elev.len()),
        ("top labels", strip.top_labels.len()),
        ("bottom labels", strip.bot_labels.len()),
    ] {
        if len != width {
            return Err(Error::Invariant(format!(
                "strip {} sent {} of length {}, expected {}",
                index, name, len, width
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ND: f32 = -9999.0;

    /// The two strips of a 6x5 raster whose central pit straddles the seam:
    /// each strip found one basin (label 2) enclosed by a 9.0 rim.
    fn straddling_pit_strips() -> Vec<StripBoundary> {
        let mut upper_graph = LabelGraph::new();
        upper_graph.link(EXTERIOR_LABEL, 2, 9.0);
        let upper = StripBoundary {
            top_elev: vec![9.0; 5],
            bot_elev: vec![9.0, 2.0, 2.0, 2.0, 9.0],
            top_labels: vec![1, 1, 1, 1, 1],
            bot_labels: vec![1, 2, 2, 2, 1],
            graph: upper_graph,
        };

        let mut lower_graph = LabelGraph::new();
        lower_graph.link(EXTERIOR_LABEL, 2, 9.0);
        let lower = StripBoundary {
            top_elev: vec![9.0, 2.0, 2.0, 2.0, 9.0],
            bot_elev: vec![9.0; 5],
            top_labels: vec![1, 2, 2, 2, 1],
            bot_labels: vec![1, 1, 1, 1, 1],
            graph: lower_graph,
        };

        vec![upper, lower]
    }

    #[test]
    fn test_renumber_disjoint_and_seam_stitched() {
        let mut strips = straddling_pit_strips();
        let merged = merge_boundaries(&mut strips, 5, ND).unwrap();

        assert_eq!(merged.strip_offsets, vec![0, 2]);
        // Upper strip's basin stays 2, lower strip's becomes 4
        assert_eq!(merged.master.weight(EXTERIOR_LABEL, 2), Some(9.0));
        assert_eq!(merged.master.weight(EXTERIOR_LABEL, 4), Some(9.0));
        // The seam connects the two halves of the pit at their own level
        assert_eq!(merged.master.weight(2, 4), Some(2.0));

        assert_eq!(strips[1].top_labels, vec![1, 4, 4, 4, 1]);
        assert_eq!(merged.label_to_strip.get(&2), Some(&0));
        assert_eq!(merged.label_to_strip.get(&4), Some(&1));
    }

    #[test]
    fn test_renumbering_is_reversible() {
        let mut strips = straddling_pit_strips();
        let merged = merge_boundaries(&mut strips, 5, ND).unwrap();

        assert_eq!(merged.to_local(2), Some((0, 2)));
        assert_eq!(merged.to_local(4), Some((1, 2)));
        assert_eq!(merged.to_local(EXTERIOR_LABEL), None);
        assert_eq!(merged.to_local(99), None);
    }

    #[test]
    fn test_empty_graph_strip_does_not_collapse_namespace() {
        // A strip whose graph is empty still owns the labels on its rows;
        // the next strip must not reuse them
        let upper = StripBoundary {
            top_elev: vec![5.0; 3],
            bot_elev: vec![5.0; 3],
            top_labels: vec![1, 1, 1],
            bot_labels: vec![1, 2, 1],
            graph: LabelGraph::new(),
        };
        let lower = StripBoundary {
            top_elev: vec![5.0; 3],
            bot_elev: vec![5.0; 3],
            top_labels: vec![1, 2, 1],
            bot_labels: vec![1, 1, 1],
            graph: LabelGraph::new(),
        };
        let mut strips = vec![upper, lower];
        let merged = merge_boundaries(&mut strips, 3, ND).unwrap();

        assert_eq!(strips[0].bot_labels, vec![1, 2, 1]);
        assert_eq!(strips[1].top_labels, vec![1, 4, 1]);
        assert_eq!(merged.label_to_strip.get(&2), Some(&0));
        assert_eq!(merged.label_to_strip.get(&4), Some(&1));
    }

    #[test]
    fn test_seam_nodata_acts_as_exterior() {
        // The hole on the seam row (label 1, sentinel elevation) lets the
        // lower strip's basin drain out at the basin's own elevation
        let upper = StripBoundary {
            top_elev: vec![5.0; 3],
            bot_elev: vec![5.0, ND, 5.0],
            top_labels: vec![1, 1, 1],
            bot_labels: vec![1, 1, 1],
            graph: LabelGraph::new(),
        };
        let lower = StripBoundary {
            top_elev: vec![ND, 4.0, ND],
            bot_elev: vec![5.0; 3],
            top_labels: vec![1, 2, 1],
            bot_labels: vec![1, 1, 1],
            graph: LabelGraph::new(),
        };
        let mut strips = vec![upper, lower];
        let merged = merge_boundaries(&mut strips, 3, ND).unwrap();

        // The upper strip owns no labels above the exterior, so the lower
        // strip's label 2 keeps its number. Candidate weights: max(5, 4)
        // over the real corner pairs, but 4.0 straight through the hole.
        assert_eq!(merged.strip_offsets, vec![0, 0]);
        assert_eq!(merged.master.weight(1, 2), Some(4.0));
        assert_eq!(merged.master.num_edges(), 1);
    }

    #[test]
    fn test_unlabeled_boundary_row_is_fatal() {
        let strip = StripBoundary {
            top_elev: vec![5.0; 2],
            bot_elev: vec![5.0; 2],
            top_labels: vec![1, 0],
            bot_labels: vec![1, 1],
            graph: LabelGraph::new(),
        };
        let mut strips = vec![strip];
        assert!(matches!(
            merge_boundaries(&mut strips, 2, ND),
            Err(Error::Invariant(_))
        ));
    }

    #[test]
    fn test_row_length_mismatch_is_fatal() {
        let strip = StripBoundary {
            top_elev: vec![5.0; 3],
            bot_elev: vec![5.0; 2],
            top_labels: vec![1, 1],
            bot_labels: vec![1, 1],
            graph: LabelGraph::new(),
        };
        let mut strips = vec![strip];
        assert!(matches!(
            merge_boundaries(&mut strips, 2, ND),
            Err(Error::Invariant(_))
        ));
    }
}
