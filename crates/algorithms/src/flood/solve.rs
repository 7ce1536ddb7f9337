//! Global spill-elevation solver
//!
//! A priority-flood over the master label graph instead of a grid: starting
//! from the exterior at negative infinity, labels are settled in order of
//! the lowest elevation over which water from the exterior can reach them.
//! Each label's spill is therefore the min-max path weight back to the
//! exterior, the level its basin fills to before draining off the raster.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::collections::BTreeMap;
use stripflood_core::{Error, Result};

use super::graph::{Label, LabelGraph, EXTERIOR_LABEL};
use super::merge::MergedGraph;

/// Spill elevation per label
pub type SpillMap = BTreeMap<Label, f32>;

#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    z: f32,
    label: Label,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reverse ordering for a min-heap; ties break on the label for
// reproducibility
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .z
            .total_cmp(&self.z)
            .then_with(|| other.label.cmp(&self.label))
    }
}

/// Solve spill elevations for every label reachable from the exterior.
///
/// The exterior itself gets the negative-infinity sentinel. Labels with no
/// path to the exterior are absent from the result.
pub fn solve_spills(master: &LabelGraph) -> SpillMap {
    let mut open = BinaryHeap::new();
    let mut spills = SpillMap::new();

    open.push(QueueEntry {
        z: f32::NEG_INFINITY,
        label: EXTERIOR_LABEL,
    });

    while let Some(QueueEntry { z, label }) = open.pop() {
        if spills.contains_key(&label) {
            continue;
        }
        spills.insert(label, z);

        for (neighbor, weight) in master.neighbors(label) {
            if !spills.contains_key(&neighbor) {
                open.push(QueueEntry {
                    z: z.max(weight),
                    label: neighbor,
                });
            }
        }
    }

    spills
}

/// Split the global spill map into per-strip maps keyed by each strip's
/// local labels.
///
/// The exterior label is omitted: its spill is the sentinel and cells that
/// carry it need no raise. Every other solved label must be owned by
/// exactly one strip.
pub fn partition_spills(
    spills: &SpillMap,
    merged: &MergedGraph,
    strip_count: usize,
) -> Result<Vec<SpillMap>> {
    let mut per_strip = vec![SpillMap::new(); strip_count];

    for (&label, &elevation) in spills {
        if label == EXTERIOR_LABEL {
            continue;
        }
        let (strip, local) = merged.to_local(label).ok_or_else(|| {
            Error::Invariant(format!("solved label {} is not owned by any strip", label))
        })?;
        if strip >= strip_count {
            return Err(Error::Invariant(format!(
                "label {} claims strip {} of {}",
                label, strip, strip_count
            )));
        }
        per_strip[strip].insert(local, elevation);
    }

    Ok(per_strip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_spill_is_min_max_path() {
        // Two routes from the exterior to label 3: direct over 9.0, or
        // through label 2 over max(5.0, 3.0) = 5.0. The lower route wins.
        let mut master = LabelGraph::new();
        master.link(EXTERIOR_LABEL, 2, 5.0);
        master.link(2, 3, 3.0);
        master.link(EXTERIOR_LABEL, 3, 9.0);

        let spills = solve_spills(&master);

        assert_eq!(spills.get(&EXTERIOR_LABEL), Some(&f32::NEG_INFINITY));
        assert_eq!(spills.get(&2), Some(&5.0));
        assert_eq!(spills.get(&3), Some(&5.0));
    }

    #[test]
    fn test_deeper_basin_chain() {
        // A chain of basins behind ever-higher rims: each one spills at the
        // highest rim between it and the exterior
        let mut master = LabelGraph::new();
        master.link(EXTERIOR_LABEL, 2, 4.0);
        master.link(2, 3, 6.0);
        master.link(3, 4, 2.0);

        let spills = solve_spills(&master);

        assert_eq!(spills.get(&2), Some(&4.0));
        assert_eq!(spills.get(&3), Some(&6.0));
        assert_eq!(spills.get(&4), Some(&6.0));
    }

    #[test]
    fn test_unreachable_label_absent() {
        let mut master = LabelGraph::new();
        master.link(EXTERIOR_LABEL, 2, 4.0);
        master.link(7, 8, 1.0);

        let spills = solve_spills(&master);

        assert!(spills.contains_key(&2));
        assert!(!spills.contains_key(&7));
        assert!(!spills.contains_key(&8));
    }

    #[test]
    fn test_partition_maps_back_to_local_labels() {
        let mut master = LabelGraph::new();
        master.link(EXTERIOR_LABEL, 2, 9.0);
        master.link(EXTERIOR_LABEL, 4, 9.0);
        master.link(2, 4, 2.0);

        let merged = MergedGraph {
            master,
            label_to_strip: BTreeMap::from([(2, 0), (4, 1)]),
            strip_offsets: vec![0, 2],
        };

        let spills = solve_spills(&merged.master);
        let per_strip = partition_spills(&spills, &merged, 2).unwrap();

        assert_eq!(per_strip[0].get(&2), Some(&9.0));
        assert_eq!(per_strip[1].get(&2), Some(&9.0));
        assert!(!per_strip[0].contains_key(&EXTERIOR_LABEL));
        assert!(!per_strip[1].contains_key(&EXTERIOR_LABEL));
    }

    #[test]
    fn test_partition_rejects_unowned_label() {
        let mut master = LabelGraph::new();
        master.link(EXTERIOR_LABEL, 2, 9.0);

        let merged = MergedGraph {
            master: master.clone(),
            label_to_strip: BTreeMap::new(),
            strip_offsets: vec![0],
        };

        let spills = solve_spills(&master);
        assert!(matches!(
            partition_spills(&spills, &merged, 1),
            Err(Error::Invariant(_))
        ));
    }
}
