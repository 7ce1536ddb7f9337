//! Label adjacency graph of minimum spill elevations
//!
//! Vertices are watershed labels; an edge (a, b) carries the lowest
//! elevation over which water can pass between cells labeled a and cells
//! labeled b. Insertion is idempotent under the min-weight rule, so
//! duplicate adjacency reports are harmless.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use stripflood_core::{Error, Result};

/// Watershed label. Labels are unique within a strip and, after
/// renumbering, across the whole raster.
pub type Label = u32;

/// The label of the raster exterior. Every cell on the outer boundary of
/// the full DEM belongs to this single shared vertex; fresh labels start
/// right above it.
pub const EXTERIOR_LABEL: Label = 1;

/// Sparse symmetric adjacency map with min-weight edge insertion.
///
/// Serializes as mapping label -> (mapping label -> weight), the wire
/// format used for the boundary exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelGraph {
    adjacency: BTreeMap<Label, BTreeMap<Label, f32>>,
}

impl LabelGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that labels `a` and `b` are adjacent over elevation `weight`.
    ///
    /// Keeps the minimum weight seen for the pair, in both directions.
    /// Self-loops are ignored.
    pub fn link(&mut self, a: Label, b: Label, weight: f32) {
        if a == b {
            return;
        }
        self.insert_directed(a, b, weight);
        self.insert_directed(b, a, weight);
    }

    fn insert_directed(&mut self, from: Label, to: Label, weight: f32) {
        let slot = self.adjacency.entry(from).or_default().entry(to).or_insert(weight);
        if weight < *slot {
            *slot = weight;
        }
    }

    /// Weight of the edge (a, b), if present
    pub fn weight(&self, a: Label, b: Label) -> Option<f32> {
        self.adjacency.get(&a).and_then(|n| n.get(&b)).copied()
    }

    /// Neighbors of a label with edge weights
    pub fn neighbors(&self, label: Label) -> impl Iterator<Item = (Label, f32)> + '_ {
        self.adjacency
            .get(&label)
            .into_iter()
            .flat_map(|n| n.iter().map(|(&l, &w)| (l, w)))
    }

    /// All labels that appear in the graph
    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.adjacency.keys().copied()
    }

    /// All directed entries (each undirected edge appears twice)
    pub fn entries(&self) -> impl Iterator<Item = (Label, Label, f32)> + '_ {
        self.adjacency
            .iter()
            .flat_map(|(&a, n)| n.iter().map(move |(&b, &w)| (a, b, w)))
    }

    /// Number of labels in the graph
    pub fn num_labels(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of undirected edges
    pub fn num_edges(&self) -> usize {
        self.adjacency.values().map(|n| n.len()).sum::<usize>() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Verify symmetry and absence of self-loops.
    pub fn check_symmetry(&self) -> Result<()> {
        for (a, b, w) in self.entries() {
            if a == b {
                return Err(Error::Invariant(format!("label graph self-loop at {}", a)));
            }
            match self.weight(b, a) {
                Some(back) if back.to_bits() == w.to_bits() => {}
                other => {
                    return Err(Error::Invariant(format!(
                        "label graph asymmetry: {}->{} is {:?}, {}->{} is {:?}",
                        a,
                        b,
                        w,
                        b,
                        a,
                        other
                    )))
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_is_symmetric() {
        let mut graph = LabelGraph::new();
        graph.link(1, 2, 4.5);

        assert_eq!(graph.weight(1, 2), Some(4.5));
        assert_eq!(graph.weight(2, 1), Some(4.5));
        graph.check_symmetry().unwrap();
    }

    #[test]
    fn test_duplicate_edges_keep_minimum() {
        // Reports with weights 7 then 5, and 5 then 7, both store 5
        let mut graph = LabelGraph::new();
        graph.link(2, 3, 7.0);
        graph.link(2, 3, 5.0);
        assert_eq!(graph.weight(2, 3), Some(5.0));
        assert_eq!(graph.weight(3, 2), Some(5.0));

        let mut graph = LabelGraph::new();
        graph.link(3, 2, 5.0);
        graph.link(2, 3, 7.0);
        assert_eq!(graph.weight(2, 3), Some(5.0));
        assert_eq!(graph.weight(3, 2), Some(5.0));
    }

    #[test]
    fn test_self_loops_ignored() {
        let mut graph = LabelGraph::new();
        graph.link(4, 4, 1.0);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_neighbors_and_counts() {
        let mut graph = LabelGraph::new();
        graph.link(1, 2, 3.0);
        graph.link(1, 3, 9.0);
        graph.link(2, 3, 6.0);

        assert_eq!(graph.num_labels(), 3);
        assert_eq!(graph.num_edges(), 3);

        let of_one: Vec<_> = graph.neighbors(1).collect();
        assert_eq!(of_one, vec![(2, 3.0), (3, 9.0)]);
        assert_eq!(graph.neighbors(9).count(), 0);
    }

    #[test]
    fn test_wire_format_roundtrip() {
        let mut graph = LabelGraph::new();
        graph.link(1, 2, 10.0);
        graph.link(2, 5, 2.5);

        let json = serde_json::to_string(&graph).unwrap();
        let back: LabelGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back, graph);
        assert_eq!(back.weight(5, 2), Some(2.5));
    }
}
