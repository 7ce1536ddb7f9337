//! Coordinator side of the pipeline
//!
//! Walks `Init -> ReceiveAll -> Renumber -> StitchSeams -> SolveGlobal ->
//! Distribute -> Done`. The receive phase correlates envelopes by
//! (worker, payload kind); everything after it is pure graph work from the
//! algorithms crate.

use crossbeam_channel::{Receiver, Sender};
use stripflood_algorithms::flood::{
    merge_boundaries, partition_spills, solve_spills, LabelGraph, SpillMap, StripBoundary,
};
use stripflood_core::{Error, Result};
use tracing::{debug, info};

use crate::messages::{Payload, Upload};

/// Run the coordinator to completion.
pub fn run_coordinator(
    strip_count: usize,
    width: usize,
    nodata: f32,
    inbox: &Receiver<Upload>,
    spill_outs: &[Sender<SpillMap>],
) -> Result<()> {
    let mut boundaries = receive_boundaries(strip_count, inbox)?;

    info!(strips = strip_count, "merging strip graphs");
    let merged = merge_boundaries(&mut boundaries, width, nodata)?;

    info!(
        labels = merged.label_to_strip.len(),
        edges = merged.master.num_edges(),
        "solving global spill elevations"
    );
    let spills = solve_spills(&merged.master);
    let per_strip = partition_spills(&spills, &merged, strip_count)?;

    for (index, (out, map)) in spill_outs.iter().zip(per_strip).enumerate() {
        debug!(strip = index, labels = map.len(), "distributing spills");
        out.send(map).map_err(|_| Error::Worker {
            index,
            message: "spill channel closed before distribution".to_string(),
        })?;
    }

    Ok(())
}

/// Boundary data of one strip as it arrives, field by field.
#[derive(Default)]
struct PartialBoundary {
    top_elev: Option<Vec<f32>>,
    bot_elev: Option<Vec<f32>>,
    top_labels: Option<Vec<u32>>,
    bot_labels: Option<Vec<u32>>,
    graph: Option<LabelGraph>,
}

impl PartialBoundary {
    fn store(&mut self, worker: usize, payload: Payload) -> Result<()> {
        let kind = payload.kind();
        let duplicate = match payload {
            Payload::TopElevations(row) => self.top_elev.replace(row).is_some(),
            Payload::BotElevations(row) => self.bot_elev.replace(row).is_some(),
            Payload::TopLabels(row) => self.top_labels.replace(row).is_some(),
            Payload::BotLabels(row) => self.bot_labels.replace(row).is_some(),
            Payload::Graph(graph) => self.graph.replace(graph).is_some(),
        };
        if duplicate {
            return Err(Error::Invariant(format!(
                "worker {} sent duplicate {}",
                worker, kind
            )));
        }
        Ok(())
    }

    fn complete(self, worker: usize) -> Result<StripBoundary> {
        let missing = |what: &str| Error::Invariant(format!("worker {} never sent {}", worker, what));
        Ok(StripBoundary {
            top_elev: self.top_elev.ok_or_else(|| missing("top elevations"))?,
            bot_elev: self.bot_elev.ok_or_else(|| missing("bottom elevations"))?,
            top_labels: self.top_labels.ok_or_else(|| missing("top labels"))?,
            bot_labels: self.bot_labels.ok_or_else(|| missing("bottom labels"))?,
            graph: self.graph.ok_or_else(|| missing("graph"))?,
        })
    }
}

fn receive_boundaries(
    strip_count: usize,
    inbox: &Receiver<Upload>,
) -> Result<Vec<StripBoundary>> {
    let mut partials: Vec<PartialBoundary> =
        (0..strip_count).map(|_| PartialBoundary::default()).collect();
    let mut remaining = strip_count * 5;

    while remaining > 0 {
        match inbox.recv() {
            Ok(Upload::Data(envelope)) => {
                let worker = envelope.worker;
                let partial = partials.get_mut(worker).ok_or_else(|| {
                    Error::Invariant(format!(
                        "envelope from worker {} but only {} strips exist",
                        worker, strip_count
                    ))
                })?;
                partial.store(worker, envelope.payload)?;
                remaining -= 1;
            }
            Ok(Upload::Fatal { worker, message }) => {
                return Err(Error::Worker {
                    index: worker,
                    message,
                })
            }
            Err(_) => {
                return Err(Error::Invariant(
                    "boundary channel closed before all strips reported".to_string(),
                ))
            }
        }
    }

    partials
        .into_iter()
        .enumerate()
        .map(|(worker, partial)| partial.complete(worker))
        .collect()
}
