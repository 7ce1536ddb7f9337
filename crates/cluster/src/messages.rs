//! Typed messages between workers and the coordinator
//!
//! Each worker uploads exactly five payloads, one per kind, wrapped in
//! envelopes tagged with the worker index. The coordinator correlates
//! messages by (worker, kind); payload order between workers carries no
//! meaning. All payloads are owned values.

use stripflood_algorithms::flood::{Label, LabelGraph};

/// One of the five per-worker boundary payloads.
#[derive(Debug, Clone)]
pub enum Payload {
    TopElevations(Vec<f32>),
    BotElevations(Vec<f32>),
    TopLabels(Vec<Label>),
    BotLabels(Vec<Label>),
    Graph(LabelGraph),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::TopElevations(_) => "top elevations",
            Payload::BotElevations(_) => "bottom elevations",
            Payload::TopLabels(_) => "top labels",
            Payload::BotLabels(_) => "bottom labels",
            Payload::Graph(_) => "graph",
        }
    }
}

/// A boundary payload tagged with its sender.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub worker: usize,
    pub payload: Payload,
}

/// Everything a worker can put on the uplink channel.
///
/// `Fatal` is the in-process stand-in for a worker process aborting: the
/// coordinator stops immediately and tears the remaining channels down,
/// which unblocks the surviving workers.
#[derive(Debug, Clone)]
pub enum Upload {
    Data(Envelope),
    Fatal { worker: usize, message: String },
}
