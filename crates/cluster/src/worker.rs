//! Worker side of the pipeline
//!
//! One worker owns one strip and walks
//! `Init -> OpenRead -> Flood -> UploadBoundary -> AwaitOffsets -> Apply ->
//! Write -> Done`; any failure short-circuits to a fatal upload so the
//! coordinator can tear the run down.

use crossbeam_channel::{Receiver, Sender};
use std::path::PathBuf;
use stripflood_algorithms::flood::{
    apply_spills, flood_strip, SpillMap, StripFlood, StripPosition,
};
use stripflood_core::io::{dem_metadata, read_dem_window, write_dem};
use stripflood_core::{Error, Result};
use tracing::{debug, info};

use crate::messages::{Envelope, Payload, Upload};

/// Static configuration of one worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Strip index, 0 at the top of the raster
    pub index: usize,
    /// Total number of strips
    pub count: usize,
    /// Input DEM path
    pub input: PathBuf,
    /// Directory the strip output is written into
    pub output_dir: PathBuf,
}

/// Channel endpoints handed to one worker.
pub struct WorkerChannels {
    /// Token gating the raster-open step; arrives from the previous worker
    /// (or the launcher, for worker 0)
    pub open_token: Receiver<()>,
    /// Token forward to the next worker, absent on the last one
    pub next_open_token: Option<Sender<()>>,
    /// Uplink to the coordinator
    pub uplink: Sender<Upload>,
    /// Per-label spill elevations, delivered once by the coordinator
    pub spills: Receiver<SpillMap>,
}

/// Run one worker to completion.
///
/// On failure the error is reported on the uplink before returning, so the
/// coordinator never waits for a strip that cannot arrive.
pub fn run_worker(config: WorkerConfig, channels: WorkerChannels) -> Result<()> {
    let result = worker_pass(&config, &channels);
    if let Err(e) = &result {
        let _ = channels.uplink.send(Upload::Fatal {
            worker: config.index,
            message: e.to_string(),
        });
    }
    result
}

fn worker_pass(config: &WorkerConfig, channels: &WorkerChannels) -> Result<()> {
    let position = StripPosition::new(config.index, config.count)?;

    // OpenRead. Opens of the shared input file are serialized through the
    // token chain; the raster layer is not trusted to handle concurrent
    // opens of one file.
    channels
        .open_token
        .recv()
        .map_err(|_| Error::Invariant("raster-open chain broken".to_string()))?;

    let meta = dem_metadata(&config.input)?;
    let (first, last) = position.rows(meta.rows)?;
    debug!(strip = config.index, first, last, "reading strip");
    let mut dem = read_dem_window(&config.input, first, last - first)?;

    if let Some(next) = &channels.next_open_token {
        // The next worker may fail before ever waiting on the token
        let _ = next.send(());
    }

    // Flood
    info!(strip = config.index, "performing priority-flood");
    let StripFlood { labels, graph } = flood_strip(&mut dem, position)?;
    debug!(
        strip = config.index,
        edges = graph.num_edges(),
        "strip flood complete"
    );

    // UploadBoundary: five payloads, one per kind
    let rows = dem.rows();
    let send = |payload: Payload| -> Result<()> {
        channels
            .uplink
            .send(Upload::Data(Envelope {
                worker: config.index,
                payload,
            }))
            .map_err(|_| Error::Invariant("boundary channel closed".to_string()))
    };
    send(Payload::TopElevations(dem.row_vec(0)?))?;
    send(Payload::BotElevations(dem.row_vec(rows - 1)?))?;
    send(Payload::TopLabels(labels.row(0).to_vec()))?;
    send(Payload::BotLabels(labels.row(rows - 1).to_vec()))?;
    send(Payload::Graph(graph))?;

    // AwaitOffsets
    let spills = channels.spills.recv().map_err(|_| {
        Error::Invariant("spill channel closed before distribution".to_string())
    })?;

    // Apply
    apply_spills(&mut dem, &labels, &spills)?;

    // Write. The window raster carries its row anchor, so the output lands
    // at the right georeferenced position.
    let path = config.output_dir.join(format!("output{}.tif", config.index));
    info!(strip = config.index, path = %path.display(), "writing strip");
    write_dem(&dem, &path)?;

    Ok(())
}
