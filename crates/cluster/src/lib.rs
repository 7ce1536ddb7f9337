//! # Stripflood Cluster
//!
//! The distributed runtime: K workers flood one strip each and exchange
//! boundary data with a coordinator that assembles the global label graph,
//! solves spill elevations, and hands each worker its share back.
//!
//! Workers run as threads connected by typed channels. Each worker's five
//! boundary payloads travel as tagged envelopes on a shared uplink; the
//! coordinator replies on a dedicated channel per worker. The raster-open
//! step is serialized through a token that travels worker 0 -> 1 -> ... ->
//! K-1.

pub mod coordinator;
pub mod messages;
pub mod worker;

use crossbeam_channel::{bounded, unbounded, Sender};
use std::path::PathBuf;
use std::thread;
use stripflood_core::io::dem_metadata;
use stripflood_core::{Error, Result};
use tracing::info;

use crate::coordinator::run_coordinator;
use crate::messages::Upload;
use crate::worker::{run_worker, WorkerChannels, WorkerConfig};

/// Configuration of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Input DEM (single-band Float32 GeoTIFF)
    pub input: PathBuf,
    /// Number of worker strips
    pub workers: usize,
    /// Directory the `output<k>.tif` strips are written into
    pub output_dir: PathBuf,
}

/// Fill the depressions of a DEM with `workers` strips.
///
/// Blocks until every strip is written. The first failure anywhere in the
/// run is returned; surviving workers are unblocked by channel teardown.
pub fn run(config: &PipelineConfig) -> Result<()> {
    if config.workers == 0 {
        return Err(Error::InvalidParameter {
            name: "workers",
            value: "0".to_string(),
            reason: "at least one worker strip is required".to_string(),
        });
    }

    // Probe the input once up front; a missing geotransform or NoData value
    // fails here before any thread is spawned
    let meta = dem_metadata(&config.input)?;
    if config.workers > meta.rows {
        return Err(Error::InvalidParameter {
            name: "workers",
            value: config.workers.to_string(),
            reason: format!("raster has only {} rows", meta.rows),
        });
    }

    info!(
        rows = meta.rows,
        cols = meta.cols,
        workers = config.workers,
        "starting depression fill"
    );

    let (uplink_tx, uplink_rx) = unbounded::<Upload>();

    let mut spill_txs = Vec::with_capacity(config.workers);
    let mut spill_rxs = Vec::with_capacity(config.workers);
    for _ in 0..config.workers {
        let (tx, rx) = bounded(1);
        spill_txs.push(tx);
        spill_rxs.push(rx);
    }

    let token_channels: Vec<_> = (0..config.workers).map(|_| bounded::<()>(1)).collect();
    let token_txs: Vec<Sender<()>> = token_channels.iter().map(|(tx, _)| tx.clone()).collect();
    // Worker 0 may open the raster immediately
    token_channels[0]
        .0
        .send(())
        .map_err(|_| Error::Invariant("raster-open chain broken".to_string()))?;

    let mut handles = Vec::with_capacity(config.workers);
    for (index, ((_, token_rx), spill_rx)) in token_channels
        .into_iter()
        .zip(spill_rxs.into_iter())
        .enumerate()
    {
        let worker_config = WorkerConfig {
            index,
            count: config.workers,
            input: config.input.clone(),
            output_dir: config.output_dir.clone(),
        };
        let channels = WorkerChannels {
            open_token: token_rx,
            next_open_token: token_txs.get(index + 1).cloned(),
            uplink: uplink_tx.clone(),
            spills: spill_rx,
        };
        let handle = thread::Builder::new()
            .name(format!("stripflood-worker-{}", index))
            .spawn(move || run_worker(worker_config, channels))?;
        handles.push(handle);
    }
    // Only worker-held clones may keep the channels alive: a dead worker
    // must be observable as a disconnect
    drop(uplink_tx);
    drop(token_txs);

    let coordinator_result = run_coordinator(
        config.workers,
        meta.cols,
        meta.nodata,
        &uplink_rx,
        &spill_txs,
    );
    // Unblock any worker still waiting on its spill map before joining
    drop(spill_txs);

    let mut worker_result: Result<()> = Ok(());
    for (index, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                if worker_result.is_ok() {
                    worker_result = Err(e);
                }
            }
            Err(_) => {
                if worker_result.is_ok() {
                    worker_result = Err(Error::Worker {
                        index,
                        message: "worker thread panicked".to_string(),
                    });
                }
            }
        }
    }

    coordinator_result.and(worker_result)?;
    info!(workers = config.workers, "depression fill complete");
    Ok(())
}
