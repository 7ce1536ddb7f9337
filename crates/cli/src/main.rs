//! Stripflood CLI - distributed depression filling for large DEMs

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use stripflood_cluster::{run, PipelineConfig};
use stripflood_core::io::dem_metadata;

#[derive(Parser)]
#[command(name = "stripflood")]
#[command(author, version, about = "Distributed depression filling for large DEMs", long_about = None)]
struct Cli {
    /// Input DEM (single-band Float32 GeoTIFF with NoData set)
    input: PathBuf,

    /// Number of worker strips (defaults to the available parallelism)
    #[arg(short = 'n', long)]
    workers: Option<usize>,

    /// Directory the output<k>.tif strips are written into
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let workers = match cli.workers {
        Some(n) => n,
        None => std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
    };

    let meta = dem_metadata(&cli.input)
        .with_context(|| format!("cannot open DEM: {}", cli.input.display()))?;
    info!(
        "Input: {} x {} cells, NoData {}",
        meta.cols, meta.rows, meta.nodata
    );

    let start = Instant::now();
    let pb = spinner("Filling depressions...");
    run(&PipelineConfig {
        input: cli.input.clone(),
        workers,
        output_dir: cli.output_dir.clone(),
    })
    .with_context(|| format!("depression fill failed for {}", cli.input.display()))?;
    pb.finish_and_clear();
    let elapsed = start.elapsed();

    println!(
        "Filled DEM written as {} strip(s) to: {}",
        workers,
        cli.output_dir.display()
    );
    println!("  Processing time: {:.2?}", elapsed);

    Ok(())
}
