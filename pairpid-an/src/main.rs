//! pairpid - detector-response classification and track-pair identification
//!
//! Reads events as JSON lines, classifies every track and opposite-charge
//! pair, and writes the merged aggregates as a single JSON document.

use anyhow::Result;
use clap::Parser;
use pairpid_an::sink::write_result;
use pairpid_an::{Dataset, Engine, JsonLinesSource, Progress};
use pairpid_common::config::{AnalysisConfig, ConfigResolver};
use pairpid_common::time;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for pairpid
#[derive(Parser, Debug)]
#[command(name = "pairpid")]
#[command(about = "Track classification and pair identification over reconstructed events")]
#[command(version)]
struct Args {
    /// Configuration file (overrides PAIRPID_CONFIG and the user config)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input events, one JSON array of tracks per line
    #[arg(short, long)]
    input: PathBuf,

    /// Result file
    #[arg(short, long, default_value = "pairpid-result.json")]
    output: PathBuf,

    /// Worker threads (overrides the configuration)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Dataset selecting the dead-area table (overrides the configuration)
    #[arg(short, long)]
    dataset: Option<String>,

    /// Seconds between progress reports
    #[arg(long, default_value_t = 10)]
    progress_secs: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logging level may come from the config file, so load it first and
    // report the source or any failure once the subscriber is up
    let resolver = ConfigResolver::new(args.config.clone());
    let source_path = resolver.resolve();
    let loaded = resolver.load();
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)),
        )
        .init();

    info!(
        "Starting pairpid v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    match &source_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: compiled defaults"),
    }
    apply_overrides(&mut config, &args);
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    let dataset = match Dataset::resolve(&config.dataset, config.dead_area.table.as_deref()) {
        Ok(dataset) => dataset,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };
    info!(
        "Dataset: {}, threads: {}, shard size: {}",
        dataset,
        config.effective_threads(),
        config.shard_size
    );

    let engine = match Engine::from_config(&config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Failed to build the engine: {}", e);
            return Err(e.into());
        }
    };
    let mut source = match JsonLinesSource::open(&args.input) {
        Ok(source) => source,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };
    info!("Reading events from {}", args.input.display());

    let started = time::now();
    let progress = Progress::new();
    let interval = Duration::from_secs(args.progress_secs.max(1));

    let result = std::thread::scope(|scope| {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let progress = &progress;
        scope.spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    let snapshot = progress.snapshot();
                    info!(
                        "Progress: {} events, {} tracks, {} pairs ({:.1}s)",
                        snapshot.events,
                        snapshot.tracks,
                        snapshot.pairs,
                        time::elapsed_seconds(started, time::now())
                    );
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        let result = engine.run(&mut source, progress);
        let _ = stop_tx.send(());
        result
    });
    let result = match result {
        Ok(result) => result,
        Err(e) => {
            error!("Run aborted: {}", e);
            return Err(e.into());
        }
    };

    info!(
        "Finished in {:.1}s: {}",
        time::elapsed_seconds(started, time::now()),
        result.stats.display_string()
    );

    if let Err(e) = write_result(&args.output, &result, &dataset.to_string()) {
        error!("Failed to write {}: {}", args.output.display(), e);
        return Err(e.into());
    }
    info!("Result written to {}", args.output.display());
    Ok(())
}

fn apply_overrides(config: &mut AnalysisConfig, args: &Args) {
    if let Some(threads) = args.threads {
        config.threads = Some(threads);
    }
    if let Some(dataset) = &args.dataset {
        config.dataset = dataset.clone();
    }
}
