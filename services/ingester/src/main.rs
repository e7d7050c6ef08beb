//! Forecast sample ingester.
//!
//! Walks every (t0, member, fhr) sample of one configured source, assembles
//! it from the archive's GRIB2 files and reports the samples that came back
//! empty so they can be backfilled.

mod report;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use forecast_common::DimensionKey;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ingestion::{GribForecastSource, SourceConfig};
use report::IngestReport;

#[derive(Parser, Debug)]
#[command(name = "ingester")]
#[command(about = "Normalize GRIB2 forecast files into schema-consistent samples")]
struct Args {
    /// Source configuration file (YAML), absolute or relative to the config directory
    #[arg(short, long, env = "SOURCE_CONFIG")]
    config: PathBuf,

    /// Configuration directory (contains reference/reference.<family>.yaml overrides)
    #[arg(long, env = "CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Directory for downloaded files (default: the source's cache_dir)
    #[arg(long, env = "CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Include static variables in every sample, not only the first of each run
    #[arg(long)]
    open_static_vars: bool,

    /// Keep downloaded files after their sample is assembled
    #[arg(long)]
    keep_files: bool,

    /// Stop after this many samples
    #[arg(long)]
    max_samples: Option<usize>,

    /// Write a JSON report of empty samples here
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting forecast ingester");

    // The variable registry looks for reference overrides under CONFIG_DIR.
    std::env::set_var("CONFIG_DIR", &args.config_dir);

    let config_path = config_path(&args.config, &args.config_dir);
    let config = SourceConfig::from_file(&config_path)
        .with_context(|| format!("loading source config {}", config_path.display()))?;
    let cache_dir = args.cache_dir.clone().or_else(|| config.cache_dir.clone());
    if let Some(dir) = &cache_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating cache directory {}", dir.display()))?;
    }

    let source = GribForecastSource::new(config)?;
    info!(
        source = %source.name(),
        family = %source.family(),
        variables = ?source.variables(),
        cache_dir = ?cache_dir,
        "Loaded source"
    );

    let mut keys = source.sample_keys();
    if let Some(max) = args.max_samples {
        keys.truncate(max);
    }

    let mut report = IngestReport::new(source.name());
    for dims in &keys {
        let sample = source.open_sample_dataset(dims, args.open_static_vars, cache_dir.as_deref())?;
        report.record(dims, &sample);

        if let (Some(dir), false) = (&cache_dir, args.keep_files) {
            remove_cached_files(&source, dims, dir);
        }
    }

    info!(
        source = %report.source,
        samples = report.samples,
        assembled = report.assembled,
        empty = report.empty.len(),
        "Ingestion finished"
    );
    if !report.empty.is_empty() {
        warn!(
            t0s = ?report.backfill_t0s(),
            "Some samples could not be assembled and need a backfill"
        );
    }

    if let Some(path) = &args.report {
        report.write(path)?;
        info!(path = %path.display(), "Wrote report");
    }

    Ok(())
}

fn config_path(config: &Path, config_dir: &Path) -> PathBuf {
    if config.is_absolute() || config.exists() {
        config.to_path_buf()
    } else {
        config_dir.join(config)
    }
}

/// Delete the cached copies of a sample's files.
///
/// Only files already in the cache are touched, so a file that was never
/// fetched is not fetched again just to be removed.
fn remove_cached_files(source: &GribForecastSource, dims: &DimensionKey, cache_dir: &Path) {
    for file in source.cached_files(dims, cache_dir) {
        let path = file.path().to_path_buf();
        if let Err(e) = file.remove() {
            warn!(path = %path.display(), error = %e, "Failed to remove cached file");
        }
    }
}
