//! GridGuard - Grid Telemetry & Predictive-Risk Pipeline
//!
//! Runs the batch pipeline end to end: registry build → telemetry simulation
//! → preprocessing → feature engineering → stratified sampling, exporting the
//! three interface tables (raw telemetry, equipment locations, features) plus
//! the bounded sample for interactive consumption.
//!
//! # Usage
//!
//! ```bash
//! # Full pipeline with built-in defaults (5 substations, 2 years)
//! gridguard --output-dir data
//!
//! # Custom config, overridden seed, JSON telemetry rows
//! GRIDGUARD_CONFIG=fleet.toml gridguard --seed 7 --format json
//!
//! # Full-scale generation: stream raw telemetry only, week-sized chunks
//! gridguard --telemetry-only
//! ```
//!
//! # Environment Variables
//!
//! - `GRIDGUARD_CONFIG`: Path to pipeline TOML config
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

use gridguard::config::PipelineConfig;
use gridguard::features::FeatureEngine;
use gridguard::preprocess::Preprocessor;
use gridguard::registry::EquipmentRegistry;
use gridguard::sampler::StratifiedSampler;
use gridguard::simulator::TelemetrySimulator;
use gridguard::tables;
use gridguard::types::RawTelemetryRecord;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "gridguard")]
#[command(about = "Power-grid telemetry simulation and predictive-risk pipeline")]
#[command(version)]
struct CliArgs {
    /// Path to the pipeline TOML config (overrides GRIDGUARD_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the exported tables
    #[arg(short, long, default_value = "data")]
    output_dir: PathBuf,

    /// Telemetry export format: csv or json
    #[arg(short, long, default_value = "csv")]
    format: String,

    /// Override the configured random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the configured stratified sample size
    #[arg(long)]
    sample_rows: Option<usize>,

    /// Generate and stream the raw telemetry table only, in fixed-size time
    /// chunks per unit (for full-scale runs that exceed memory)
    #[arg(long)]
    telemetry_only: bool,

    /// Print the risk distribution summary after feature engineering
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();

    // Resolve configuration, then apply CLI overrides and re-validate
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load_from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PipelineConfig::load().context("loading pipeline config")?,
    };
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if let Some(rows) = args.sample_rows {
        config.sampler.sample_rows = rows;
    }
    config.validate().context("validating pipeline config")?;

    info!(
        substations = config.fleet.substations,
        units = config.fleet.total_units(),
        horizon_hours = config.simulation.horizon_hours,
        seed = config.simulation.seed,
        "Pipeline configuration resolved"
    );

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating output dir {}", args.output_dir.display()))?;

    let registry = EquipmentRegistry::build(&config).context("building equipment registry")?;
    let simulator = TelemetrySimulator::new(&registry, &config)?;

    // Locations table is cheap and useful in both modes
    let locations_path = args.output_dir.join("equipment_locations.csv");
    let mut locations = BufWriter::new(
        File::create(&locations_path)
            .with_context(|| format!("creating {}", locations_path.display()))?,
    );
    tables::write_locations_csv(&mut locations, &registry)?;
    locations.flush()?;
    info!(path = %locations_path.display(), rows = registry.len(), "Location table written");

    if args.telemetry_only {
        return stream_telemetry(&args, &config, &registry, &simulator);
    }

    // === In-memory pipeline ===
    let records = simulator.simulate();

    let telemetry_path = args
        .output_dir
        .join(format!("grid_telemetry.{}", telemetry_extension(&args.format)));
    let mut telemetry = BufWriter::new(
        File::create(&telemetry_path)
            .with_context(|| format!("creating {}", telemetry_path.display()))?,
    );
    if args.format == "json" {
        tables::write_telemetry_jsonl(&mut telemetry, &records)?;
    } else {
        tables::write_telemetry_csv(&mut telemetry, &records)?;
    }
    telemetry.flush()?;
    info!(path = %telemetry_path.display(), rows = records.len(), "Telemetry table written");

    let raw: Vec<RawTelemetryRecord> = records.into_iter().map(Into::into).collect();
    let outcome = Preprocessor::new(&config.envelope, &config.preprocess).clean(raw);
    let report = &outcome.report;
    info!(
        input = report.input_rows,
        output = report.output_rows,
        duplicates = report.duplicates_removed,
        clipped = report.values_clipped,
        filled = report.nulls_filled,
        dropped = report.rows_dropped,
        excluded_units = report.excluded_units.len(),
        "Preprocessing complete"
    );
    for diagnostic in &report.excluded_units {
        tracing::warn!(
            equipment = %diagnostic.equipment_id,
            issue = %diagnostic.issue,
            "Unit excluded from cleaned batch"
        );
    }

    let engine = FeatureEngine::new(&config, &registry)?;
    let batch = engine.derive(&outcome.records);

    let features_path = args.output_dir.join("features.csv");
    let mut features = BufWriter::new(
        File::create(&features_path)
            .with_context(|| format!("creating {}", features_path.display()))?,
    );
    tables::write_features_csv(&mut features, &batch)?;
    features.flush()?;
    info!(path = %features_path.display(), rows = batch.records.len(), "Feature table written");

    let sample = StratifiedSampler::new(&config.sampler).sample(&batch);
    let sample_path = args.output_dir.join("features_sample.csv");
    let sample_batch = gridguard::features::FeatureBatch {
        records: sample.records,
        schema: batch.schema.clone(),
    };
    let mut sample_file = BufWriter::new(
        File::create(&sample_path)
            .with_context(|| format!("creating {}", sample_path.display()))?,
    );
    tables::write_features_csv(&mut sample_file, &sample_batch)?;
    sample_file.flush()?;
    info!(
        path = %sample_path.display(),
        rows = sample_batch.records.len(),
        requested = sample.report.requested,
        "Stratified sample written"
    );

    if args.stats {
        print_stats(&batch);
    }

    info!("Pipeline complete");
    Ok(())
}

/// Full-scale path: generate and flush fixed-size time-chunks per unit
/// instead of holding the entire horizon in memory.
fn stream_telemetry(
    args: &CliArgs,
    config: &PipelineConfig,
    registry: &EquipmentRegistry,
    simulator: &TelemetrySimulator<'_>,
) -> Result<()> {
    let path = args.output_dir.join("grid_telemetry.csv");
    let mut out =
        BufWriter::new(File::create(&path).with_context(|| format!("creating {}", path.display()))?);
    writeln!(out, "{}", tables::telemetry_header())?;

    let horizon = config.simulation.horizon_hours;
    let chunk = config.simulation.chunk_hours;
    let total = registry.len();
    let progress_step = (total / 10).max(1);
    let mut rows = 0usize;

    info!(units = total, horizon_hours = horizon, chunk_hours = chunk, "Streaming telemetry");

    for (i, unit) in registry.units().iter().enumerate() {
        let mut start = 0u32;
        while start < horizon {
            for record in simulator.simulate_unit_range(unit, start, chunk) {
                tables::write_telemetry_row(&mut out, &record)?;
                rows += 1;
            }
            start = start.saturating_add(chunk);
        }
        if (i + 1) % progress_step == 0 {
            info!(
                progress_percent = (i + 1) * 100 / total,
                units_done = i + 1,
                rows,
                "Streaming progress"
            );
        }
    }

    out.flush()?;
    info!(path = %path.display(), rows, "Telemetry table written");
    Ok(())
}

fn telemetry_extension(format: &str) -> &'static str {
    if format == "json" {
        "jsonl"
    } else {
        "csv"
    }
}

/// Risk distribution summary, mirroring the dashboard's headline numbers.
fn print_stats(batch: &gridguard::features::FeatureBatch) {
    let [low, medium, high] = batch.risk_distribution();
    let total = batch.records.len().max(1);
    let pct = |n: usize| n as f64 * 100.0 / total as f64;

    println!("{}", "=".repeat(60));
    println!("RISK DISTRIBUTION");
    println!("{}", "=".repeat(60));
    println!("  Low    (0): {low:>10}  ({:.1}%)", pct(low));
    println!("  Medium (1): {medium:>10}  ({:.1}%)", pct(medium));
    println!("  High   (2): {high:>10}  ({:.1}%)", pct(high));
    println!("  Failure rows: {high} ({:.2}%)", pct(high));
    println!("{}", "=".repeat(60));
}
