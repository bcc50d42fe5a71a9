// src/bin/build_patterns.rs
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use directory_lib::models::core::HistoricalFundRecord;
use directory_lib::prediction::build_consumption_patterns;
use directory_lib::utils::load_env;
use directory_lib::HeuristicConfig;
use log::info;

/// Offline training step: rebuild every provider consumption pattern from
/// the historical fund records. Output replaces the previous pattern set
/// wholesale.
#[derive(Parser, Debug)]
#[command(name = "build_patterns", about = "Rebuild provider consumption patterns")]
struct Args {
    /// JSON file with the historical fund records.
    records: PathBuf,

    /// Heuristic configuration JSON; defaults to the built-in ruleset.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "patterns.json")]
    out: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    load_env();
    info!("Starting consumption pattern build");

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => HeuristicConfig::from_path(path)?,
        None => HeuristicConfig::default(),
    };
    config.log_config();

    let raw = fs::read_to_string(&args.records)
        .with_context(|| format!("Failed to read {}", args.records.display()))?;
    let records: Vec<HistoricalFundRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", args.records.display()))?;
    info!("Loaded {} historical fund records", records.len());

    let patterns = build_consumption_patterns(&records, &config);

    let out = serde_json::to_string_pretty(&patterns).context("Failed to serialize patterns")?;
    fs::write(&args.out, out)
        .with_context(|| format!("Failed to write {}", args.out.display()))?;
    info!("Wrote {} patterns to {}", patterns.len(), args.out.display());
    Ok(())
}
