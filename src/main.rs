// src/main.rs
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use directory_lib::models::core::{CandidateRecord, Location, Organization};
use directory_lib::resolution::{EntityIndex, ResolutionStats};
use directory_lib::utils::load_env;
use directory_lib::HeuristicConfig;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

/// Resolve raw provider candidates against the existing directory and emit
/// the deduplicated organization/location set.
#[derive(Parser, Debug)]
#[command(name = "resolve", about = "Entity resolution run over extracted candidate records")]
struct Args {
    /// JSON file with the candidate records extracted from source files.
    candidates: PathBuf,

    /// Heuristic configuration JSON; defaults to the built-in ruleset.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Previously persisted organizations to seed the index with.
    #[arg(long)]
    existing_organizations: Option<PathBuf>,

    /// Previously persisted locations belonging to the seed organizations.
    #[arg(long)]
    existing_locations: Option<PathBuf>,

    #[arg(long, default_value = "organizations.json")]
    out_organizations: PathBuf,

    #[arg(long, default_value = "locations.json")]
    out_locations: PathBuf,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_json<T: serde::Serialize>(path: &PathBuf, value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    fs::write(path, raw).with_context(|| format!("Failed to write {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::init();
    load_env();
    info!("Starting provider entity resolution run");

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => HeuristicConfig::from_path(path)?,
        None => HeuristicConfig::default(),
    };
    config.log_config();

    let candidates: Vec<CandidateRecord> = read_json(&args.candidates)?;
    info!("Loaded {} candidate records", candidates.len());

    let mut index = match (&args.existing_organizations, &args.existing_locations) {
        (Some(orgs_path), locations_path) => {
            let organizations: Vec<Organization> = read_json(orgs_path)?;
            let locations: Vec<Location> = match locations_path {
                Some(path) => read_json(path)?,
                None => Vec::new(),
            };
            EntityIndex::from_records(organizations, locations, &config)
        }
        _ => EntityIndex::new(),
    };

    let progress = ProgressBar::new(candidates.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("█▉▊▋▌▍▎▏  "),
    );
    progress.set_message("Resolving candidates");

    let mut stats = ResolutionStats {
        candidates_in: candidates.len(),
        ..ResolutionStats::default()
    };
    for candidate in candidates {
        index.resolve_one(candidate, &config, &mut stats);
        progress.inc(1);
    }
    progress.finish_with_message("Resolution complete");

    info!(
        "Run complete: {} candidates, {} organizations created, {} merged, {} locations created, {} merged; index now holds {} organizations",
        stats.candidates_in,
        stats.organizations_created,
        stats.organizations_merged,
        stats.locations_created,
        stats.locations_merged,
        index.len()
    );

    write_json(&args.out_organizations, &index.organizations())?;
    write_json(&args.out_locations, &index.locations())?;
    info!(
        "Wrote {} and {}",
        args.out_organizations.display(),
        args.out_locations.display()
    );
    Ok(())
}
