// src/lib.rs
//! Core subsystems of the provider directory: entity resolution over
//! heterogeneous spreadsheet extractions, and fund-availability prediction
//! from historical consumption plus crowd reports. Pure synchronous
//! computation; storage and transport belong to the callers.

pub mod config;
pub mod matching;
pub mod models;
pub mod prediction;
pub mod resolution;
pub mod utils;

pub use config::HeuristicConfig;
pub use prediction::{build_consumption_patterns, predict_availability, AvailabilityInput};
pub use resolution::{resolve_entities, EntityIndex, ResolutionOutcome, ResolutionStats};
