// src/models/mod.rs
pub mod core;
pub mod matching;

pub use self::core::*;
pub use self::matching::{CandidateKeys, MatchScoreResult, MatchSignal};
