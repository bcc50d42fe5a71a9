// src/prediction/mod.rs
pub mod patterns;
pub mod predictor;

pub use patterns::{build_consumption_patterns, provider_key};
pub use predictor::{predict_availability, AvailabilityInput};
