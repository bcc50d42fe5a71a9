// src/models/core.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Classification of where a record came from. Primary rows are extracted
/// straight from fund spreadsheets; derived rows come from supplementary
/// enrichment (brand suggestions, additional locations) and never outrank
/// primary data during merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Primary,
    Derived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Paraclinical,
    Recovery,
    Clinic,
    Dental,
    Pharmacy,
    Other,
}

impl ServiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Paraclinical => "paraclinical",
            ServiceCategory::Recovery => "recovery",
            ServiceCategory::Clinic => "clinic",
            ServiceCategory::Dental => "dental",
            ServiceCategory::Pharmacy => "pharmacy",
            ServiceCategory::Other => "other",
        }
    }
}

/// One row extracted from a source file. Ephemeral: produced per parse run,
/// resolved into organizations/locations, never persisted as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub raw_name: String,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    pub category: ServiceCategory,
    pub source_file: String,
    pub source_date: NaiveDate,
    pub source_kind: SourceKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceProvenance {
    pub source_file: String,
    pub source_date: NaiveDate,
    pub kind: SourceKind,
}

/// Resolved legal entity holding a reimbursement contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub legal_name: String,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub brand_name: Option<String>,
    pub category: ServiceCategory,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub sources: Vec<SourceProvenance>,
}

impl Organization {
    pub fn has_primary_source(&self) -> bool {
        self.sources.iter().any(|s| s.kind == SourceKind::Primary)
    }
}

/// One physical address operated by an Organization. Within one
/// organization no two locations may share the same normalized address key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub organization_id: String,
    pub raw_address: String,
    #[serde(default)]
    pub address_key: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// 0-100; primary-source locations start higher than derived ones.
    pub confidence: u8,
    pub source_kind: SourceKind,
}

/// One (provider, year, month, service type) observation. Immutable once
/// recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalFundRecord {
    #[serde(default)]
    pub provider_tax_id: Option<String>,
    pub provider_name: String,
    pub year: i32,
    pub month: u32,
    pub category: ServiceCategory,
    pub allocated: f64,
    #[serde(default)]
    pub consumed: Option<f64>,
}

impl HistoricalFundRecord {
    /// consumed / allocated, when both are usable.
    pub fn consumption_rate(&self) -> Option<f64> {
        match self.consumed {
            Some(consumed) if self.allocated > 0.0 => Some(consumed / self.allocated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

/// Statistical profile of a provider's historical fund consumption.
/// Derived cache: rebuilt wholesale by the training step, never hand-edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumptionPattern {
    pub provider_key: String,
    pub avg_consumption_rate: f64,
    pub stddev_rate: f64,
    /// Mean rate per calendar month (index 0 = January); months without
    /// observations hold the overall average.
    pub monthly_pattern: [f64; 12],
    /// Day-of-month -> expected cumulative fraction consumed (index 0 = day 1).
    pub depletion_curve: [f64; 31],
    /// Share of observed months exceeding 90% consumption.
    pub early_depletion_frequency: f64,
    pub typical_depletion_day: u8,
    pub record_count: usize,
    pub period_start: YearMonth,
    pub period_end: YearMonth,
}

impl ConsumptionPattern {
    /// Neutral profile used when a provider has no stored pattern: linear
    /// depletion reaching full consumption at day 30.
    pub fn global_fallback() -> Self {
        let mut curve = [0.0; 31];
        for (i, slot) in curve.iter_mut().enumerate() {
            *slot = ((i as f64 + 1.0) / 30.0).min(1.0);
        }
        ConsumptionPattern {
            provider_key: String::new(),
            avg_consumption_rate: 1.0,
            stddev_rate: 0.0,
            monthly_pattern: [1.0; 12],
            depletion_curve: curve,
            early_depletion_frequency: 0.0,
            typical_depletion_day: 30,
            record_count: 0,
            period_start: YearMonth { year: 0, month: 1 },
            period_end: YearMonth { year: 0, month: 1 },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    FundsAvailable,
    FundsExhausted,
    Other,
}

/// Crowd observation tied to a location. Immutable; only ever aggregated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserReport {
    pub location_id: String,
    pub report_type: ReportType,
    pub reported_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }
}

/// Predictor output. Computed on demand, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityStatus {
    pub risk: RiskTier,
    pub probability: f64,
    /// 0-100.
    pub confidence: u8,
    pub allocated: f64,
    pub predicted_consumed: f64,
    pub predicted_available: f64,
    pub day_of_month: u8,
    #[serde(default)]
    pub predicted_depletion: Option<NaiveDate>,
    /// Timestamp of the most relevant (most recent) crowd report considered.
    #[serde(default)]
    pub latest_report: Option<DateTime<Utc>>,
    pub message: String,
}
