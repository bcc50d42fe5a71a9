// src/models/matching.rs
use serde::{Deserialize, Serialize};

/// The individual evidence types the scorer can credit. Each signal carries
/// its own weight and suppression rule; evaluation order is fixed in
/// `matching::score_match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSignal {
    TaxId,
    EmailDomain,
    Phone,
    Address,
    NameExact,
    NameSimilar,
}

impl MatchSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSignal::TaxId => "tax_id",
            MatchSignal::EmailDomain => "email_domain",
            MatchSignal::Phone => "phone",
            MatchSignal::Address => "address",
            MatchSignal::NameExact => "name_exact",
            MatchSignal::NameSimilar => "name_similar",
        }
    }
}

/// Precomputed normalized comparison keys for one side of a match. Index
/// entries keep these so repeated scoring never re-normalizes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateKeys {
    #[serde(default)]
    pub tax_id: Option<String>,
    pub name_key: String,
    #[serde(default)]
    pub email_domain: Option<String>,
    #[serde(default)]
    pub phone_key: Option<String>,
    #[serde(default)]
    pub address_key: Option<String>,
}

/// Transient scoring outcome: total of the un-suppressed signal weights plus
/// the human-readable trail used when auditing merge decisions.
#[derive(Debug, Clone)]
pub struct MatchScoreResult {
    pub score: u32,
    pub reasons: Vec<String>,
}

impl MatchScoreResult {
    pub fn none() -> Self {
        MatchScoreResult {
            score: 0,
            reasons: Vec::new(),
        }
    }
}
