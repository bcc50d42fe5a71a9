// src/config.rs
//! Versioned heuristic configuration for normalization, scoring and
//! prediction. Every locale-specific string table lives here rather than in
//! code so a ruleset change ships as data.

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::models::ServiceCategory;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameRules {
    /// Legal-form markers stripped from the front of a name ("SC Medlife SA").
    pub legal_prefixes: Vec<String>,
    /// Legal-form markers stripped from the end of a name. Never removed from
    /// the middle, so brands containing similar substrings survive intact.
    pub legal_suffixes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneRules {
    /// Country calling code stripped when the number is written
    /// internationally.
    pub country_code: String,
    /// Keys shorter than this are too weak to match on.
    pub min_digits: usize,
}

/// One canonical street-type token and the spellings that collapse into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreetTypeRule {
    pub canonical: String,
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchWeights {
    /// Definitive score returned on a fiscal-id match; short-circuits the
    /// other signals entirely.
    pub tax_id: u32,
    pub email_domain: u32,
    pub phone: u32,
    pub address: u32,
    pub name_exact: u32,
    pub name_similar: u32,
    /// Minimum non-exact name similarity (0-100) that still earns the
    /// name_similar weight.
    pub name_similarity_floor: u8,
    /// Scores at or above this are treated as "same entity".
    pub acceptance_threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfidence {
    pub primary: u8,
    pub derived: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRules {
    /// Providers with fewer valid observations than this get no pattern.
    pub min_records: usize,
    /// Rates above this are treated as data errors, not observations.
    pub max_valid_rate: f64,
    /// A month counts as early-depleted above this consumption rate.
    pub early_depletion_rate: f64,
}

/// Hand-tuned per-category month multipliers applied to the expected
/// consumed fraction. Placeholder curves, not domain truth; replace with
/// fitted values once enough history exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalTables {
    pub paraclinical: [f64; 12],
    pub recovery: [f64; 12],
    pub clinic: [f64; 12],
    pub default: [f64; 12],
}

impl SeasonalTables {
    pub fn multiplier(&self, category: ServiceCategory, month: u32) -> f64 {
        let idx = (month.clamp(1, 12) - 1) as usize;
        match category {
            ServiceCategory::Paraclinical => self.paraclinical[idx],
            ServiceCategory::Recovery => self.recovery[idx],
            ServiceCategory::Clinic => self.clinic[idx],
            _ => self.default[idx],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicConfig {
    pub version: String,
    pub name_rules: NameRules,
    /// Mailbox domains shared by the public; matching on them says nothing
    /// about the organization.
    pub free_mail_domains: Vec<String>,
    pub phone_rules: PhoneRules,
    pub street_types: Vec<StreetTypeRule>,
    pub weights: MatchWeights,
    pub location_confidence: LocationConfidence,
    pub pattern_rules: PatternRules,
    pub seasonal: SeasonalTables,
}

impl HeuristicConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read heuristic config {}", path.display()))?;
        let config: HeuristicConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse heuristic config {}", path.display()))?;
        Ok(config)
    }

    pub fn log_config(&self) {
        info!(
            "Heuristic config v{}: {} legal suffixes, {} free mail domains, {} street types, acceptance threshold {}",
            self.version,
            self.name_rules.legal_suffixes.len(),
            self.free_mail_domains.len(),
            self.street_types.len(),
            self.weights.acceptance_threshold
        );
    }
}

fn street_type(canonical: &str, variants: &[&str]) -> StreetTypeRule {
    StreetTypeRule {
        canonical: canonical.to_string(),
        variants: variants.iter().map(|v| v.to_string()).collect(),
    }
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        HeuristicConfig {
            version: "2024.2-ro".to_string(),
            name_rules: NameRules {
                legal_prefixes: ["sc", "s.c."].iter().map(|s| s.to_string()).collect(),
                legal_suffixes: [
                    "srl-d",
                    "s.r.l.",
                    "s.r.l",
                    "srl",
                    "s.a.",
                    "s.a",
                    "sa",
                    "s.n.c.",
                    "snc",
                    "s.c.s.",
                    "scs",
                    "p.f.a.",
                    "pfa",
                    "c.m.i.",
                    "cmi",
                    "s.c.m.",
                    "scm",
                    "cabinet medical individual",
                    "societate civila medicala",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            },
            free_mail_domains: [
                "gmail.com",
                "googlemail.com",
                "yahoo.com",
                "yahoo.ro",
                "ymail.com",
                "hotmail.com",
                "outlook.com",
                "live.com",
                "icloud.com",
                "me.com",
                "protonmail.com",
                "proton.me",
                "mail.com",
                "mail.ru",
                "aol.com",
                "gmx.com",
                "gmx.de",
                "zoho.com",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            phone_rules: PhoneRules {
                country_code: "40".to_string(),
                min_digits: 6,
            },
            street_types: vec![
                street_type("strada", &["strada", "str", "stra"]),
                street_type(
                    "bulevard",
                    &["bulevard", "bulevardul", "bd", "bdul", "bulev", "blvd", "bul"],
                ),
                street_type("calea", &["calea", "cal"]),
                street_type("sosea", &["sosea", "soseaua", "sos"]),
                street_type("alee", &["alee", "aleea", "al"]),
                street_type("piata", &["piata", "pta"]),
                street_type("drum", &["drum", "drumul"]),
                street_type("splai", &["splai", "splaiul", "spl"]),
                street_type("intrare", &["intrare", "intrarea", "intr"]),
                street_type("fundatura", &["fundatura", "fnd"]),
            ],
            weights: MatchWeights {
                tax_id: 1000,
                email_domain: 30,
                phone: 25,
                address: 20,
                name_exact: 25,
                name_similar: 10,
                name_similarity_floor: 80,
                acceptance_threshold: 40,
            },
            location_confidence: LocationConfidence {
                primary: 90,
                derived: 60,
            },
            pattern_rules: PatternRules {
                min_records: 6,
                max_valid_rate: 2.0,
                early_depletion_rate: 0.9,
            },
            seasonal: SeasonalTables {
                // Paraclinical budgets empty fast after holiday months; December
                // referrals drop.
                paraclinical: [
                    1.10, 1.05, 1.15, 1.05, 1.00, 0.95, 0.90, 0.90, 1.10, 1.15, 1.10, 0.85,
                ],
                recovery: [
                    0.95, 1.00, 1.05, 1.05, 1.10, 1.15, 1.15, 1.10, 1.05, 1.00, 0.95, 0.80,
                ],
                clinic: [
                    1.05, 1.05, 1.10, 1.00, 1.00, 0.95, 0.90, 0.90, 1.05, 1.10, 1.05, 0.90,
                ],
                default: [1.0; 12],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_threshold_sits_between_signals() {
        let cfg = HeuristicConfig::default();
        let w = &cfg.weights;
        // No single weak signal reaches the threshold on its own.
        assert!(w.email_domain < w.acceptance_threshold);
        assert!(w.phone < w.acceptance_threshold);
        assert!(w.address < w.acceptance_threshold);
        assert!(w.name_exact < w.acceptance_threshold);
        // The fiscal-id score dwarfs it.
        assert!(w.tax_id > 10 * w.acceptance_threshold);
    }

    #[test]
    fn seasonal_lookup_falls_back_to_default_curve() {
        let cfg = HeuristicConfig::default();
        assert_eq!(cfg.seasonal.multiplier(ServiceCategory::Dental, 3), 1.0);
        assert!(cfg.seasonal.multiplier(ServiceCategory::Paraclinical, 12) < 1.0);
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = HeuristicConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: HeuristicConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.version, cfg.version);
        assert_eq!(back.weights.acceptance_threshold, cfg.weights.acceptance_threshold);
    }
}
