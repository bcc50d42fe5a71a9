// src/prediction/patterns.rs
//! Offline training step: aggregate historical monthly fund records into one
//! statistical profile per provider. Profiles are a derived cache and are
//! rebuilt wholesale on every run.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::config::HeuristicConfig;
use crate::matching::{self, name};
use crate::models::core::{ConsumptionPattern, HistoricalFundRecord, YearMonth};

/// Grouping key for historical records: fiscal id when present, normalized
/// legal name otherwise, so small cabinets without ids in old sheets still
/// accumulate a profile.
pub fn provider_key(record: &HistoricalFundRecord, cfg: &HeuristicConfig) -> String {
    record
        .provider_tax_id
        .as_deref()
        .and_then(matching::normalize_tax_id)
        .unwrap_or_else(|| name::normalize_name(&record.provider_name, cfg))
}

/// Build one pattern per qualifying provider. Records without a usable
/// consumption rate, or with a rate outside `[0, max_valid_rate]`, are
/// ignored; providers with fewer than `min_records` usable observations get
/// no pattern and fall back to the global default at prediction time.
pub fn build_consumption_patterns(
    records: &[HistoricalFundRecord],
    cfg: &HeuristicConfig,
) -> Vec<ConsumptionPattern> {
    let mut groups: BTreeMap<String, Vec<&HistoricalFundRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(provider_key(record, cfg))
            .or_default()
            .push(record);
    }

    let mut patterns = Vec::new();
    for (key, group) in groups {
        let valid: Vec<(&HistoricalFundRecord, f64)> = group
            .iter()
            .filter_map(|r| {
                r.consumption_rate()
                    .filter(|rate| (0.0..=cfg.pattern_rules.max_valid_rate).contains(rate))
                    .map(|rate| (*r, rate))
            })
            .collect();

        if valid.is_empty() || valid.len() < cfg.pattern_rules.min_records {
            debug!(
                "provider '{}' has {} usable records (minimum {}); no pattern",
                key,
                valid.len(),
                cfg.pattern_rules.min_records
            );
            continue;
        }

        let n = valid.len() as f64;
        let avg_rate = valid.iter().map(|(_, rate)| rate).sum::<f64>() / n;
        let variance = valid
            .iter()
            .map(|(_, rate)| (rate - avg_rate).powi(2))
            .sum::<f64>()
            / n;
        let stddev_rate = variance.sqrt();

        let mut monthly_sum = [0.0f64; 12];
        let mut monthly_count = [0usize; 12];
        for (record, rate) in &valid {
            let idx = (record.month.clamp(1, 12) - 1) as usize;
            monthly_sum[idx] += rate;
            monthly_count[idx] += 1;
        }
        let mut monthly_pattern = [0.0f64; 12];
        for idx in 0..12 {
            monthly_pattern[idx] = if monthly_count[idx] > 0 {
                monthly_sum[idx] / monthly_count[idx] as f64
            } else {
                avg_rate
            };
        }

        // Conservative linear approximation until day-level data exists.
        let mut depletion_curve = [0.0f64; 31];
        for (i, slot) in depletion_curve.iter_mut().enumerate() {
            *slot = (avg_rate / 30.0 * (i as f64 + 1.0)).min(1.0);
        }

        let early_depletion_frequency = valid
            .iter()
            .filter(|(_, rate)| *rate > cfg.pattern_rules.early_depletion_rate)
            .count() as f64
            / n;

        let typical_depletion_day = if avg_rate > 0.0 {
            (30.0 * cfg.pattern_rules.early_depletion_rate / avg_rate)
                .round()
                .clamp(1.0, 30.0) as u8
        } else {
            30
        };

        let mut months: Vec<YearMonth> = valid
            .iter()
            .map(|(r, _)| YearMonth {
                year: r.year,
                month: r.month,
            })
            .collect();
        months.sort();

        patterns.push(ConsumptionPattern {
            provider_key: key,
            avg_consumption_rate: avg_rate,
            stddev_rate,
            monthly_pattern,
            depletion_curve,
            early_depletion_frequency,
            typical_depletion_day,
            record_count: valid.len(),
            period_start: months[0],
            period_end: *months.last().expect("non-empty by min_records gate"),
        });
    }

    info!(
        "Built {} consumption patterns from {} historical records",
        patterns.len(),
        records.len()
    );
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::core::ServiceCategory;

    fn record(month: u32, consumed: Option<f64>) -> HistoricalFundRecord {
        HistoricalFundRecord {
            provider_tax_id: Some("RO7654321".to_string()),
            provider_name: "Clinica Sante SRL".to_string(),
            year: 2024,
            month,
            category: ServiceCategory::Paraclinical,
            allocated: 10_000.0,
            consumed,
        }
    }

    #[test]
    fn fewer_than_six_valid_records_yield_no_pattern() {
        let cfg = HeuristicConfig::default();
        let records: Vec<_> = (1..=5).map(|m| record(m, Some(8_000.0))).collect();
        assert!(build_consumption_patterns(&records, &cfg).is_empty());
    }

    #[test]
    fn records_without_rates_do_not_count_as_valid() {
        let cfg = HeuristicConfig::default();
        let mut records: Vec<_> = (1..=5).map(|m| record(m, Some(8_000.0))).collect();
        records.push(record(6, None));
        // An absurd rate is a data error, not an observation.
        records.push(record(7, Some(50_000.0)));
        assert!(build_consumption_patterns(&records, &cfg).is_empty());
    }

    #[test]
    fn six_valid_records_produce_a_bounded_pattern() {
        let cfg = HeuristicConfig::default();
        let records: Vec<_> = (1..=6).map(|m| record(m, Some(9_000.0))).collect();
        let patterns = build_consumption_patterns(&records, &cfg);
        assert_eq!(patterns.len(), 1);
        let pattern = &patterns[0];
        assert!((0.0..=2.0).contains(&pattern.avg_consumption_rate));
        assert!((pattern.avg_consumption_rate - 0.9).abs() < 1e-9);
        assert_eq!(pattern.record_count, 6);
        assert_eq!(pattern.period_start, YearMonth { year: 2024, month: 1 });
        assert_eq!(pattern.period_end, YearMonth { year: 2024, month: 6 });
        // Grouped under the digits of the fiscal id.
        assert_eq!(pattern.provider_key, "7654321");
    }

    #[test]
    fn months_without_observations_fall_back_to_average() {
        let cfg = HeuristicConfig::default();
        let records: Vec<_> = (1..=6).map(|m| record(m, Some(6_000.0))).collect();
        let patterns = build_consumption_patterns(&records, &cfg);
        let pattern = &patterns[0];
        // December never observed.
        assert!((pattern.monthly_pattern[11] - pattern.avg_consumption_rate).abs() < 1e-9);
        // January observed at its own mean.
        assert!((pattern.monthly_pattern[0] - 0.6).abs() < 1e-9);
    }

    #[test]
    fn early_depletion_frequency_counts_months_over_ninety_percent() {
        let cfg = HeuristicConfig::default();
        let mut records: Vec<_> = (1..=4).map(|m| record(m, Some(9_500.0))).collect();
        records.push(record(5, Some(5_000.0)));
        records.push(record(6, Some(5_000.0)));
        let patterns = build_consumption_patterns(&records, &cfg);
        let pattern = &patterns[0];
        assert!((pattern.early_depletion_frequency - 4.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn typical_depletion_day_follows_average_rate() {
        let cfg = HeuristicConfig::default();
        // avg rate 1.0 -> round(27 / 1.0) = 27.
        let records: Vec<_> = (1..=6).map(|m| record(m, Some(10_000.0))).collect();
        let patterns = build_consumption_patterns(&records, &cfg);
        assert_eq!(patterns[0].typical_depletion_day, 27);

        // Zero consumption never depletes early; day pins to 30.
        let records: Vec<_> = (1..=6).map(|m| record(m, Some(0.0))).collect();
        let patterns = build_consumption_patterns(&records, &cfg);
        assert_eq!(patterns[0].typical_depletion_day, 30);
    }

    #[test]
    fn providers_without_tax_id_group_by_normalized_name() {
        let cfg = HeuristicConfig::default();
        let records: Vec<_> = (1..=6)
            .map(|m| {
                let mut r = record(m, Some(7_000.0));
                r.provider_tax_id = None;
                r.provider_name = if m % 2 == 0 {
                    "Clinica Sante SRL".to_string()
                } else {
                    "CLINICA SANTE S.R.L.".to_string()
                };
                r
            })
            .collect();
        let patterns = build_consumption_patterns(&records, &cfg);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].provider_key, "clinica sante");
    }
}
