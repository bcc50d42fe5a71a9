// src/prediction/predictor.rs
//! Online fund-availability estimator. Best effort by design: missing
//! history or missing reports lower confidence and fall back to defaults,
//! they never block a result.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use log::debug;

use crate::config::HeuristicConfig;
use crate::models::core::{
    AvailabilityStatus, ConsumptionPattern, ReportType, RiskTier, ServiceCategory, UserReport,
};

const CONFIDENCE_BASE: u32 = 30;
const CONFIDENCE_RICH_HISTORY: u32 = 30; // >= 24 observations
const CONFIDENCE_FAIR_HISTORY: u32 = 20; // >= 12
const CONFIDENCE_THIN_HISTORY: u32 = 10; // >= 6
const CONFIDENCE_FRESH_REPORT: u32 = 15;
const CONFIDENCE_CAP: u32 = 95;

const REPORT_DECAY_HOURS: f64 = 24.0;
const FRESH_REPORT_HOURS: f64 = 24.0;
const AVAILABLE_REPORT_WEIGHT: f64 = 0.2;
// Negative reports count double: false reassurance costs the patient a trip.
const EXHAUSTED_REPORT_WEIGHT: f64 = 0.4;

const HIGH_RISK_PROBABILITY: f64 = 0.3;
const LATE_MONTH_PROBABILITY: f64 = 0.5;
const MEDIUM_RISK_PROBABILITY: f64 = 0.6;
const LATE_MONTH_DAY: u32 = 20;
const EARLY_DEPLETION_ALERT_FREQUENCY: f64 = 0.5;
const EARLY_DEPLETION_HIGH_DAY: u32 = 15;
const EARLY_DEPLETION_MEDIUM_DAY: u32 = 10;

#[derive(Debug, Clone)]
pub struct AvailabilityInput<'a> {
    pub provider_key: String,
    pub category: ServiceCategory,
    pub now: DateTime<Utc>,
    pub allocated: f64,
    /// Pre-filtered by the caller to the last 48 hours.
    pub reports: &'a [UserReport],
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let first_of_next = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    };
    first_of_next
        .and_then(|d| d.pred_opt())
        .unwrap_or(date)
}

struct ReportsSummary {
    adjustment: f64,
    latest: Option<DateTime<Utc>>,
    has_fresh: bool,
}

/// Time-decayed aggregation of crowd reports: each report weighs
/// `exp(-hoursAgo / 24)`; availability reports push up, exhaustion reports
/// push down twice as hard; the result is the weighted mean contribution.
fn summarize_reports(reports: &[UserReport], now: DateTime<Utc>) -> ReportsSummary {
    let mut numerator = 0.0;
    let mut weight_sum = 0.0;
    let mut latest: Option<DateTime<Utc>> = None;
    let mut has_fresh = false;

    for report in reports {
        let hours_ago = (now - report.reported_at).num_minutes().max(0) as f64 / 60.0;
        if hours_ago <= FRESH_REPORT_HOURS {
            has_fresh = true;
        }
        let weight = (-hours_ago / REPORT_DECAY_HOURS).exp();
        match report.report_type {
            ReportType::FundsAvailable => {
                numerator += AVAILABLE_REPORT_WEIGHT * weight;
                weight_sum += weight;
            }
            ReportType::FundsExhausted => {
                numerator -= EXHAUSTED_REPORT_WEIGHT * weight;
                weight_sum += weight;
            }
            ReportType::Other => continue,
        }
        if latest.map_or(true, |t| report.reported_at > t) {
            latest = Some(report.reported_at);
        }
    }

    ReportsSummary {
        adjustment: if weight_sum > 0.0 {
            numerator / weight_sum
        } else {
            0.0
        },
        latest,
        has_fresh,
    }
}

fn confidence(pattern: Option<&ConsumptionPattern>, has_fresh_report: bool) -> u8 {
    let mut value = CONFIDENCE_BASE;
    let record_count = pattern.map_or(0, |p| p.record_count);
    if record_count >= 24 {
        value += CONFIDENCE_RICH_HISTORY;
    } else if record_count >= 12 {
        value += CONFIDENCE_FAIR_HISTORY;
    } else if record_count >= 6 {
        value += CONFIDENCE_THIN_HISTORY;
    }
    if has_fresh_report {
        value += CONFIDENCE_FRESH_REPORT;
    }
    value.min(CONFIDENCE_CAP) as u8
}

fn risk_tier(probability: f64, day: u32, early_depletion_frequency: f64) -> RiskTier {
    let mut risk = if probability < HIGH_RISK_PROBABILITY {
        RiskTier::High
    } else if probability < LATE_MONTH_PROBABILITY && day > LATE_MONTH_DAY {
        RiskTier::High
    } else if probability < MEDIUM_RISK_PROBABILITY {
        RiskTier::Medium
    } else {
        RiskTier::Low
    };
    if early_depletion_frequency > EARLY_DEPLETION_ALERT_FREQUENCY {
        if day > EARLY_DEPLETION_HIGH_DAY {
            risk = RiskTier::High;
        } else if day > EARLY_DEPLETION_MEDIUM_DAY {
            risk = risk.max(RiskTier::Medium);
        }
    }
    risk
}

fn predicted_depletion(
    now: DateTime<Utc>,
    consumed_fraction: f64,
    daily_rate: f64,
) -> Option<NaiveDate> {
    if daily_rate <= 0.0 {
        return None;
    }
    let remaining_fraction = (1.0 - consumed_fraction).max(0.0);
    let days_needed = (remaining_fraction / daily_rate).ceil() as i64;
    let today = now.date_naive();
    let depletion = today + Duration::days(days_needed);
    if depletion > last_day_of_month(today) {
        None
    } else {
        Some(depletion)
    }
}

fn build_message(
    risk: RiskTier,
    probability: f64,
    day: u32,
    depletion: Option<NaiveDate>,
) -> String {
    let pct = (probability * 100.0).round() as u32;
    let depletion_note = depletion
        .map(|d| format!(" Epuizare estimata in jurul datei de {}.", d.format("%d.%m.%Y")))
        .unwrap_or_default();
    match risk {
        RiskTier::Low => format!(
            "Fonduri probabil disponibile: {}% sanse in ziua {} a lunii.",
            pct, day
        ),
        RiskTier::Medium => format!(
            "Fondurile ar putea fi limitate: {}% sanse in ziua {} a lunii.{}",
            pct, day, depletion_note
        ),
        RiskTier::High => format!(
            "Fonduri probabil epuizate sau aproape epuizate: {}% sanse in ziua {} a lunii.{}",
            pct, day, depletion_note
        ),
    }
}

/// Estimate fund availability for one provider on one day. Always returns a
/// fully defined status: an absent pattern swaps in the global linear
/// fallback, an empty report list contributes nothing, and zero allocation
/// short-circuits the ratio math.
pub fn predict_availability(
    input: &AvailabilityInput,
    pattern: Option<&ConsumptionPattern>,
    cfg: &HeuristicConfig,
) -> AvailabilityStatus {
    let fallback = ConsumptionPattern::global_fallback();
    let profile = pattern.unwrap_or(&fallback);
    if pattern.is_none() {
        debug!(
            "provider '{}' has no stored pattern; using global fallback",
            input.provider_key
        );
    }

    let day = input.now.day();
    let expected_rate = profile
        .depletion_curve
        .get(day as usize - 1)
        .copied()
        .unwrap_or(day as f64 / 30.0);
    let multiplier = cfg.seasonal.multiplier(input.category, input.now.month());
    let adjusted_rate = (expected_rate * multiplier).clamp(0.0, 1.0);

    let (predicted_consumed, predicted_available, remaining_ratio) = if input.allocated > 0.0 {
        let consumed = input.allocated * adjusted_rate;
        (consumed, input.allocated - consumed, 1.0 - adjusted_rate)
    } else {
        (0.0, 0.0, 0.0)
    };

    let reports = summarize_reports(input.reports, input.now);
    let probability = (remaining_ratio + reports.adjustment).clamp(0.0, 1.0);

    let risk = risk_tier(probability, day, profile.early_depletion_frequency);
    let daily_rate = profile.avg_consumption_rate / 30.0 * multiplier;
    let depletion = predicted_depletion(input.now, adjusted_rate, daily_rate);
    let message = build_message(risk, probability, day, depletion);

    AvailabilityStatus {
        risk,
        probability,
        confidence: confidence(pattern, reports.has_fresh),
        allocated: input.allocated.max(0.0),
        predicted_consumed,
        predicted_available,
        day_of_month: day as u8,
        predicted_depletion: depletion,
        latest_report: reports.latest,
        message,
    }
}
