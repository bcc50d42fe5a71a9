// src/matching/mod.rs
//! Multi-signal match scoring between an index entry and an incoming
//! candidate. Each signal is a pure evaluator with its own weight and
//! suppression rule; the total score is the sum of the un-suppressed
//! weights.

pub mod address;
pub mod email;
pub mod name;
pub mod phone;

use log::debug;

use crate::config::HeuristicConfig;
use crate::models::core::CandidateRecord;
use crate::models::matching::{CandidateKeys, MatchScoreResult, MatchSignal};

/// Romanian diacritics show up inconsistently across source files; fold them
/// so both spellings land on the same key.
pub(crate) fn fold_diacritics(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'ă' | 'â' => 'a',
            'î' => 'i',
            'ș' | 'ş' => 's',
            'ț' | 'ţ' => 't',
            'Ă' | 'Â' => 'A',
            'Î' => 'I',
            'Ș' | 'Ş' => 'S',
            'Ț' | 'Ţ' => 'T',
            _ => c,
        })
        .collect()
}

/// CUI/CIF values appear with and without the "RO" VAT prefix; compare on
/// digits only.
pub(crate) fn normalize_tax_id(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Precompute every normalized comparison key for one candidate record.
/// Malformed fields degrade to absent keys rather than failing.
pub fn candidate_keys(record: &CandidateRecord, cfg: &HeuristicConfig) -> CandidateKeys {
    CandidateKeys {
        tax_id: record.tax_id.as_deref().and_then(normalize_tax_id),
        name_key: name::normalize_name(&record.raw_name, cfg),
        email_domain: record
            .email
            .as_deref()
            .and_then(|e| email::business_email_domain(e, cfg)),
        phone_key: record
            .phone
            .as_deref()
            .and_then(|p| phone::normalized_phone(p, cfg)),
        address_key: record
            .address
            .as_deref()
            .and_then(|a| address::normalized_address(a, cfg)),
    }
}

struct SignalOutcome {
    signal: MatchSignal,
    weight: u32,
    reason: String,
}

type SignalEvaluator = fn(&CandidateKeys, &CandidateKeys, &HeuristicConfig) -> Option<SignalOutcome>;

/// Evaluation order is part of the contract: the fiscal-id check runs first
/// in `score_match` and short-circuits; the rest accumulate in this order.
const SIGNAL_EVALUATORS: &[SignalEvaluator] = &[
    eval_email_domain,
    eval_phone,
    eval_address,
    eval_name_exact,
    eval_name_similar,
];

fn both_present_and_differ(a: &Option<String>, b: &Option<String>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x != y)
}

fn both_present_and_equal(a: &Option<String>, b: &Option<String>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

fn eval_email_domain(
    entry: &CandidateKeys,
    candidate: &CandidateKeys,
    cfg: &HeuristicConfig,
) -> Option<SignalOutcome> {
    let (Some(a), Some(b)) = (&entry.email_domain, &candidate.email_domain) else {
        return None;
    };
    if a != b {
        return None;
    }
    // The same mailbox domain can legitimately serve several branch
    // addresses; a hard address disagreement wins over the email signal.
    if both_present_and_differ(&entry.address_key, &candidate.address_key) {
        debug!(
            "email domain '{}' matches but address keys differ ({:?} vs {:?}); signal suppressed",
            a, entry.address_key, candidate.address_key
        );
        return Some(SignalOutcome {
            signal: MatchSignal::EmailDomain,
            weight: 0,
            reason: format!("email domain '{}' matches but suppressed by address conflict", a),
        });
    }
    Some(SignalOutcome {
        signal: MatchSignal::EmailDomain,
        weight: cfg.weights.email_domain,
        reason: format!("business email domain '{}' identical", a),
    })
}

fn eval_phone(
    entry: &CandidateKeys,
    candidate: &CandidateKeys,
    cfg: &HeuristicConfig,
) -> Option<SignalOutcome> {
    if !both_present_and_equal(&entry.phone_key, &candidate.phone_key) {
        return None;
    }
    Some(SignalOutcome {
        signal: MatchSignal::Phone,
        weight: cfg.weights.phone,
        reason: format!(
            "phone key '{}' identical",
            entry.phone_key.as_deref().unwrap_or_default()
        ),
    })
}

fn eval_address(
    entry: &CandidateKeys,
    candidate: &CandidateKeys,
    cfg: &HeuristicConfig,
) -> Option<SignalOutcome> {
    if !both_present_and_equal(&entry.address_key, &candidate.address_key) {
        return None;
    }
    Some(SignalOutcome {
        signal: MatchSignal::Address,
        weight: cfg.weights.address,
        reason: format!(
            "address key '{}' identical",
            entry.address_key.as_deref().unwrap_or_default()
        ),
    })
}

fn eval_name_exact(
    entry: &CandidateKeys,
    candidate: &CandidateKeys,
    cfg: &HeuristicConfig,
) -> Option<SignalOutcome> {
    if entry.name_key.is_empty() || entry.name_key != candidate.name_key {
        return None;
    }
    // Same display name under two different mail domains, or at two
    // different addresses with nothing corroborating, reads as two branches
    // rather than one entity.
    if both_present_and_differ(&entry.email_domain, &candidate.email_domain) {
        debug!(
            "name key '{}' identical but email domains differ ({:?} vs {:?}); name weight withheld",
            entry.name_key, entry.email_domain, candidate.email_domain
        );
        return Some(SignalOutcome {
            signal: MatchSignal::NameExact,
            weight: 0,
            reason: "identical name suppressed by conflicting email domains".to_string(),
        });
    }
    let phone_corroborates = both_present_and_equal(&entry.phone_key, &candidate.phone_key);
    let email_corroborates = both_present_and_equal(&entry.email_domain, &candidate.email_domain);
    if both_present_and_differ(&entry.address_key, &candidate.address_key)
        && !phone_corroborates
        && !email_corroborates
    {
        debug!(
            "name key '{}' identical but address keys differ with no corroboration; name weight withheld",
            entry.name_key
        );
        return Some(SignalOutcome {
            signal: MatchSignal::NameExact,
            weight: 0,
            reason: "identical name suppressed by uncorroborated address conflict".to_string(),
        });
    }
    Some(SignalOutcome {
        signal: MatchSignal::NameExact,
        weight: cfg.weights.name_exact,
        reason: format!("normalized name '{}' identical", entry.name_key),
    })
}

fn eval_name_similar(
    entry: &CandidateKeys,
    candidate: &CandidateKeys,
    cfg: &HeuristicConfig,
) -> Option<SignalOutcome> {
    if entry.name_key.is_empty()
        || candidate.name_key.is_empty()
        || entry.name_key == candidate.name_key
    {
        return None;
    }
    let similarity = name::key_similarity(&entry.name_key, &candidate.name_key);
    if similarity < cfg.weights.name_similarity_floor {
        return None;
    }
    Some(SignalOutcome {
        signal: MatchSignal::NameSimilar,
        weight: cfg.weights.name_similar,
        reason: format!(
            "names '{}' / '{}' similar at {}%",
            entry.name_key, candidate.name_key, similarity
        ),
    })
}

/// Score one candidate against one index entry. An equal fiscal id is
/// definitive and short-circuits everything else; otherwise the ordered
/// signal evaluators accumulate. Suppressed signals stay in the reasons
/// list at zero weight so merge decisions can be audited afterwards.
pub fn score_match(
    entry: &CandidateKeys,
    candidate: &CandidateKeys,
    cfg: &HeuristicConfig,
) -> MatchScoreResult {
    if let (Some(a), Some(b)) = (&entry.tax_id, &candidate.tax_id) {
        if a == b {
            return MatchScoreResult {
                score: cfg.weights.tax_id,
                reasons: vec![format!("fiscal id '{}' identical", a)],
            };
        }
        debug!("fiscal ids differ ('{}' vs '{}'); scoring on remaining signals", a, b);
    }

    let mut score = 0u32;
    let mut reasons = Vec::new();
    for evaluator in SIGNAL_EVALUATORS {
        if let Some(outcome) = evaluator(entry, candidate, cfg) {
            score += outcome.weight;
            debug!(
                "signal {} contributed {}: {}",
                outcome.signal.as_str(),
                outcome.weight,
                outcome.reason
            );
            reasons.push(outcome.reason);
        }
    }
    MatchScoreResult { score, reasons }
}
