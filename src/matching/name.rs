// src/matching/name.rs
use once_cell::sync::Lazy;
use regex::Regex;
use strsim::levenshtein;

use super::fold_diacritics;
use crate::config::HeuristicConfig;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Canonical comparison key for a legal name: lowercase, diacritics folded,
/// legal-form markers stripped from the ends, punctuation collapsed.
///
/// Markers are only removed from the ends of the name. "Casa Sanatatii SRL"
/// loses its suffix, but a brand that merely contains a marker-like token
/// ("Sala Palatului") keeps it.
pub fn normalize_name(raw: &str, cfg: &HeuristicConfig) -> String {
    let mut normalized = fold_diacritics(&raw.to_lowercase());
    normalized = WHITESPACE_RE.replace_all(normalized.trim(), " ").to_string();

    // Strip legal-form markers while punctuation is still intact so dotted
    // spellings ("s.r.l.") match their configured forms.
    loop {
        let before = normalized.len();
        normalized = normalized
            .trim_end_matches(|c: char| !c.is_alphanumeric())
            .trim_start_matches(|c: char| !c.is_alphanumeric() && !c.is_whitespace())
            .trim()
            .to_string();
        for prefix in &cfg.name_rules.legal_prefixes {
            if let Some(rest) = normalized.strip_prefix(prefix.as_str()) {
                if rest.starts_with(' ') {
                    normalized = rest.trim_start().to_string();
                }
            }
        }
        for suffix in &cfg.name_rules.legal_suffixes {
            if let Some(rest) = normalized.strip_suffix(suffix.as_str()) {
                if rest.ends_with(' ') || rest.is_empty() {
                    normalized = rest.trim_end().to_string();
                }
            }
        }
        if normalized.len() == before {
            break;
        }
    }

    let depunct: String = normalized
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    WHITESPACE_RE.replace_all(depunct.trim(), " ").to_string()
}

/// Similarity between two raw names on the 0-100 scale used by the scorer.
pub fn name_similarity(a: &str, b: &str, cfg: &HeuristicConfig) -> u8 {
    key_similarity(&normalize_name(a, cfg), &normalize_name(b, cfg))
}

/// Similarity between two already-normalized keys. Equal keys score 100;
/// containment scores the length ratio; everything else falls back to
/// character-level edit distance.
pub fn key_similarity(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    if a == b {
        return 100;
    }
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    if a.contains(b) || b.contains(a) {
        let shorter = len_a.min(len_b) as f64;
        let longer = len_a.max(len_b) as f64;
        return (shorter / longer * 100.0).round() as u8;
    }
    let distance = levenshtein(a, b);
    let max_len = len_a.max(len_b) as f64;
    ((1.0 - distance as f64 / max_len) * 100.0).round().max(0.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_legal_markers_from_the_ends() {
        let cfg = HeuristicConfig::default();
        assert_eq!(normalize_name("SC Clinica Sante S.R.L.", &cfg), "clinica sante");
        assert_eq!(normalize_name("MEDLIFE SA", &cfg), "medlife");
        assert_eq!(normalize_name("CMI Dr. Popescu PFA", &cfg), "cmi dr popescu");
    }

    #[test]
    fn keeps_marker_like_tokens_in_the_middle() {
        let cfg = HeuristicConfig::default();
        // "sa" appears mid-name and must survive.
        assert_eq!(normalize_name("Casa Sanatatii Tale SRL", &cfg), "casa sanatatii tale");
        assert_eq!(normalize_name("Sala Palatului Medical", &cfg), "sala palatului medical");
    }

    #[test]
    fn folds_diacritics_and_punctuation() {
        let cfg = HeuristicConfig::default();
        assert_eq!(
            normalize_name("Clinica Sănătatea - Iași", &cfg),
            normalize_name("Clinica Sanatatea Iasi", &cfg)
        );
    }

    #[test]
    fn identical_names_score_one_hundred() {
        let cfg = HeuristicConfig::default();
        assert_eq!(name_similarity("Clinica Sante", "CLINICA SANTE S.R.L.", &cfg), 100);
    }

    #[test]
    fn similarity_is_symmetric() {
        let cfg = HeuristicConfig::default();
        let ab = name_similarity("Clinica Sante", "Clinica Santa", &cfg);
        let ba = name_similarity("Clinica Santa", "Clinica Sante", &cfg);
        assert_eq!(ab, ba);
    }

    #[test]
    fn containment_scores_length_ratio() {
        // "medlife" (7 chars) inside "medlife cluj" (12 chars).
        assert_eq!(key_similarity("medlife", "medlife cluj"), 58);
    }

    #[test]
    fn edit_distance_fallback() {
        // One substitution over 13 characters.
        assert_eq!(key_similarity("clinica sante", "clinica santa"), 92);
        assert!(key_similarity("clinica sante", "laborator vest") < 40);
    }
}
