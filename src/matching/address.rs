// src/matching/address.rs
use log::debug;

use super::fold_diacritics;
use crate::config::HeuristicConfig;

const NUMBER_MARKERS: [&str; 4] = ["nr", "no", "num", "numarul"];
const SECTOR_MARKERS: [&str; 3] = ["sector", "sect", "sectorul"];
const UNIT_MARKERS: [&str; 12] = [
    "bl", "bloc", "sc", "scara", "ap", "apt", "et", "etaj", "cam", "camera", "corp", "parter",
];

fn leading_digits(token: &str) -> Option<String> {
    let digits: String = token.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Compact address comparison key: `{firstMeaningfulWord}-{number}-{sector}`
/// with `0` placeholders for a missing number or sector. Returns None when
/// no street-type token is present; a bare city name is not a usable key.
///
/// Known precision limit, kept on purpose: only the first meaningful street
/// word survives and house-number letter suffixes are dropped ("12A" keys as
/// "12"), so distinct buildings on long streets can collide and suffixed
/// variants of one building always do.
pub fn normalized_address(raw: &str, cfg: &HeuristicConfig) -> Option<String> {
    let folded = fold_diacritics(&raw.to_lowercase());
    // Dropping punctuation outright glues hyphenated abbreviations back
    // together: "b-dul" becomes "bdul", "str." becomes "str".
    let cleaned: String = folded
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();

    let is_street_type = |token: &str| {
        cfg.street_types
            .iter()
            .any(|rule| rule.variants.iter().any(|v| v.as_str() == token))
    };

    let street_idx = tokens.iter().position(|t| is_street_type(t));
    let street_idx = match street_idx {
        Some(idx) => idx,
        None => {
            debug!("address '{}' has no street-type token; no key", raw);
            return None;
        }
    };

    let mut sector = None;
    let mut sector_digit_idx = None;
    for (i, token) in tokens.iter().enumerate() {
        if SECTOR_MARKERS.contains(token) {
            if let Some(next) = tokens.get(i + 1) {
                if let Some(digits) = leading_digits(next) {
                    sector = Some(digits);
                    sector_digit_idx = Some(i + 1);
                    break;
                }
            }
        }
    }

    let mut number = None;
    for (i, token) in tokens.iter().enumerate().skip(street_idx + 1) {
        if NUMBER_MARKERS.contains(token) {
            number = tokens.get(i + 1).and_then(|t| leading_digits(t));
            break;
        }
    }
    if number.is_none() {
        for (i, token) in tokens.iter().enumerate().skip(street_idx + 1) {
            if Some(i) == sector_digit_idx {
                continue;
            }
            let prev = tokens.get(i.wrapping_sub(1)).copied().unwrap_or_default();
            if UNIT_MARKERS.contains(&prev) || SECTOR_MARKERS.contains(&prev) {
                continue;
            }
            if token.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                number = leading_digits(token);
                break;
            }
        }
    }

    let word = tokens.iter().skip(street_idx + 1).copied().find(|t| {
        t.chars().count() >= 2
            && t.chars().all(|c| c.is_alphabetic())
            && !is_street_type(t)
            && !NUMBER_MARKERS.contains(t)
            && !SECTOR_MARKERS.contains(t)
            && !UNIT_MARKERS.contains(t)
    })?;

    Some(format!(
        "{}-{}-{}",
        word,
        number.as_deref().unwrap_or("0"),
        sector.as_deref().unwrap_or("0")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_word_number_sector_key() {
        let cfg = HeuristicConfig::default();
        assert_eq!(
            normalized_address("Str. Aviatorilor nr. 15, Sector 1", &cfg),
            Some("aviatorilor-15-1".to_string())
        );
    }

    #[test]
    fn abbreviation_variants_produce_the_same_key() {
        let cfg = HeuristicConfig::default();
        let a = normalized_address("Strada Aviatorilor 15, sector 1", &cfg);
        let b = normalized_address("Str Aviatorilor nr. 15, Sect. 1", &cfg);
        assert_eq!(a, b);
        assert!(a.is_some());
    }

    #[test]
    fn bare_city_name_is_not_a_key() {
        let cfg = HeuristicConfig::default();
        assert_eq!(normalized_address("Cluj-Napoca", &cfg), None);
        assert_eq!(normalized_address("Comuna Florești, jud. Cluj", &cfg), None);
    }

    #[test]
    fn missing_number_and_sector_use_placeholders() {
        let cfg = HeuristicConfig::default();
        assert_eq!(
            normalized_address("Bulevardul Unirii", &cfg),
            Some("unirii-0-0".to_string())
        );
    }

    #[test]
    fn number_letter_suffix_is_dropped() {
        let cfg = HeuristicConfig::default();
        assert_eq!(
            normalized_address("Bulevardul Unirii 23A", &cfg),
            Some("unirii-23-0".to_string())
        );
    }

    #[test]
    fn building_unit_numbers_do_not_become_street_numbers() {
        let cfg = HeuristicConfig::default();
        assert_eq!(
            normalized_address("Șos. Mihai Bravu nr. 42, bl. 3, ap. 7", &cfg),
            Some("mihai-42-0".to_string())
        );
    }

    #[test]
    fn hyphenated_boulevard_abbreviation_is_recognized() {
        let cfg = HeuristicConfig::default();
        assert_eq!(
            normalized_address("B-dul Nicolae Balcescu nr. 21", &cfg),
            Some("nicolae-21-0".to_string())
        );
    }
}
