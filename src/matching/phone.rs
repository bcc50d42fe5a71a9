// src/matching/phone.rs
use log::debug;

use crate::config::HeuristicConfig;

/// Reduce a phone field to a bare subscriber-number key. Strips everything
/// but digits, then the international `00` prefix, the configured country
/// code, and a single trunk zero, so "+40 721 123 456" and "0721.123.456"
/// collide. Numbers with fewer digits than the configured minimum are too
/// weak to match on and yield None.
pub fn normalized_phone(raw: &str, cfg: &HeuristicConfig) -> Option<String> {
    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if let Some(rest) = digits.strip_prefix("00") {
        digits = rest.to_string();
    }
    let country_code = &cfg.phone_rules.country_code;
    if digits.len() > country_code.len() + cfg.phone_rules.min_digits - 1 {
        if let Some(rest) = digits.strip_prefix(country_code.as_str()) {
            digits = rest.to_string();
        }
    }
    if let Some(rest) = digits.strip_prefix('0') {
        digits = rest.to_string();
    }

    if digits.len() < cfg.phone_rules.min_digits {
        debug!("phone '{}' normalized to '{}'; too short to match on", raw, digits);
        return None;
    }
    Some(digits)
}
