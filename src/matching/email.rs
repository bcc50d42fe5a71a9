// src/matching/email.rs
use log::debug;

use crate::config::HeuristicConfig;

/// Extract the mailbox domain of the first address in a possibly
/// multi-address field. Returns None for malformed input and for free-mail
/// providers: a shared gmail.com mailbox says nothing about which
/// organization owns the record, so it must never count as a match signal.
pub fn business_email_domain(raw: &str, cfg: &HeuristicConfig) -> Option<String> {
    let first = raw
        .split(|c: char| c == ';' || c == ',' || c.is_whitespace())
        .map(str::trim)
        .find(|token| !token.is_empty() && token.contains('@'))?;

    let mut parts = first.splitn(2, '@');
    let local_part = parts.next()?;
    let domain_part = parts.next()?;
    if local_part.is_empty() {
        return None;
    }

    let domain = domain_part
        .trim()
        .trim_end_matches('.')
        .to_lowercase();
    if domain.is_empty() || !domain.contains('.') {
        return None;
    }
    if cfg.free_mail_domains.iter().any(|d| d == &domain) {
        debug!("email domain '{}' is a free-mail provider; no signal", domain);
        return None;
    }
    Some(domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_domain_of_first_address() {
        let cfg = HeuristicConfig::default();
        assert_eq!(
            business_email_domain("programari@clinica-sante.ro; contact@altceva.ro", &cfg),
            Some("clinica-sante.ro".to_string())
        );
    }

    #[test]
    fn free_mail_domains_carry_no_signal() {
        let cfg = HeuristicConfig::default();
        assert_eq!(business_email_domain("cabinet.popescu@gmail.com", &cfg), None);
        assert_eq!(business_email_domain("office@yahoo.ro", &cfg), None);
    }

    #[test]
    fn malformed_input_degrades_to_none() {
        let cfg = HeuristicConfig::default();
        assert_eq!(business_email_domain("", &cfg), None);
        assert_eq!(business_email_domain("nu este email", &cfg), None);
        assert_eq!(business_email_domain("@fara-local.ro", &cfg), None);
        assert_eq!(business_email_domain("nume@faradot", &cfg), None);
    }

    #[test]
    fn domain_is_lowercased() {
        let cfg = HeuristicConfig::default();
        assert_eq!(
            business_email_domain("Office@Clinica-Sante.RO", &cfg),
            Some("clinica-sante.ro".to_string())
        );
    }
}
