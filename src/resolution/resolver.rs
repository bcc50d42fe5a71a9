// src/resolution/resolver.rs
//! In-memory entity resolution for one sync run. The index is caller-owned:
//! built from storage before the run, mutated sequentially while candidates
//! stream through, and returned for the caller to persist. Nothing here is
//! shared across runs.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::HeuristicConfig;
use crate::matching::{self, candidate_keys, score_match};
use crate::models::core::{
    CandidateRecord, Location, Organization, SourceKind, SourceProvenance,
};
use crate::models::matching::{CandidateKeys, MatchScoreResult};

/// One accepted entity with its precomputed comparison keys and the
/// locations resolved for it so far.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub organization: Organization,
    pub locations: Vec<Location>,
    pub keys: CandidateKeys,
}

/// The resolution run's working set. Entries keep insertion order; ties in
/// scoring resolve to the first-encountered entry, so results are
/// deterministic given stable input ordering.
#[derive(Debug, Default)]
pub struct EntityIndex {
    entries: Vec<IndexEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionStats {
    pub candidates_in: usize,
    pub organizations_created: usize,
    pub organizations_merged: usize,
    pub locations_created: usize,
    pub locations_merged: usize,
}

#[derive(Debug)]
pub struct ResolutionOutcome {
    pub organizations: Vec<Organization>,
    pub locations: Vec<Location>,
    pub index: EntityIndex,
    pub stats: ResolutionStats,
}

fn location_confidence(kind: SourceKind, cfg: &HeuristicConfig) -> u8 {
    match kind {
        SourceKind::Primary => cfg.location_confidence.primary,
        SourceKind::Derived => cfg.location_confidence.derived,
    }
}

/// Fill an empty slot, or overwrite a populated one only when the incoming
/// value outranks what is stored.
fn merge_field(slot: &mut Option<String>, incoming: Option<&str>, allow_overwrite: bool) {
    match incoming {
        Some(value) if !value.trim().is_empty() => {
            if slot.as_deref().map_or(true, |s| s.trim().is_empty()) || allow_overwrite {
                *slot = Some(value.to_string());
            }
        }
        _ => {}
    }
}

impl EntityIndex {
    pub fn new() -> Self {
        EntityIndex::default()
    }

    /// Rebuild the index from previously persisted records. The entry's
    /// address key is seeded from its first keyed location.
    pub fn from_records(
        organizations: Vec<Organization>,
        locations: Vec<Location>,
        cfg: &HeuristicConfig,
    ) -> Self {
        let mut entries = Vec::with_capacity(organizations.len());
        for organization in organizations {
            let org_locations: Vec<Location> = locations
                .iter()
                .filter(|l| l.organization_id == organization.id)
                .cloned()
                .collect();
            let keys = CandidateKeys {
                tax_id: organization
                    .tax_id
                    .as_deref()
                    .and_then(matching::normalize_tax_id),
                name_key: matching::name::normalize_name(&organization.legal_name, cfg),
                email_domain: organization
                    .email
                    .as_deref()
                    .and_then(|e| matching::email::business_email_domain(e, cfg)),
                phone_key: organization
                    .phone
                    .as_deref()
                    .and_then(|p| matching::phone::normalized_phone(p, cfg)),
                address_key: org_locations
                    .iter()
                    .find_map(|l| l.address_key.clone()),
            };
            entries.push(IndexEntry {
                organization,
                locations: org_locations,
                keys,
            });
        }
        info!("Entity index loaded with {} organizations", entries.len());
        EntityIndex { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn organizations(&self) -> Vec<Organization> {
        self.entries.iter().map(|e| e.organization.clone()).collect()
    }

    pub fn locations(&self) -> Vec<Location> {
        self.entries
            .iter()
            .flat_map(|e| e.locations.iter().cloned())
            .collect()
    }

    /// Resolve a single candidate: merge it into the best-scoring entry at
    /// or above the acceptance threshold, or create a new entity and make it
    /// immediately matchable for the rest of the run.
    pub fn resolve_one(
        &mut self,
        candidate: CandidateRecord,
        cfg: &HeuristicConfig,
        stats: &mut ResolutionStats,
    ) {
        let keys = candidate_keys(&candidate, cfg);

        let mut best: Option<(usize, MatchScoreResult)> = None;
        for (idx, entry) in self.entries.iter().enumerate() {
            let result = score_match(&entry.keys, &keys, cfg);
            if result.score < cfg.weights.acceptance_threshold {
                continue;
            }
            // Strict comparison keeps the first-encountered entry on ties.
            let is_better = best
                .as_ref()
                .map_or(true, |(_, current)| result.score > current.score);
            if is_better {
                best = Some((idx, result));
            }
        }

        match best {
            Some((idx, result)) => {
                debug!(
                    "candidate '{}' merged into organization {} with score {} ({})",
                    candidate.raw_name,
                    self.entries[idx].organization.id,
                    result.score,
                    result.reasons.join("; ")
                );
                self.merge_into(idx, candidate, keys, cfg, stats);
            }
            None => {
                debug!(
                    "candidate '{}' matched nothing above threshold {}; creating organization",
                    candidate.raw_name, cfg.weights.acceptance_threshold
                );
                self.create_entry(candidate, keys, cfg, stats);
            }
        }
    }

    fn merge_into(
        &mut self,
        idx: usize,
        candidate: CandidateRecord,
        keys: CandidateKeys,
        cfg: &HeuristicConfig,
        stats: &mut ResolutionStats,
    ) {
        let entry = &mut self.entries[idx];
        let organization = &mut entry.organization;

        // Primary extractions outrank enrichment output; an enrichment row
        // never replaces data that a primary source already provided.
        let allow_overwrite =
            candidate.source_kind == SourceKind::Primary && !organization.has_primary_source();
        let update_name = candidate.source_kind == SourceKind::Primary
            || !organization.has_primary_source();

        if update_name && !candidate.raw_name.trim().is_empty() {
            organization.legal_name = candidate.raw_name.clone();
            entry.keys.name_key = keys.name_key.clone();
        }
        if organization.tax_id.is_none() {
            organization.tax_id = candidate.tax_id.clone();
        }
        merge_field(&mut organization.email, candidate.email.as_deref(), allow_overwrite);
        merge_field(&mut organization.phone, candidate.phone.as_deref(), allow_overwrite);
        merge_field(
            &mut organization.brand_name,
            candidate.brand_name.as_deref(),
            allow_overwrite,
        );
        organization.sources.push(SourceProvenance {
            source_file: candidate.source_file.clone(),
            source_date: candidate.source_date,
            kind: candidate.source_kind,
        });

        if entry.keys.tax_id.is_none() {
            entry.keys.tax_id = keys.tax_id.clone();
        }
        if entry.keys.email_domain.is_none() {
            entry.keys.email_domain = keys.email_domain.clone();
        }
        if entry.keys.phone_key.is_none() {
            entry.keys.phone_key = keys.phone_key.clone();
        }
        if entry.keys.address_key.is_none() {
            entry.keys.address_key = keys.address_key.clone();
        }

        if candidate.address.is_some() {
            Self::absorb_location(entry, &candidate, keys.address_key, cfg, stats);
        }
        stats.organizations_merged += 1;
    }

    /// Within one organization, a candidate address is the same physical
    /// location only when the normalized keys are equal; anything else
    /// becomes an additional location.
    fn absorb_location(
        entry: &mut IndexEntry,
        candidate: &CandidateRecord,
        address_key: Option<String>,
        cfg: &HeuristicConfig,
        stats: &mut ResolutionStats,
    ) {
        let existing = address_key.as_ref().and_then(|key| {
            entry
                .locations
                .iter()
                .position(|l| l.address_key.as_ref() == Some(key))
        });
        match existing {
            Some(idx) => {
                let location = &mut entry.locations[idx];
                merge_field(&mut location.phone, candidate.phone.as_deref(), false);
                merge_field(&mut location.city, candidate.city.as_deref(), false);
                merge_field(&mut location.county, candidate.county.as_deref(), false);
                location.confidence = location
                    .confidence
                    .max(location_confidence(candidate.source_kind, cfg));
                stats.locations_merged += 1;
            }
            None => {
                entry.locations.push(Location {
                    id: Uuid::new_v4().to_string(),
                    organization_id: entry.organization.id.clone(),
                    raw_address: candidate.address.clone().unwrap_or_default(),
                    address_key,
                    city: candidate.city.clone(),
                    county: candidate.county.clone(),
                    phone: candidate.phone.clone(),
                    latitude: None,
                    longitude: None,
                    confidence: location_confidence(candidate.source_kind, cfg),
                    source_kind: candidate.source_kind,
                });
                stats.locations_created += 1;
            }
        }
    }

    fn create_entry(
        &mut self,
        candidate: CandidateRecord,
        keys: CandidateKeys,
        cfg: &HeuristicConfig,
        stats: &mut ResolutionStats,
    ) {
        let organization = Organization {
            id: Uuid::new_v4().to_string(),
            legal_name: candidate.raw_name.clone(),
            tax_id: candidate.tax_id.clone(),
            brand_name: candidate.brand_name.clone(),
            category: candidate.category,
            email: candidate.email.clone(),
            phone: candidate.phone.clone(),
            sources: vec![SourceProvenance {
                source_file: candidate.source_file.clone(),
                source_date: candidate.source_date,
                kind: candidate.source_kind,
            }],
        };
        let mut entry = IndexEntry {
            organization,
            locations: Vec::new(),
            keys,
        };
        if candidate.address.is_some() {
            let address_key = entry.keys.address_key.clone();
            Self::absorb_location(&mut entry, &candidate, address_key, cfg, stats);
        }
        self.entries.push(entry);
        stats.organizations_created += 1;
    }
}

/// Resolve a batch of candidates against a caller-owned index. Returns the
/// full resolved record set plus the updated index for persistence.
pub fn resolve_entities(
    candidates: Vec<CandidateRecord>,
    mut index: EntityIndex,
    cfg: &HeuristicConfig,
) -> ResolutionOutcome {
    let mut stats = ResolutionStats {
        candidates_in: candidates.len(),
        ..ResolutionStats::default()
    };
    for candidate in candidates {
        index.resolve_one(candidate, cfg, &mut stats);
    }
    info!(
        "Resolution run: {} candidates in, {} organizations created, {} merged, {} locations created, {} merged",
        stats.candidates_in,
        stats.organizations_created,
        stats.organizations_merged,
        stats.locations_created,
        stats.locations_merged
    );
    ResolutionOutcome {
        organizations: index.organizations(),
        locations: index.locations(),
        index,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::core::ServiceCategory;
    use chrono::NaiveDate;

    fn candidate(name: &str, source_file: &str) -> CandidateRecord {
        CandidateRecord {
            raw_name: name.to_string(),
            tax_id: None,
            brand_name: None,
            email: None,
            phone: None,
            address: None,
            city: None,
            county: None,
            category: ServiceCategory::Clinic,
            source_file: source_file.to_string(),
            source_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            source_kind: SourceKind::Primary,
        }
    }

    #[test]
    fn matching_candidates_merge_into_one_organization() {
        let cfg = HeuristicConfig::default();
        let mut a = candidate("Clinica Sante SRL", "martie.xlsx");
        a.phone = Some("0721 123 456".to_string());
        a.address = Some("Str. Aviatorilor nr. 15, Sector 1".to_string());
        let mut b = candidate("CLINICA SANTE", "aprilie.xlsx");
        b.phone = Some("+40 721 123 456".to_string());
        b.address = Some("Strada Aviatorilor 15, sector 1".to_string());

        let outcome = resolve_entities(vec![a, b], EntityIndex::new(), &cfg);
        assert_eq!(outcome.organizations.len(), 1);
        assert_eq!(outcome.locations.len(), 1);
        assert_eq!(outcome.stats.organizations_created, 1);
        assert_eq!(outcome.stats.organizations_merged, 1);
        assert_eq!(outcome.stats.locations_merged, 1);
        assert_eq!(outcome.organizations[0].sources.len(), 2);
    }

    #[test]
    fn equal_tax_id_merges_despite_different_names() {
        let cfg = HeuristicConfig::default();
        let mut a = candidate("Centrul Medical Unirea SRL", "a.xlsx");
        a.tax_id = Some("RO 1234567".to_string());
        let mut b = candidate("Regina Maria", "b.xlsx");
        b.tax_id = Some("1234567".to_string());

        let outcome = resolve_entities(vec![a, b], EntityIndex::new(), &cfg);
        assert_eq!(outcome.organizations.len(), 1);
        // Display name follows the most recent primary candidate.
        assert_eq!(outcome.organizations[0].legal_name, "Regina Maria");
    }

    #[test]
    fn same_name_different_domains_and_addresses_stay_distinct() {
        let cfg = HeuristicConfig::default();
        let mut a = candidate("Clinica Sante", "a.xlsx");
        a.email = Some("office@clinic-a.ro".to_string());
        a.address = Some("Str. Aviatorilor nr. 15, Sector 1".to_string());
        let mut b = candidate("Clinica Sante", "b.xlsx");
        b.email = Some("office@clinic-b.ro".to_string());
        b.address = Some("Bulevardul Unirii nr. 3, Sector 4".to_string());

        let outcome = resolve_entities(vec![a, b], EntityIndex::new(), &cfg);
        assert_eq!(outcome.organizations.len(), 2);
    }

    #[test]
    fn new_entities_are_matchable_within_the_same_run() {
        let cfg = HeuristicConfig::default();
        let mut a = candidate("Laborator Medis SRL", "a.xlsx");
        a.phone = Some("0744 555 666".to_string());
        let mut b = candidate("Laborator Medis", "b.xlsx");
        b.phone = Some("0744555666".to_string());
        let mut c = candidate("Laborator Medis S.R.L.", "c.xlsx");
        c.phone = Some("+40744555666".to_string());

        let outcome = resolve_entities(vec![a, b, c], EntityIndex::new(), &cfg);
        assert_eq!(outcome.organizations.len(), 1);
        assert_eq!(outcome.stats.organizations_merged, 2);
    }

    #[test]
    fn distinct_addresses_become_additional_locations() {
        let cfg = HeuristicConfig::default();
        let mut a = candidate("Clinica Sante SRL", "a.xlsx");
        a.phone = Some("0721 123 456".to_string());
        a.address = Some("Str. Aviatorilor nr. 15, Sector 1".to_string());
        let mut b = candidate("Clinica Sante SRL", "b.xlsx");
        b.phone = Some("0721 123 456".to_string());
        b.address = Some("Calea Dorobantilor nr. 99".to_string());

        let outcome = resolve_entities(vec![a, b], EntityIndex::new(), &cfg);
        assert_eq!(outcome.organizations.len(), 1);
        assert_eq!(outcome.locations.len(), 2);
        let keys: Vec<_> = outcome.locations.iter().map(|l| &l.address_key).collect();
        assert_ne!(keys[0], keys[1]);
    }

    #[test]
    fn derived_candidate_never_overwrites_primary_fields() {
        let cfg = HeuristicConfig::default();
        let mut a = candidate("Clinica Sante SRL", "a.xlsx");
        a.tax_id = Some("4455667".to_string());
        a.email = Some("office@sante.ro".to_string());
        let mut b = candidate("Sante Wellness Center", "enrich.json");
        b.tax_id = Some("4455667".to_string());
        b.email = Some("altceva@sante-wellness.ro".to_string());
        b.brand_name = Some("Sante".to_string());
        b.source_kind = SourceKind::Derived;

        let outcome = resolve_entities(vec![a, b], EntityIndex::new(), &cfg);
        assert_eq!(outcome.organizations.len(), 1);
        let org = &outcome.organizations[0];
        assert_eq!(org.legal_name, "Clinica Sante SRL");
        assert_eq!(org.email.as_deref(), Some("office@sante.ro"));
        // Empty slots still fill from the enrichment row.
        assert_eq!(org.brand_name.as_deref(), Some("Sante"));
    }

    #[test]
    fn resolution_is_idempotent_up_to_generated_ids() {
        let cfg = HeuristicConfig::default();
        let make_batch = || {
            let mut a = candidate("Clinica Sante SRL", "a.xlsx");
            a.phone = Some("0721 123 456".to_string());
            let mut b = candidate("CLINICA SANTE", "b.xlsx");
            b.phone = Some("+40721123456".to_string());
            let c = candidate("Laborator Vest SRL", "c.xlsx");
            vec![a, b, c]
        };
        let first = resolve_entities(make_batch(), EntityIndex::new(), &cfg);
        let second = resolve_entities(make_batch(), EntityIndex::new(), &cfg);

        let names = |outcome: &ResolutionOutcome| {
            let mut v: Vec<String> = outcome
                .organizations
                .iter()
                .map(|o| o.legal_name.clone())
                .collect();
            v.sort();
            v
        };
        assert_eq!(names(&first), names(&second));
        assert_eq!(first.locations.len(), second.locations.len());
        assert_eq!(
            first.stats.organizations_created,
            second.stats.organizations_created
        );
    }
}
