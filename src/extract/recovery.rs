use std::collections::HashMap;

use super::digits::normalize_digits;
use crate::model::{RecoveryPair, Voter, VoterField};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub filled: usize,
    pub kept_existing: usize,
    pub unmatched: usize,
    pub ignored_empty: usize,
}

/// Fills missing fields of `base` from recovered pairs keyed by serial id.
///
/// `base` must hold the voters of a single page, since serial ids are only
/// unique within a page. A parsed value is never replaced; pairs whose id has
/// no record are dropped. Merging the same pairs again changes nothing.
pub fn merge_recovered_fields(base: &[Voter], pairs: &[RecoveryPair]) -> Vec<Voter> {
    merge_with_report(base, pairs).0
}

/// Record-wise merge for full-detail recovery, same empty-only rule per field.
pub fn merge_recovered_voters(base: &[Voter], recovered: &[Voter]) -> Vec<Voter> {
    merge_recovered_fields(base, &pairs_from_voters(recovered, &VoterField::ALL))
}

pub fn merge_with_report(base: &[Voter], pairs: &[RecoveryPair]) -> (Vec<Voter>, MergeReport) {
    let mut merged = base.to_vec();
    let mut report = MergeReport::default();

    // First record wins when a page repeats a serial.
    let mut positions = HashMap::<String, usize>::new();
    for (position, voter) in merged.iter().enumerate() {
        positions.entry(serial_key(&voter.id)).or_insert(position);
    }

    for pair in pairs {
        let value = pair.value.trim();
        if value.is_empty() {
            report.ignored_empty += 1;
            continue;
        }

        let Some(&position) = positions.get(&serial_key(&pair.id)) else {
            report.unmatched += 1;
            continue;
        };

        let target = &mut merged[position];
        if target.is_missing(pair.field) {
            *target.field_mut(pair.field) = value.to_string();
            report.filled += 1;
        } else {
            report.kept_existing += 1;
        }
    }

    (merged, report)
}

/// Flattens recovered voters into pairs for the listed fields, skipping
/// values that are empty.
pub fn pairs_from_voters(voters: &[Voter], fields: &[VoterField]) -> Vec<RecoveryPair> {
    voters
        .iter()
        .flat_map(|voter| {
            fields.iter().filter_map(move |field| {
                let value = voter.field(*field);
                if value.trim().is_empty() {
                    return None;
                }
                Some(RecoveryPair {
                    id: voter.id.clone(),
                    field: *field,
                    value: value.to_string(),
                })
            })
        })
        .collect()
}

/// Comparison key for serial ids: ASCII digits, no leading zeros, so `"001"`,
/// `"1"` and `"१"` address the same record.
pub fn serial_key(id: &str) -> String {
    let normalized = normalize_digits(id.trim()).to_uppercase();
    let stripped = normalized.trim_start_matches('0');
    if stripped.is_empty() && !normalized.is_empty() {
        return "0".to_string();
    }
    stripped.to_string()
}
