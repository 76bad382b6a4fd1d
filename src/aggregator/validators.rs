//! Group stake entries by validator and validator type.

use log::debug;
use std::collections::BTreeMap;

use crate::model::{
    short_account_id, StakeEntry, Validator, ValidatorId, ValidatorRecord, ValidatorSummary,
    ValidatorType,
};
use crate::roster::Roster;

/// Build one `Validator` per validator id seen in the entries or the records
///
/// **Public** - main entry point for validator aggregation
///
/// # Arguments
/// * `entries` - Canonical stake entries
/// * `records` - Merged validator records (names and reported totals)
/// * `roster` - Supplies the Core allow-list
///
/// # Returns
/// Validators ordered by id. `total_staked` is always the sum of `members`.
pub fn aggregate_validators(
    entries: &[StakeEntry],
    records: &BTreeMap<ValidatorId, ValidatorRecord>,
    roster: &Roster,
) -> Vec<Validator> {
    let mut members: BTreeMap<&str, Vec<StakeEntry>> = records
        .keys()
        .map(|id| (id.as_str(), Vec::new()))
        .collect();
    for entry in entries {
        members
            .entry(entry.validator_id.as_str())
            .or_default()
            .push(entry.clone());
    }

    let validators: Vec<Validator> = members
        .into_iter()
        .map(|(id, members)| {
            let record = records.get(id);
            let display_name = roster
                .validator_name(id)
                .map(str::to_string)
                .or_else(|| record.and_then(|r| r.display_name.clone()))
                .unwrap_or_else(|| short_account_id(id));
            Validator {
                validator_id: id.to_string(),
                display_name,
                kind: roster.validator_type(id),
                total_staked: members.iter().map(|e| e.staked_amount).sum(),
                reported_total: record.map_or(0.0, |r| r.reported_total),
                members,
            }
        })
        .collect();

    debug!(
        "Aggregated {} stake entries into {} validators",
        entries.len(),
        validators.len()
    );
    validators
}

/// Stake accounted for by all validators of one type
pub fn total_for_type(validators: &[Validator], kind: ValidatorType) -> f64 {
    validators
        .iter()
        .filter(|v| v.kind == kind)
        .map(Validator::effective_total)
        .sum()
}

/// Ranking view of each validator
pub fn summarize_validators(validators: &[Validator], native_usd_price: f64) -> Vec<ValidatorSummary> {
    validators
        .iter()
        .map(|v| {
            let total = v.effective_total();
            ValidatorSummary {
                validator_id: v.validator_id.clone(),
                display_name: v.display_name.clone(),
                kind: v.kind,
                total_staked: total,
                unattributed: v.unattributed(),
                staker_count: v.members.len(),
                usd_value: total * native_usd_price,
            }
        })
        .collect()
}
