//! Stake splitting.
//!
//! Builds the canonical stake entries and partitions balances into staked and
//! unstaked. Roster accounts' own stake records take precedence over the
//! validator-side staker lists, which are paginated and can lag behind.

use std::collections::BTreeMap;

use super::classifier::Classifier;
use crate::aggregator::{Holding, StakeGroup};
use crate::model::{AccountId, Snapshot, StakeEntry, Validator, ValidatorId, ValidatorType};

/// Collect one entry per (validator, staker) pair with a positive amount
///
/// **Public** - the only source of stake figures for aggregation
pub fn collect_stake_entries(snapshot: &Snapshot, classifier: &Classifier<'_>) -> Vec<StakeEntry> {
    let mut pairs: BTreeMap<(ValidatorId, AccountId), f64> = BTreeMap::new();

    for (validator_id, record) in &snapshot.validators {
        for (staker_id, amount) in &record.stakers {
            if *amount > 0.0 {
                pairs.insert((validator_id.clone(), staker_id.clone()), *amount);
            }
        }
    }

    for (spec, resolved) in classifier.roster_accounts() {
        let Some(record) = snapshot.accounts.get(&spec.key()) else {
            continue;
        };
        for (validator_id, amount) in &record.stakes {
            if *amount > 0.0 {
                pairs.insert((validator_id.clone(), resolved.clone()), *amount);
            }
        }
    }

    pairs
        .into_iter()
        .map(|((validator_id, staker_id), amount)| StakeEntry::new(staker_id, validator_id, amount))
        .collect()
}

/// Unstaked part of a balance; zero for fully staked (or over-staked) holders
pub fn unstaked_balance(total_balance: f64, staked: f64) -> f64 {
    (total_balance - staked).max(0.0)
}

/// Split a balance into (staked, unstaked)
pub fn split_balance(total_balance: f64, staked: f64) -> (f64, f64) {
    (staked, unstaked_balance(total_balance, staked))
}

/// Group staked holdings by validator type
///
/// Each group's expected total is what its validators account for, including
/// reported stake no member entry explains.
pub fn stake_groups(validators: &[Validator], classifier: &Classifier<'_>) -> Vec<StakeGroup> {
    [ValidatorType::Core, ValidatorType::Community]
        .into_iter()
        .map(|kind| {
            let members = validators.iter().filter(|v| v.kind == kind);
            let expected_total: f64 = members.clone().map(Validator::effective_total).sum();
            let holdings: Vec<Holding> = classifier.group_holdings(
                members
                    .flat_map(|v| v.members.iter())
                    .map(|e| (e.staker_id.clone(), e.staked_amount)),
            );
            StakeGroup {
                kind,
                holdings,
                expected_total,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccountRecord, ValidatorRecord};
    use crate::roster::parse_roster;

    const ROSTER: &str = r#"
total_issued_supply = 5000.0

[[tokens]]
symbol = "DESO"
kind = "native"

[[validators]]
id = "core1"
name = "Core One"

[[accounts]]
id = "A"
category = "foundation"
"#;

    #[test]
    fn test_unstaked_never_negative() {
        assert_eq!(unstaked_balance(1000.0, 400.0), 600.0);
        assert_eq!(unstaked_balance(500.0, 500.0), 0.0);
        assert_eq!(unstaked_balance(100.0, 250.0), 0.0);
        assert_eq!(split_balance(10.0, 4.0), (4.0, 6.0));
    }

    #[test]
    fn test_account_stakes_override_validator_lists() {
        let roster = parse_roster(ROSTER).unwrap();
        let mut snapshot = Snapshot::default();

        let mut validator = ValidatorRecord::default();
        validator.stakers.insert("A".to_string(), 300.0);
        validator.stakers.insert("B".to_string(), 50.0);
        validator.stakers.insert("Z".to_string(), 0.0);
        snapshot.validators.insert("core1".to_string(), validator);

        let mut record = AccountRecord::default();
        record.stakes.insert("core1".to_string(), 400.0);
        snapshot.accounts.insert("A".to_string(), record);

        let classifier = Classifier::new(&roster, &snapshot);
        let entries = collect_stake_entries(&snapshot, &classifier);

        assert_eq!(
            entries,
            vec![
                StakeEntry::new("A", "core1", 400.0),
                StakeEntry::new("B", "core1", 50.0),
            ]
        );
    }

    #[test]
    fn test_stake_groups_by_validator_type() {
        let roster = parse_roster(ROSTER).unwrap();
        let snapshot = Snapshot::default();
        let classifier = Classifier::new(&roster, &snapshot);

        let validators = vec![
            Validator {
                validator_id: "core1".to_string(),
                display_name: "Core One".to_string(),
                kind: ValidatorType::Core,
                total_staked: 400.0,
                reported_total: 450.0,
                members: vec![StakeEntry::new("A", "core1", 400.0)],
            },
            Validator {
                validator_id: "c2".to_string(),
                display_name: "c2".to_string(),
                kind: ValidatorType::Community,
                total_staked: 500.0,
                reported_total: 0.0,
                members: vec![StakeEntry::new("B", "c2", 500.0)],
            },
        ];

        let groups = stake_groups(&validators, &classifier);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].kind, ValidatorType::Core);
        assert_eq!(groups[0].expected_total, 450.0);
        assert_eq!(groups[0].holdings.len(), 1);
        assert_eq!(groups[1].expected_total, 500.0);
        assert_eq!(groups[1].holdings[0].holder_key, "B");
    }
}
