//! Fallback merge resolution.
//!
//! Every numeric field resolves independently:
//! `live if live > 0, else cached if cached > 0, else static`.
//! Some tokens are legitimately zero while others are merely hard to fetch,
//! so a whole-record choice would throw away good live fields.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{
    AccountRecord, DataSource, NetworkRecord, Provenance, Snapshot, ValidatorRecord,
};

/// Result of merging Live, Cached and Static snapshots
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSnapshot {
    /// Merged values, same shape as the inputs
    pub snapshot: Snapshot,
    /// Provenance per roster account key
    pub account_provenance: BTreeMap<String, Provenance>,
}

impl MergedSnapshot {
    /// Provenance of an account, `Static` when it never appeared anywhere
    pub fn provenance(&self, key: &str) -> Provenance {
        self.account_provenance
            .get(key)
            .copied()
            .unwrap_or(Provenance::new(DataSource::Static, None))
    }
}

/// Resolve one field.
///
/// Returns the value and the source it came from; `None` when the field is
/// zero in every snapshot and so says nothing about freshness.
pub fn merge_value(live: f64, cached: f64, fallback: f64) -> (f64, Option<DataSource>) {
    if live > 0.0 {
        (live, Some(DataSource::Live))
    } else if cached > 0.0 {
        (cached, Some(DataSource::Cached))
    } else if fallback > 0.0 {
        (fallback, Some(DataSource::Static))
    } else {
        (0.0, None)
    }
}

/// Merge keyed fields; returns the merged map and its coarsest non-neutral source
pub fn merge_fields<K: Ord + Clone>(
    live: Option<&BTreeMap<K, f64>>,
    cached: Option<&BTreeMap<K, f64>>,
    fallback: Option<&BTreeMap<K, f64>>,
) -> (BTreeMap<K, f64>, Option<DataSource>) {
    let keys: BTreeSet<&K> = [live, cached, fallback]
        .into_iter()
        .flatten()
        .flat_map(|m| m.keys())
        .collect();

    let lookup = |map: Option<&BTreeMap<K, f64>>, key: &K| -> f64 {
        map.and_then(|m| m.get(key)).copied().unwrap_or(0.0)
    };

    let mut merged = BTreeMap::new();
    let mut coarsest: Option<DataSource> = None;
    for key in keys {
        let (value, source) = merge_value(
            lookup(live, key),
            lookup(cached, key),
            lookup(fallback, key),
        );
        merged.insert(key.clone(), value);
        coarsest = coarsest.max(source);
    }
    (merged, coarsest)
}

/// Merge string-valued maps by presence (Live, then Cached, then Static)
fn merge_labels(
    live: &BTreeMap<String, String>,
    cached: Option<&BTreeMap<String, String>>,
    fallback: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = fallback.clone();
    if let Some(cached) = cached {
        merged.extend(cached.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged.extend(live.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Merge the three snapshots field by field
///
/// **Public** - main entry point of the resolver
///
/// # Arguments
/// * `live` - This cycle's fetch result (failed accounts are absent)
/// * `cached` - Last persisted meaningful snapshot, if any
/// * `fallback` - Static roster defaults
pub fn merge_snapshots(
    live: &Snapshot,
    cached: Option<&Snapshot>,
    fallback: &Snapshot,
) -> MergedSnapshot {
    let mut snapshot = Snapshot {
        observed_at: live.observed_at,
        ..Snapshot::default()
    };
    let mut account_provenance = BTreeMap::new();

    // Accounts
    let account_keys = union_keys(
        &live.accounts,
        cached.map(|c| &c.accounts),
        &fallback.accounts,
    );
    for key in account_keys {
        let l = live.accounts.get(&key);
        let c = cached.and_then(|s| s.accounts.get(&key));
        let f = fallback.accounts.get(&key);

        let (balances, balance_source) = merge_fields(
            l.map(|r| &r.balances),
            c.map(|r| &r.balances),
            f.map(|r| &r.balances),
        );
        let (stakes, stake_source) =
            merge_fields(l.map(|r| &r.stakes), c.map(|r| &r.stakes), f.map(|r| &r.stakes));

        let source = balance_source.max(stake_source).unwrap_or(if l.is_some() {
            DataSource::Live
        } else if c.is_some() {
            DataSource::Cached
        } else {
            DataSource::Static
        });
        let provenance = provenance_for(source, l, c, live, cached);
        account_provenance.insert(key.clone(), provenance);
        snapshot.accounts.insert(
            key,
            AccountRecord {
                balances,
                stakes,
                observed_at: provenance.observed_at,
            },
        );
    }

    // Validators
    let validator_keys = union_keys(
        &live.validators,
        cached.map(|c| &c.validators),
        &fallback.validators,
    );
    for key in validator_keys {
        let l = live.validators.get(&key);
        let c = cached.and_then(|s| s.validators.get(&key));
        let f = fallback.validators.get(&key);

        let display_name = [l, c, f]
            .into_iter()
            .flatten()
            .find_map(|r| r.display_name.clone());
        let (reported_total, _) = merge_value(
            l.map_or(0.0, |r| r.reported_total),
            c.map_or(0.0, |r| r.reported_total),
            f.map_or(0.0, |r| r.reported_total),
        );
        let (stakers, _) = merge_fields(
            l.map(|r| &r.stakers),
            c.map(|r| &r.stakers),
            f.map(|r| &r.stakers),
        );
        snapshot.validators.insert(
            key,
            ValidatorRecord {
                display_name,
                reported_total,
                stakers,
            },
        );
    }

    // Holder lists
    let token_keys = union_keys(&live.holders, cached.map(|c| &c.holders), &fallback.holders);
    for symbol in token_keys {
        let (holders, _) = merge_fields(
            live.holders.get(&symbol),
            cached.and_then(|s| s.holders.get(&symbol)),
            fallback.holders.get(&symbol),
        );
        snapshot.holders.insert(symbol, holders);
    }

    snapshot.names = merge_labels(&live.names, cached.map(|c| &c.names), &fallback.names);
    snapshot.identities = merge_labels(
        &live.identities,
        cached.map(|c| &c.identities),
        &fallback.identities,
    );
    snapshot.prices = merge_fields(
        Some(&live.prices),
        cached.map(|c| &c.prices),
        Some(&fallback.prices),
    )
    .0;
    snapshot.network = merge_network(
        &live.network,
        cached.map(|c| &c.network),
        &fallback.network,
    );

    MergedSnapshot {
        snapshot,
        account_provenance,
    }
}

/// Snapshot to persist as the new Cached one: Live over Cached, no static defaults
pub fn promote(live: &Snapshot, cached: Option<&Snapshot>) -> Snapshot {
    let mut promoted = merge_snapshots(live, cached, &Snapshot::default()).snapshot;
    promoted.observed_at = live.observed_at;
    promoted
}

fn merge_network(
    live: &NetworkRecord,
    cached: Option<&NetworkRecord>,
    fallback: &NetworkRecord,
) -> NetworkRecord {
    let (total_issued, _) = merge_value(
        live.total_issued,
        cached.map_or(0.0, |c| c.total_issued),
        fallback.total_issued,
    );
    let (ccv1_locked, _) = merge_value(
        live.ccv1_locked,
        cached.map_or(0.0, |c| c.ccv1_locked),
        fallback.ccv1_locked,
    );
    let (token_supplies, _) = merge_fields(
        Some(&live.token_supplies),
        cached.map(|c| &c.token_supplies),
        Some(&fallback.token_supplies),
    );
    NetworkRecord {
        total_issued,
        ccv1_locked,
        token_supplies,
    }
}

/// Record timestamps win over snapshot timestamps: a carried-over cached
/// record keeps the time it was actually fetched.
fn provenance_for(
    source: DataSource,
    live_record: Option<&AccountRecord>,
    cached_record: Option<&AccountRecord>,
    live: &Snapshot,
    cached: Option<&Snapshot>,
) -> Provenance {
    let observed_at = match source {
        DataSource::Live => live_record
            .and_then(|r| r.observed_at)
            .or(live.observed_at),
        DataSource::Cached => cached_record
            .and_then(|r| r.observed_at)
            .or_else(|| cached.and_then(|c| c.observed_at)),
        DataSource::Static => None,
    };
    Provenance::new(source, observed_at)
}

fn union_keys<V>(
    live: &BTreeMap<String, V>,
    cached: Option<&BTreeMap<String, V>>,
    fallback: &BTreeMap<String, V>,
) -> BTreeSet<String> {
    live.keys()
        .chain(cached.into_iter().flat_map(|m| m.keys()))
        .chain(fallback.keys())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(deso: f64, other: f64) -> AccountRecord {
        let mut record = AccountRecord::default();
        record.balances.insert("DESO".to_string(), deso);
        record.balances.insert("dUSDC".to_string(), other);
        record
    }

    fn snapshot_with(key: &str, record: AccountRecord, hour: u32) -> Snapshot {
        let mut snapshot = Snapshot::empty_at(Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap());
        snapshot.accounts.insert(key.to_string(), record);
        snapshot
    }

    #[test]
    fn test_merge_value_precedence() {
        assert_eq!(merge_value(0.0, 5.0, 3.0), (5.0, Some(DataSource::Cached)));
        assert_eq!(merge_value(7.0, 5.0, 3.0), (7.0, Some(DataSource::Live)));
        assert_eq!(merge_value(0.0, 0.0, 3.0), (3.0, Some(DataSource::Static)));
        assert_eq!(merge_value(0.0, 0.0, 0.0), (0.0, None));
    }

    #[test]
    fn test_merge_is_per_field_not_per_record() {
        let live = snapshot_with("a", record(10.0, 0.0), 2);
        let cached = snapshot_with("a", record(8.0, 4.0), 1);
        let fallback = Snapshot::default();

        let merged = merge_snapshots(&live, Some(&cached), &fallback);
        let balances = &merged.snapshot.accounts["a"].balances;

        assert_eq!(balances["DESO"], 10.0);
        assert_eq!(balances["dUSDC"], 4.0);
        // The dUSDC field came from Cached, so the account is only as fresh as Cached
        let provenance = merged.provenance("a");
        assert_eq!(provenance.source, DataSource::Cached);
        assert_eq!(provenance.observed_at, cached.observed_at);
    }

    #[test]
    fn test_failed_account_falls_back_to_static() {
        let live = Snapshot::empty_at(Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap());
        let mut fallback = Snapshot::default();
        fallback.accounts.insert("a".to_string(), record(3.0, 0.0));

        let merged = merge_snapshots(&live, None, &fallback);

        assert_eq!(merged.snapshot.accounts["a"].balances["DESO"], 3.0);
        assert_eq!(merged.provenance("a").source, DataSource::Static);
        assert!(merged.provenance("a").observed_at.is_none());
    }

    #[test]
    fn test_all_zero_account_is_live_when_fetched() {
        let live = snapshot_with("a", record(0.0, 0.0), 2);
        let merged = merge_snapshots(&live, None, &Snapshot::default());
        assert_eq!(merged.provenance("a").source, DataSource::Live);
    }

    #[test]
    fn test_network_and_prices_merge() {
        let mut live = Snapshot::default();
        live.prices.insert("DESO".to_string(), 0.0);
        let mut fallback = Snapshot::default();
        fallback.prices.insert("DESO".to_string(), 6.0);
        fallback.network.total_issued = 100.0;
        let mut cached = Snapshot::default();
        cached.network.total_issued = 120.0;

        let merged = merge_snapshots(&live, Some(&cached), &fallback).snapshot;
        assert_eq!(merged.prices["DESO"], 6.0);
        assert_eq!(merged.network.total_issued, 120.0);
    }

    #[test]
    fn test_names_prefer_live() {
        let mut live = Snapshot::default();
        live.names.insert("k".to_string(), "fresh".to_string());
        let mut fallback = Snapshot::default();
        fallback.names.insert("k".to_string(), "old".to_string());
        fallback.names.insert("j".to_string(), "only".to_string());

        let merged = merge_snapshots(&live, None, &fallback).snapshot;
        assert_eq!(merged.names["k"], "fresh");
        assert_eq!(merged.names["j"], "only");
    }

    #[test]
    fn test_failed_account_without_cache_is_not_live() {
        let live = Snapshot::empty_at(Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap());
        let mut fallback = Snapshot::default();
        fallback
            .accounts
            .insert("a".to_string(), AccountRecord::default());

        let merged = merge_snapshots(&live, None, &fallback);
        assert_eq!(merged.provenance("a").source, DataSource::Static);
    }

    #[test]
    fn test_promote_keeps_cached_for_failed_fields() {
        let live = Snapshot::empty_at(Utc.with_ymd_and_hms(2024, 1, 1, 5, 0, 0).unwrap());
        let cached = snapshot_with("a", record(8.0, 0.0), 1);

        let promoted = promote(&live, Some(&cached));
        assert_eq!(promoted.accounts["a"].balances["DESO"], 8.0);
        assert_eq!(promoted.observed_at, live.observed_at);
        // The carried-over record keeps its original fetch time
        assert_eq!(promoted.accounts["a"].observed_at, cached.observed_at);
    }

    #[test]
    fn test_record_timestamp_survives_repeated_promotion() {
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        let mut cached = snapshot_with("a", record(8.0, 0.0), 3);
        if let Some(r) = cached.accounts.get_mut("a") {
            r.observed_at = Some(first);
        }

        let live = Snapshot::empty_at(Utc.with_ymd_and_hms(2024, 1, 1, 5, 0, 0).unwrap());
        let merged = merge_snapshots(&live, Some(&cached), &Snapshot::default());

        assert_eq!(merged.provenance("a").source, DataSource::Cached);
        assert_eq!(merged.provenance("a").observed_at, Some(first));
        assert_eq!(merged.snapshot.accounts["a"].observed_at, Some(first));
    }
}
