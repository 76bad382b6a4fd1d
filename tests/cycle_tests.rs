mod common;

use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;

use common::{at, clock, scenario_roster, MockSource};
use deso_circulation::aggregator::verify_report;
use deso_circulation::cycle::run_cycle;
use deso_circulation::model::{AccountRecord, DataIssue, DataSource, Snapshot};
use deso_circulation::roster::parse_roster;
use deso_circulation::sources::{fetch_live_snapshot, HolderEntry, Sources};
use deso_circulation::store::{MemorySnapshotStore, SnapshotEnvelope, SnapshotStore};
use deso_circulation::utils::FixedClock;

fn amount(report: &deso_circulation::model::CirculationReport, path: &[&str]) -> Option<f64> {
    report.supply_tree.find(path).map(|n| n.amount)
}

// ============================================================================
// Scenario
// ============================================================================

#[tokio::test]
async fn test_scenario_cycle() {
    let roster = scenario_roster();
    let source = MockSource::scenario();
    let store = MemorySnapshotStore::new();

    let outcome = run_cycle(Sources::from_single(&source), &roster, &store, &clock()).await;
    let report = outcome.report;

    assert_eq!(report.totals.total_issued, 5000.0);
    assert_eq!(report.totals.total_staked, 900.0);
    assert_eq!(report.totals.classified_unstaked, 600.0);
    assert_eq!(report.totals.free_float, 3500.0);

    assert_eq!(amount(&report, &["Staked"]), Some(900.0));
    assert_eq!(amount(&report, &["Staked", "Core Validators"]), Some(400.0));
    assert_eq!(
        amount(&report, &["Staked", "Core Validators", "Foundation", "Account A"]),
        Some(400.0)
    );
    assert_eq!(amount(&report, &["Staked", "Community Validators"]), Some(500.0));
    assert_eq!(
        amount(
            &report,
            &["Staked", "Community Validators", "Community", "Account B"]
        ),
        Some(500.0)
    );
    assert_eq!(
        amount(&report, &["Not Staked", "Foundation", "Account A"]),
        Some(600.0)
    );
    assert_eq!(amount(&report, &["Not Staked", "Free Float"]), Some(3500.0));
    assert_eq!(report.supply_tree.amount, 5000.0);
    assert_eq!(report.supply_tree.usd_value, 50000.0);

    assert_eq!(report.freshness.source, DataSource::Live);
    assert!(!report.freshness.stale);
    assert!(report.freshness.issues.is_empty());
    assert!(verify_report(&report).is_empty());
    assert!(outcome.promoted);
}

#[tokio::test]
async fn test_account_totals_include_stake() {
    let roster = scenario_roster();
    let source = MockSource::scenario();

    let fetched = fetch_live_snapshot(Sources::from_single(&source), &roster, &clock()).await;
    let a = &fetched.snapshot.accounts["A"];

    assert_eq!(a.balances["DESO"], 1000.0);
    assert_eq!(a.stakes["core1"], 400.0);
    assert_eq!(fetched.snapshot.validators["BC1community"].stakers["B"], 500.0);
}

// ============================================================================
// Partial failure
// ============================================================================

#[tokio::test]
async fn test_one_failing_account_falls_back_to_cache() {
    let roster = scenario_roster();
    let mut source = MockSource::scenario();
    source.failing.insert("B".to_string());

    let mut cached = Snapshot::empty_at(at(2024, 5, 1));
    let mut b = AccountRecord::default();
    b.balances.insert("DESO".to_string(), 500.0);
    b.stakes.insert("BC1community".to_string(), 500.0);
    cached.accounts.insert("B".to_string(), b);
    let store = MemorySnapshotStore::with_envelope(SnapshotEnvelope::new(cached, at(2024, 5, 1)));

    let outcome = run_cycle(Sources::from_single(&source), &roster, &store, &clock()).await;
    let report = &outcome.report;

    let by_key: BTreeMap<&str, _> = report
        .accounts
        .iter()
        .map(|a| (a.merge_key.as_str(), a))
        .collect();
    assert_eq!(by_key["A"].provenance.source, DataSource::Live);
    assert_eq!(by_key["B"].provenance.source, DataSource::Cached);
    assert_eq!(by_key["B"].native_balance, 500.0);
    assert_eq!(by_key["B"].unstaked, 0.0);

    assert!(report
        .freshness
        .issues
        .iter()
        .any(|i| matches!(i, DataIssue::TransportFailure { scope, .. } if scope == "account B")));
    assert!(report.freshness.issues.iter().any(|i| matches!(
        i,
        DataIssue::PartialDataFailure {
            failed: 1,
            attempted: 3,
            ..
        }
    )));
    assert_eq!(report.freshness.source, DataSource::Cached);

    assert_eq!(report.supply_tree.amount, 5000.0);
    assert_eq!(report.totals.free_float, 3500.0);
    assert!(verify_report(report).is_empty());

    // The promoted snapshot keeps B's cached values
    assert!(outcome.promoted);
    let stored = store.stored().unwrap();
    assert_eq!(stored.data.accounts["B"].balances["DESO"], 500.0);
    assert_eq!(stored.data.accounts["A"].balances["DESO"], 1000.0);
    assert_eq!(stored.timestamp, clock().0);
}

// ============================================================================
// Promotion and staleness
// ============================================================================

#[tokio::test]
async fn test_offline_without_cache_is_stale() {
    let roster = scenario_roster();
    let source = MockSource {
        offline: true,
        ..MockSource::default()
    };
    let store = MemorySnapshotStore::new();

    let outcome = run_cycle(Sources::from_single(&source), &roster, &store, &clock()).await;
    let report = &outcome.report;

    assert!(!outcome.promoted);
    assert!(store.stored().is_none());
    assert!(report.freshness.stale);
    assert_eq!(report.freshness.source, DataSource::Static);
    assert!(report
        .freshness
        .issues
        .iter()
        .any(|i| matches!(i, DataIssue::StaleFallback { .. })));

    // Static defaults still produce a closed tree
    assert_eq!(report.supply_tree.amount, 5000.0);
    assert_eq!(report.totals.free_float, 5000.0);
    assert!(verify_report(report).is_empty());
}

#[tokio::test]
async fn test_offline_keeps_cache_untouched() {
    let roster = scenario_roster();
    let store = MemorySnapshotStore::new();

    let online = MockSource::scenario();
    let first = run_cycle(Sources::from_single(&online), &roster, &store, &clock()).await;
    assert!(first.promoted);
    let saved = store.stored().unwrap();

    let offline = MockSource {
        offline: true,
        ..MockSource::default()
    };
    let later = common::at(2024, 6, 2);
    let second = run_cycle(
        Sources::from_single(&offline),
        &roster,
        &store,
        &FixedClock(later),
    )
    .await;

    assert!(!second.promoted);
    assert_eq!(store.stored(), Some(saved));
    assert!(!second.report.freshness.stale);
    assert_eq!(second.report.freshness.source, DataSource::Cached);
    assert_eq!(second.report.totals, first.report.totals);
    assert!(verify_report(&second.report).is_empty());
}

#[tokio::test]
async fn test_price_only_cycle_is_not_promoted() {
    let roster = scenario_roster();
    let mut source = MockSource::default();
    for id in ["A", "B", "C"] {
        source.failing.insert(id.to_string());
    }
    source.prices.insert("DESO".to_string(), 10.0);
    let store = MemorySnapshotStore::new();

    let first = run_cycle(Sources::from_single(&source), &roster, &store, &clock()).await;

    assert!(!first.promoted);
    assert!(store.stored().is_none());
    assert!(first.report.freshness.stale);
    // Failed accounts are not reported as live
    assert_eq!(first.report.freshness.source, DataSource::Static);
    assert!(first
        .report
        .accounts
        .iter()
        .all(|a| a.provenance.source == DataSource::Static));

    // Nothing was cached, so the next cycle is still stale
    let second = run_cycle(
        Sources::from_single(&source),
        &roster,
        &store,
        &FixedClock(at(2024, 6, 2)),
    )
    .await;
    assert!(second.report.freshness.stale);
    assert!(second
        .report
        .freshness
        .issues
        .iter()
        .any(|i| matches!(i, DataIssue::StaleFallback { .. })));
}

#[tokio::test]
async fn test_repeatedly_failing_account_keeps_original_fetch_time() {
    let roster = scenario_roster();
    let store = MemorySnapshotStore::new();

    let healthy = MockSource::scenario();
    let first = run_cycle(Sources::from_single(&healthy), &roster, &store, &clock()).await;
    assert!(first.promoted);

    let mut degraded = MockSource::scenario();
    degraded.failing.insert("A".to_string());
    let mut last = None;
    for day in [2, 3] {
        let outcome = run_cycle(
            Sources::from_single(&degraded),
            &roster,
            &store,
            &FixedClock(at(2024, 6, day)),
        )
        .await;
        assert!(outcome.promoted);
        last = Some(outcome);
    }
    let report = last.map(|o| o.report).unwrap();

    let a = report.accounts.iter().find(|a| a.merge_key == "A").unwrap();
    assert_eq!(a.provenance.source, DataSource::Cached);
    assert_eq!(a.provenance.observed_at, Some(at(2024, 6, 1)));
    assert_eq!(a.native_balance, 1000.0);

    let b = report.accounts.iter().find(|a| a.merge_key == "B").unwrap();
    assert_eq!(b.provenance.source, DataSource::Live);
    assert_eq!(b.provenance.observed_at, Some(at(2024, 6, 3)));

    let stored = store.stored().unwrap();
    assert_eq!(stored.data.accounts["A"].observed_at, Some(at(2024, 6, 1)));
    assert_eq!(stored.timestamp, at(2024, 6, 3));
}

#[tokio::test]
async fn test_account_summaries_carry_priced_token_balances() {
    let roster = scenario_roster();
    let mut source = MockSource::scenario();
    source.set_balance("A", "PROJ", 40.0);
    let store = MemorySnapshotStore::new();

    let report = run_cycle(Sources::from_single(&source), &roster, &store, &clock())
        .await
        .report;

    let a = report.accounts.iter().find(|a| a.merge_key == "A").unwrap();
    let by_symbol: BTreeMap<&str, _> = a.balances.iter().map(|b| (b.symbol.as_str(), b)).collect();
    assert_eq!(by_symbol["DESO"].amount, 1000.0);
    assert_eq!(by_symbol["DESO"].usd_value, 10000.0);
    // PROJ has no live price, so its static $0.50 applies
    assert_eq!(by_symbol["PROJ"].amount, 40.0);
    assert_eq!(by_symbol["PROJ"].usd_value, 20.0);

    let c = report.accounts.iter().find(|a| a.merge_key == "C").unwrap();
    assert!(c.balances.is_empty());
}

#[tokio::test]
async fn test_outdated_cache_is_ignored() {
    let roster = scenario_roster();
    let mut cached = Snapshot::empty_at(at(2024, 5, 1));
    cached.network.total_issued = 9999.0;
    let mut envelope = SnapshotEnvelope::new(cached, at(2024, 5, 1));
    envelope.schema_version = 0;
    let store = MemorySnapshotStore::with_envelope(envelope);
    assert!(store.load().unwrap().is_none());

    let offline = MockSource {
        offline: true,
        ..MockSource::default()
    };
    let outcome = run_cycle(Sources::from_single(&offline), &roster, &store, &clock()).await;

    assert!(outcome.report.freshness.stale);
    assert_eq!(outcome.report.totals.total_issued, 5000.0);
}

// ============================================================================
// Fetch details
// ============================================================================

#[tokio::test]
async fn test_holder_pages_and_token_section() {
    let roster = scenario_roster();
    let mut source = MockSource::scenario();
    source.holders.insert(
        "PROJ".to_string(),
        (0..150)
            .map(|i| HolderEntry {
                account_id: format!("holder{:03}", i),
                username: None,
                amount: 1.0,
            })
            .collect(),
    );
    source.token_supplies.insert("PROJ".to_string(), 200.0);

    let fetched = fetch_live_snapshot(Sources::from_single(&source), &roster, &clock()).await;
    assert_eq!(fetched.snapshot.holders["PROJ"].len(), 150);
    assert_eq!(source.holder_page_calls.load(Ordering::SeqCst), 2);

    let store = MemorySnapshotStore::new();
    let report = run_cycle(Sources::from_single(&source), &roster, &store, &clock())
        .await
        .report;

    // 200 PROJ at $0.50 against DESO at $10 -> 10 DESO-equivalent
    let project = &report.token_sections[1];
    assert_eq!(project.label, "Project Tokens");
    let proj = project.child("PROJ").unwrap();
    assert!((proj.amount - 10.0).abs() < 1e-9);
    assert!((proj.usd_value - 100.0).abs() < 1e-9);
    assert_eq!(proj.children.len(), 3);
    assert_eq!(proj.children[2].label, "Others");
    assert!(verify_report(&report).is_empty());
}

#[tokio::test]
async fn test_username_roster_entry_is_resolved() {
    let roster = parse_roster(
        r#"
total_issued_supply = 1000.0

[fetch]
max_attempts = 1
backoff_ms = 0

[[tokens]]
symbol = "DESO"
kind = "native"

[[accounts]]
username = "treasury"
category = "foundation"
"#,
    )
    .unwrap();
    let mut source = MockSource {
        total_supply: 1000.0,
        ..MockSource::default()
    };
    source
        .usernames
        .insert("treasury".to_string(), "BC1treasury".to_string());
    source.set_balance("BC1treasury", "DESO", 250.0);
    source.prices.insert("DESO".to_string(), 2.0);

    let store = MemorySnapshotStore::new();
    let report = run_cycle(Sources::from_single(&source), &roster, &store, &clock())
        .await
        .report;

    assert_eq!(report.accounts[0].account_id, "BC1treasury");
    assert_eq!(
        amount(&report, &["Not Staked", "Foundation", "treasury"]),
        Some(250.0)
    );
    assert_eq!(report.totals.free_float, 750.0);
}
