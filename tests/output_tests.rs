mod common;

use pretty_assertions::assert_eq;

use common::{clock, scenario_roster, MockSource};
use deso_circulation::commands::validate_report_file;
use deso_circulation::cycle::run_cycle;
use deso_circulation::model::DataSource;
use deso_circulation::output::{read_report, render_summary, write_report};
use deso_circulation::sources::Sources;
use deso_circulation::store::{FileSnapshotStore, SnapshotStore};
use deso_circulation::utils::FixedClock;

#[tokio::test]
async fn test_report_file_round_trip_and_validate() {
    let dir = tempfile::tempdir().unwrap();
    let roster = scenario_roster();
    let source = MockSource::scenario();
    let store = FileSnapshotStore::new(dir.path().join("cache.json"));

    let report = run_cycle(Sources::from_single(&source), &roster, &store, &clock())
        .await
        .report;

    let path = dir.path().join("out/circulation.json");
    write_report(&report, &path).unwrap();
    assert_eq!(read_report(&path).unwrap(), report);
    assert!(validate_report_file(&path).is_ok());
}

#[tokio::test]
async fn test_validate_rejects_tampered_report() {
    let dir = tempfile::tempdir().unwrap();
    let roster = scenario_roster();
    let source = MockSource::scenario();
    let store = FileSnapshotStore::new(dir.path().join("cache.json"));

    let mut report = run_cycle(Sources::from_single(&source), &roster, &store, &clock())
        .await
        .report;
    report.supply_tree.children[0].amount += 1.0;

    let path = dir.path().join("circulation.json");
    write_report(&report, &path).unwrap();
    assert!(validate_report_file(&path).is_err());
}

#[tokio::test]
async fn test_file_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("cache.json");
    let roster = scenario_roster();

    {
        let store = FileSnapshotStore::new(&cache_path);
        let online = MockSource::scenario();
        let outcome = run_cycle(Sources::from_single(&online), &roster, &store, &clock()).await;
        assert!(outcome.promoted);
    }

    // A fresh store over the same file, with every upstream down
    let store = FileSnapshotStore::new(&cache_path);
    assert!(store.load().unwrap().is_some());
    let offline = MockSource {
        offline: true,
        ..MockSource::default()
    };
    let later = FixedClock(common::at(2024, 6, 2));
    let outcome = run_cycle(Sources::from_single(&offline), &roster, &store, &later).await;

    assert!(!outcome.promoted);
    assert_eq!(outcome.report.freshness.source, DataSource::Cached);
    assert_eq!(outcome.report.freshness.cached_observed_at, Some(clock().0));
    assert_eq!(outcome.report.totals.free_float, 3500.0);
}

#[tokio::test]
async fn test_summary_lists_tree_and_totals() {
    let dir = tempfile::tempdir().unwrap();
    let roster = scenario_roster();
    let source = MockSource::scenario();
    let store = FileSnapshotStore::new(dir.path().join("cache.json"));

    let report = run_cycle(Sources::from_single(&source), &roster, &store, &clock())
        .await
        .report;
    let summary = render_summary(&report);

    assert!(summary.contains("Total Supply"));
    assert!(summary.contains("  Staked"));
    assert!(summary.contains("Free Float"));
    assert!(summary.contains("free float:   3,500.00"));
    assert!(summary.contains("Source: Live"));
}
