//! One polling cycle: read Cached, fetch Live, reconcile, conditionally promote.
//!
//! The store is read once at the start and written at most once at the end.
//! Store failures are logged and recorded as issues, never propagated.

use log::{info, warn};

use crate::model::{CirculationReport, DataIssue};
use crate::reconcile::{promote, reconcile, ReconcileContext};
use crate::roster::Roster;
use crate::sources::{fetch_live_snapshot, Sources};
use crate::store::{SnapshotEnvelope, SnapshotStore};
use crate::utils::Clock;

/// What one cycle produced
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub report: CirculationReport,
    /// True when the Live snapshot was meaningful and was saved as the new Cached one
    pub promoted: bool,
}

/// Run one full cycle against the given sources and store
///
/// **Public** - used by the `report` command and the integration tests
///
/// # Arguments
/// * `sources` - Ledger, index and price collaborators
/// * `roster` - Static roster (also supplies the Static snapshot)
/// * `store` - Persistent fallback store
/// * `clock` - Source of "now" for the snapshot and the report
///
/// # Returns
/// The reconciled report. It is always produced, even when every upstream
/// and the store fail.
pub async fn run_cycle(
    sources: Sources<'_>,
    roster: &Roster,
    store: &dyn SnapshotStore,
    clock: &dyn Clock,
) -> CycleOutcome {
    let mut issues = Vec::new();

    let cached = match store.load() {
        Ok(Some(envelope)) => {
            info!("Using cached snapshot from {}", envelope.timestamp);
            Some(envelope.data)
        }
        Ok(None) => {
            info!("No usable cached snapshot");
            None
        }
        Err(e) => {
            warn!("Cached snapshot unreadable, ignoring it: {}", e);
            issues.push(DataIssue::MalformedResponse {
                scope: "store".to_string(),
                message: e.to_string(),
            });
            None
        }
    };

    let fetched = fetch_live_snapshot(sources, roster, clock).await;
    issues.extend(fetched.issues);
    let live = fetched.snapshot;

    info!("Reconciling...");
    let static_defaults = roster.static_snapshot();
    let mut report = reconcile(
        &ReconcileContext {
            live: &live,
            cached: cached.as_ref(),
            static_defaults: &static_defaults,
            clock,
            issues: &issues,
        },
        roster,
    );

    if !live.is_meaningful() {
        warn!("Live snapshot is empty; keeping the cached snapshot untouched");
        return CycleOutcome {
            report,
            promoted: false,
        };
    }

    info!("Promoting live snapshot to cache");
    let envelope = SnapshotEnvelope::new(promote(&live, cached.as_ref()), clock.now());
    let promoted = match store.save(&envelope) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to save cached snapshot: {}", e);
            report.freshness.issues.push(DataIssue::TransportFailure {
                scope: "store".to_string(),
                message: e.to_string(),
            });
            false
        }
    };

    CycleOutcome { report, promoted }
}
