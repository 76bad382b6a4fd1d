//! Report command implementation.
//!
//! The report command:
//! 1. Loads the roster
//! 2. Connects to the node API and indexer
//! 3. Runs one polling cycle (fetch, reconcile, promote)
//! 4. Writes the report and optionally prints a summary

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::time::Instant;

use super::models::ReportArgs;
use crate::aggregator::verify_report;
use crate::cycle::{run_cycle, CycleOutcome};
use crate::output::{render_summary, write_report};
use crate::roster::{load_roster, Roster};
use crate::sources::{DesoClient, Sources};
use crate::store::FileSnapshotStore;
use crate::utils::SystemClock;

/// Upper bound on the `--top-n` override
const MAX_TOP_N: usize = 1000;

/// Execute the report command
///
/// **Public** - main entry point called from main.rs
///
/// # Arguments
/// * `args` - Report command arguments
///
/// # Returns
/// Ok once the report is written. Upstream failures do not fail the
/// command; they are recorded in the report's freshness block.
///
/// # Errors
/// * Roster load or validation failures
/// * HTTP client construction failures
/// * Report write errors
///
/// # Example
/// ```ignore
/// let args = ReportArgs {
///     roster: PathBuf::from("roster.toml"),
///     print_summary: true,
///     ..Default::default()
/// };
///
/// execute_report(args).await?;
/// ```
pub async fn execute_report(args: ReportArgs) -> Result<()> {
    let start_time = Instant::now();

    // Step 1: Roster
    info!("Step 1/4: Loading roster from {}...", args.roster.display());
    let roster = load_configured_roster(&args)?;

    // Step 2: Collaborators
    info!("Step 2/4: Connecting to {}...", args.api_url);
    let (client, store) = connect(&args, &roster)?;

    // Step 3: Cycle
    info!("Step 3/4: Running reconciliation cycle...");
    let outcome = run_cycle(Sources::from_single(&client), &roster, &store, &SystemClock).await;

    // Step 4: Output
    info!("Step 4/4: Writing report...");
    publish(&outcome, &args)?;

    let elapsed = start_time.elapsed();
    info!("Report completed in {:.2}s", elapsed.as_secs_f64());

    Ok(())
}

/// Load the roster and apply the `--top-n` override
pub(crate) fn load_configured_roster(args: &ReportArgs) -> Result<Roster> {
    let mut roster = load_roster(&args.roster)
        .with_context(|| format!("Failed to load roster {}", args.roster.display()))?;
    if let Some(top_n) = args.top_n {
        roster = roster.with_top_n(top_n);
    }
    debug!(
        "Roster: {} accounts, {} tokens, top {}",
        roster.accounts().len(),
        roster.tokens().len(),
        roster.top_n()
    );
    Ok(roster)
}

/// HTTP client and file store for the configured endpoints
pub(crate) fn connect(args: &ReportArgs, roster: &Roster) -> Result<(DesoClient, FileSnapshotStore)> {
    let client = DesoClient::new(&args.api_url, &args.graphql_url)
        .context("Failed to create DeSo client")?
        .with_native_symbol(roster.native_symbol());
    Ok((client, FileSnapshotStore::new(&args.cache)))
}

/// Check, write and optionally print one cycle's report
pub(crate) fn publish(outcome: &CycleOutcome, args: &ReportArgs) -> Result<()> {
    let report = &outcome.report;

    for violation in verify_report(report) {
        warn!("Conservation check: {}", violation);
    }
    if report.freshness.stale {
        warn!("Report is built from static defaults only");
    }

    write_report(report, &args.output).context("Failed to write report JSON")?;
    info!("✓ Report written to: {}", args.output.display());
    if outcome.promoted {
        info!("✓ Cache updated: {}", args.cache.display());
    }

    if args.print_summary {
        println!("\n{}", "=".repeat(80));
        println!("{}", render_summary(report));
        println!("{}", "=".repeat(80));
    }

    Ok(())
}

/// Validate report arguments
///
/// **Public** - can be called before execute_report for early validation
///
/// # Arguments
/// * `args` - Arguments to validate
///
/// # Returns
/// Ok if arguments are valid, Err with message if not
pub fn validate_args(args: &ReportArgs) -> Result<()> {
    for (name, url) in [("API", &args.api_url), ("GraphQL", &args.graphql_url)] {
        if url.is_empty() {
            anyhow::bail!("{} URL cannot be empty", name);
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("{} URL must start with http:// or https://", name);
        }
    }

    if args.roster.as_os_str().is_empty() {
        anyhow::bail!("Roster path cannot be empty");
    }

    if args.cache == args.output {
        anyhow::bail!("Cache path and output path must differ");
    }

    if let Some(top_n) = args.top_n {
        if top_n == 0 {
            anyhow::bail!("top_n must be greater than 0");
        }
        if top_n > MAX_TOP_N {
            anyhow::bail!("top_n is too large (max {})", MAX_TOP_N);
        }
    }

    Ok(())
}
