//! Watch command implementation.
//!
//! Loads the roster and connects once, then runs a polling cycle every
//! interval. Each cycle overwrites the report file.

use anyhow::Result;
use log::{info, warn};
use std::time::Duration;

use super::models::WatchArgs;
use super::report::{connect, load_configured_roster, publish, validate_args};
use crate::poller::{run_watch, PollSettings};
use crate::sources::Sources;
use crate::utils::SystemClock;

/// Execute the watch command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Roster load or HTTP client construction failures
///
/// A failed report write is logged and the loop keeps polling.
pub async fn execute_watch(args: WatchArgs) -> Result<()> {
    let roster = load_configured_roster(&args.report)?;
    let (client, store) = connect(&args.report, &roster)?;
    let settings = PollSettings {
        cycle_interval: Duration::from_secs(args.interval_secs),
        price_interval: Duration::from_secs(args.price_interval_secs),
        max_cycles: args.max_cycles,
    };
    info!(
        "Polling every {}s (prices every {}s)",
        args.interval_secs, args.price_interval_secs
    );

    let report_args = &args.report;
    let cycles = run_watch(
        Sources::from_single(&client),
        &roster,
        &store,
        &SystemClock,
        &settings,
        |outcome| {
            if let Err(e) = publish(&outcome, report_args) {
                warn!("Cycle report not written: {:#}", e);
            }
        },
    )
    .await;

    info!("Watch finished after {} cycles", cycles);
    Ok(())
}

/// Validate watch arguments
///
/// **Public** - can be called before execute_watch for early validation
pub fn validate_watch_args(args: &WatchArgs) -> Result<()> {
    validate_args(&args.report)?;

    if args.interval_secs == 0 {
        anyhow::bail!("interval must be greater than 0");
    }
    if args.price_interval_secs == 0 {
        anyhow::bail!("price interval must be greater than 0");
    }
    if args.max_cycles == Some(0) {
        anyhow::bail!("cycles must be greater than 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_watch_args_defaults() {
        assert!(validate_watch_args(&WatchArgs::default()).is_ok());
    }

    #[test]
    fn test_validate_watch_args_zero_interval() {
        let args = WatchArgs {
            interval_secs: 0,
            ..Default::default()
        };
        assert!(validate_watch_args(&args).is_err());
    }

    #[test]
    fn test_validate_watch_args_zero_cycles() {
        let args = WatchArgs {
            max_cycles: Some(0),
            ..Default::default()
        };
        assert!(validate_watch_args(&args).is_err());
    }
}
