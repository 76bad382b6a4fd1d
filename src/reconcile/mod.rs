//! Reconciliation engine.
//!
//! A pure pass from (Live, Cached, Static) snapshots to a closed
//! `CirculationReport`:
//! 1. Merge the snapshots field by field
//! 2. Classify accounts and merge aliases
//! 3. Build stake entries and split balances
//! 4. Aggregate validators and compute supply totals
//! 5. Build the supply tree and token sections

pub mod classifier;
pub mod merge;
pub mod stake;
pub mod units;

pub use classifier::Classifier;
pub use merge::{merge_snapshots, merge_value, promote, MergedSnapshot};
pub use stake::{collect_stake_entries, split_balance, unstaked_balance};
pub use units::{normalize, parse_raw_amount, to_decimal};

use log::{debug, warn};
use std::collections::BTreeMap;

use crate::aggregator::{
    aggregate_validators, build_supply_tree, build_token_sections, compute_supply_totals,
    reduce_top_n, summarize_validators, Holding, TokenSection, TreeParams,
};
use crate::model::{
    AccountSummary, CirculationReport, DataIssue, DataSource, Freshness, Snapshot,
    TokenBalance, TokenSymbol, TrackedAccount,
};
use crate::roster::Roster;
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::Clock;

/// Everything one reconciliation call needs, passed explicitly
pub struct ReconcileContext<'a> {
    /// This cycle's fetch result
    pub live: &'a Snapshot,
    /// Last persisted snapshot; `None` when absent, unreadable or outdated
    pub cached: Option<&'a Snapshot>,
    /// Defaults derived from the roster
    pub static_defaults: &'a Snapshot,
    pub clock: &'a dyn Clock,
    /// Degradations already observed while fetching
    pub issues: &'a [DataIssue],
}

/// Produce a fully closed report from one set of snapshots
///
/// **Public** - main entry point of the engine
///
/// # Arguments
/// * `ctx` - Snapshots, clock and fetch issues
/// * `roster` - Static roster
///
/// # Returns
/// A report whose trees always close; degradation shows up in `freshness`.
/// The same inputs (with a fixed clock) always give the same report.
pub fn reconcile(ctx: &ReconcileContext<'_>, roster: &Roster) -> CirculationReport {
    let merged = merge_snapshots(ctx.live, ctx.cached, ctx.static_defaults);
    let snapshot = &merged.snapshot;
    let classifier = Classifier::new(roster, snapshot);

    let entries = collect_stake_entries(snapshot, &classifier);
    let accounts = classifier.tracked_accounts(&entries, &merged);
    let validators = aggregate_validators(&entries, &snapshot.validators, roster);
    debug!(
        "Reconciling {} holders, {} stake entries, {} validators",
        accounts.len(),
        entries.len(),
        validators.len()
    );

    let native = roster.native_symbol();
    let native_usd_price = snapshot.prices.get(native).copied().unwrap_or(0.0);
    if native_usd_price <= 0.0 {
        warn!("No {} price available; USD values will be zero", native);
    }

    let unstaked: Vec<Holding> = accounts
        .iter()
        .filter(|a| a.category.is_classified())
        .map(|a| Holding {
            holder_key: a.merge_key.clone(),
            label: a.display_name.clone(),
            category: a.category,
            amount: unstaked_balance(a.balance(native), a.total_staked()),
        })
        .collect();
    let classified_unstaked: f64 = unstaked.iter().map(|h| h.amount).sum();
    let totals = compute_supply_totals(
        snapshot.network.total_issued,
        &validators,
        classified_unstaked,
    );

    let params = TreeParams {
        native_usd_price,
        top_n: roster.top_n(),
        materiality_threshold: roster.materiality_threshold(),
    };
    let groups = stake::stake_groups(&validators, &classifier);
    let supply_tree = build_supply_tree(&groups, &unstaked, &totals, &params);
    let token_sections = build_token_sections(
        snapshot.network.ccv1_locked,
        &token_sections(roster, snapshot, &classifier),
        &params,
    );

    let validator_bucket = reduce_top_n(
        summarize_validators(&validators, native_usd_price),
        roster.top_n(),
    );

    CirculationReport {
        version: SCHEMA_VERSION.to_string(),
        generated_at: ctx.clock.now(),
        supply_tree,
        token_sections,
        validators: validator_bucket,
        totals,
        accounts: accounts
            .iter()
            .map(|a| account_summary(a, native, &snapshot.prices))
            .collect(),
        freshness: assess_freshness(ctx, &accounts),
    }
}

/// Holder lists of every non-native roster token
fn token_sections(
    roster: &Roster,
    snapshot: &Snapshot,
    classifier: &Classifier<'_>,
) -> Vec<TokenSection> {
    roster
        .tokens()
        .iter()
        .filter(|t| !t.is_native())
        .map(|token| {
            let holders = snapshot
                .holders
                .get(&token.symbol)
                .map(|h| h.iter().map(|(id, amount)| (id.clone(), *amount)).collect::<Vec<_>>())
                .unwrap_or_default();
            TokenSection {
                symbol: token.symbol.clone(),
                kind: token.kind,
                holdings: classifier.group_holdings(holders),
                reported_supply: snapshot
                    .network
                    .token_supplies
                    .get(&token.symbol)
                    .copied()
                    .unwrap_or(0.0),
                usd_price: snapshot.prices.get(&token.symbol).copied().unwrap_or(0.0),
            }
        })
        .collect()
}

fn account_summary(
    account: &TrackedAccount,
    native: &str,
    prices: &BTreeMap<TokenSymbol, f64>,
) -> AccountSummary {
    let balance = account.balance(native);
    let (staked, unstaked) = split_balance(balance, account.total_staked());
    let balances = account
        .balances
        .iter()
        .filter(|(_, amount)| **amount > 0.0)
        .map(|(symbol, amount)| {
            TokenBalance::priced(
                symbol.clone(),
                *amount,
                prices.get(symbol).copied().unwrap_or(0.0),
            )
        })
        .collect();
    AccountSummary {
        merge_key: account.merge_key.clone(),
        account_id: account.account_id.clone(),
        display_name: account.display_name.clone(),
        category: account.category,
        native_balance: balance,
        staked,
        unstaked,
        balances,
        provenance: account.provenance,
    }
}

/// Decide how current the report is.
///
/// With no meaningful live data and no usable cached snapshot every figure
/// comes from static defaults; that is flagged as stale.
fn assess_freshness(ctx: &ReconcileContext<'_>, accounts: &[TrackedAccount]) -> Freshness {
    let live_ok = ctx.live.is_meaningful();
    let stale = !live_ok && ctx.cached.is_none();

    let mut issues = ctx.issues.to_vec();
    let source = if stale {
        issues.push(DataIssue::StaleFallback {
            reason: "no live data and no usable cached snapshot".to_string(),
        });
        DataSource::Static
    } else {
        accounts
            .iter()
            .map(|a| a.provenance.source)
            .max()
            .unwrap_or(if live_ok {
                DataSource::Live
            } else {
                DataSource::Cached
            })
    };

    Freshness {
        source,
        live_observed_at: ctx.live.observed_at,
        cached_observed_at: ctx.cached.and_then(|c| c.observed_at),
        stale,
        issues,
    }
}
