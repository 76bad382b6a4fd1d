//! Assemble the Live snapshot for one polling cycle.
//!
//! Failures are caught at the smallest scope (one account, one validator,
//! one page, one token) and turn into a `DataIssue`. A failed account is left
//! out of the Live snapshot so the merge falls back to Cached or Static for it.
//! Nothing here aborts the cycle.

use futures::future::join_all;
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::time::Duration;

use super::{AccountIdentity, IndexSource, LedgerSource, Sources};
use crate::model::{
    sanitize_amount, AccountId, AccountRecord, DataIssue, Snapshot, TokenSpec, TokenSymbol,
    ValidatorRecord,
};
use crate::roster::{AccountSpec, FetchConfig, Roster};
use crate::utils::error::SourceError;
use crate::utils::Clock;

/// Usernames requested per lookup call
const NAME_BATCH_SIZE: usize = 100;

/// Bounded retry with doubling backoff
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

/// Result of a fetch: the Live snapshot and every degradation seen
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchOutcome {
    pub snapshot: Snapshot,
    pub issues: Vec<DataIssue>,
}

/// Run `op` until it succeeds, fails with a non-transport error, or runs out of attempts
///
/// Malformed payloads are not retried; the same request would decode the same way.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, scope: &str, mut op: F) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let mut delay = policy.initial_backoff;
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transport() && attempt < policy.max_attempts => {
                warn!(
                    "{}: attempt {}/{} failed ({}), retrying in {:?}",
                    scope, attempt, policy.max_attempts, err, delay
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Run `f` over `items` with at most `batch_size` futures in flight.
///
/// Each batch settles completely before the next starts. Results keep input order.
pub async fn in_batches<'i, I, T, F, Fut>(items: &'i [I], batch_size: usize, f: F) -> Vec<T>
where
    F: Fn(&'i I) -> Fut,
    Fut: Future<Output = T>,
{
    let mut results = Vec::with_capacity(items.len());
    for chunk in items.chunks(batch_size.max(1)) {
        results.extend(join_all(chunk.iter().map(&f)).await);
    }
    results
}

fn note_partial(issues: &mut Vec<DataIssue>, scope: &str, failed: usize, attempted: usize) {
    if failed > 0 && failed < attempted {
        warn!("{}: {}/{} failed", scope, failed, attempted);
        issues.push(DataIssue::PartialDataFailure {
            scope: scope.to_string(),
            failed,
            attempted,
        });
    }
}

/// Fetch everything the roster needs into a Live snapshot
///
/// **Public** - main entry point of the fetch stage
///
/// # Arguments
/// * `sources` - Ledger, index and price collaborators
/// * `roster` - Accounts, tokens, validators and fan-out settings
/// * `clock` - Stamps the snapshot
pub async fn fetch_live_snapshot(
    sources: Sources<'_>,
    roster: &Roster,
    clock: &dyn Clock,
) -> FetchOutcome {
    let fetch = roster.fetch();
    let policy = RetryPolicy::from_config(fetch);
    let concurrency = fetch.concurrency;
    let mut snapshot = Snapshot::empty_at(clock.now());
    let mut issues = Vec::new();

    // Step 1: Roster accounts
    info!("Step 1/5: Fetching {} roster accounts...", roster.accounts().len());
    let accounts = in_batches(roster.accounts(), concurrency, |spec| {
        fetch_account(sources.ledger, spec, roster, policy)
    })
    .await;
    let mut failed = 0;
    for (spec, result) in roster.accounts().iter().zip(accounts) {
        let key = spec.key();
        match result {
            Ok((identity, mut record)) => {
                if let Some(identity) = identity {
                    if spec.id.is_none() {
                        snapshot
                            .identities
                            .insert(key.clone(), identity.account_id.clone());
                    }
                    if let Some(username) = identity.username {
                        snapshot.names.insert(identity.account_id, username);
                    }
                }
                record.observed_at = snapshot.observed_at;
                snapshot.accounts.insert(key, record);
            }
            Err(err) => {
                warn!("account {}: {}", key, err);
                failed += 1;
                issues.push(DataIssue::from_source_error(format!("account {}", key), &err));
            }
        }
    }
    note_partial(&mut issues, "accounts", failed, roster.accounts().len());

    // Step 2: Validators and their stakers
    info!("Step 2/5: Fetching validators...");
    fetch_validators(sources.ledger, roster, policy, &mut snapshot, &mut issues).await;

    // Step 3: Holder lists and token supplies
    info!("Step 3/5: Fetching token holder lists...");
    fetch_tokens(sources, roster, policy, &mut snapshot, &mut issues).await;

    // Usernames for stakers not already named
    resolve_names(sources.ledger, roster, policy, &mut snapshot, &mut issues).await;

    // Step 4: Network aggregates
    info!("Step 4/5: Fetching network aggregates...");
    let ledger = sources.ledger;
    match with_retry(policy, "total supply", move || ledger.total_supply()).await {
        Ok(total) => snapshot.network.total_issued = total,
        Err(err) => {
            warn!("total supply: {}", err);
            issues.push(DataIssue::from_source_error("total supply", &err));
        }
    }
    let index = sources.index;
    match with_retry(policy, "ccv1 locked", move || index.ccv1_locked()).await {
        Ok(locked) => snapshot.network.ccv1_locked = locked,
        Err(err) => {
            warn!("ccv1 locked: {}", err);
            issues.push(DataIssue::from_source_error("ccv1 locked", &err));
        }
    }

    // Step 5: Prices
    info!("Step 5/5: Fetching prices...");
    for token in roster.tokens() {
        let oracle = sources.prices;
        let symbol = token.symbol.as_str();
        let scope = format!("price {}", symbol);
        match with_retry(policy, &scope, move || oracle.usd_price(symbol)).await {
            Ok(Some(price)) => {
                snapshot
                    .prices
                    .insert(token.symbol.clone(), sanitize_amount(price));
            }
            Ok(None) => debug!("No live price for {}", symbol),
            Err(err) => {
                warn!("{}: {}", scope, err);
                issues.push(DataIssue::from_source_error(scope, &err));
            }
        }
    }

    info!(
        "Fetch complete: {} accounts, {} validators, {} issues",
        snapshot.accounts.len(),
        snapshot.validators.len(),
        issues.len()
    );
    FetchOutcome { snapshot, issues }
}

/// Identity first, then balances and stakes
async fn fetch_account(
    ledger: &dyn LedgerSource,
    spec: &AccountSpec,
    roster: &Roster,
    policy: RetryPolicy,
) -> Result<(Option<AccountIdentity>, AccountRecord), SourceError> {
    let scope = format!("account {}", spec.key());
    let id = spec.id.as_deref();
    let username = spec.username.as_deref();

    let identity = match (id, username) {
        (Some(_), Some(_)) => None,
        (Some(_), None) => {
            // Only needed for a display name
            match with_retry(policy, &scope, move || ledger.resolve_identity(id, None)).await {
                Ok(identity) => Some(identity),
                Err(err) => {
                    debug!("{}: no profile ({})", scope, err);
                    None
                }
            }
        }
        (None, Some(_)) => {
            Some(with_retry(policy, &scope, move || ledger.resolve_identity(None, username)).await?)
        }
        (None, None) => return Err(SourceError::malformed("account has no id or username")),
    };

    let account_id: AccountId = match (id, &identity) {
        (Some(id), _) => id.to_string(),
        (None, Some(identity)) => identity.account_id.clone(),
        (None, None) => return Err(SourceError::malformed("identity could not be resolved")),
    };
    let account = account_id.as_str();
    let tokens = roster.tokens();

    let mut balances = with_retry(policy, &scope, move || ledger.balances(account, tokens)).await?;
    let entries = with_retry(policy, &scope, move || ledger.account_stakes(account)).await?;

    let mut stakes: BTreeMap<String, f64> = BTreeMap::new();
    for entry in entries.into_iter().filter(|e| e.staker_id == account_id) {
        *stakes.entry(entry.validator_id).or_insert(0.0) += entry.staked_amount;
    }

    // Spendable balance excludes stake; the record holds the total
    let staked: f64 = stakes.values().sum();
    if let Some(native) = balances.get_mut(roster.native_symbol()) {
        *native += staked;
    }

    Ok((
        identity,
        AccountRecord {
            balances,
            stakes,
            observed_at: None,
        },
    ))
}

async fn fetch_validators(
    ledger: &dyn LedgerSource,
    roster: &Roster,
    policy: RetryPolicy,
    snapshot: &mut Snapshot,
    issues: &mut Vec<DataIssue>,
) {
    match with_retry(policy, "validator list", move || ledger.validators()).await {
        Ok(infos) => {
            for info in infos {
                snapshot.validators.insert(
                    info.validator_id,
                    ValidatorRecord {
                        display_name: info.display_name,
                        reported_total: info.reported_total,
                        stakers: BTreeMap::new(),
                    },
                );
            }
        }
        Err(err) => {
            warn!("validator list: {}", err);
            issues.push(DataIssue::from_source_error("validator list", &err));
        }
    }

    // Core validators are fetched even when the list call failed
    let ids: Vec<String> = snapshot
        .validators
        .keys()
        .cloned()
        .chain(roster.config().validators.iter().map(|v| v.id.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let results = in_batches(&ids, roster.fetch().concurrency, |id| {
        let scope = format!("validator {}", id);
        async move {
            let id = id.as_str();
            with_retry(policy, &scope, move || ledger.validator_stakers(id)).await
        }
    })
    .await;

    let mut failed = 0;
    for (id, result) in ids.iter().zip(results) {
        let record = snapshot.validators.entry(id.clone()).or_default();
        match result {
            Ok(entries) => {
                for entry in entries.into_iter().filter(|e| &e.validator_id == id) {
                    *record.stakers.entry(entry.staker_id).or_insert(0.0) += entry.staked_amount;
                }
            }
            Err(err) => {
                warn!("validator {}: {}", id, err);
                failed += 1;
                issues.push(DataIssue::from_source_error(format!("validator {}", id), &err));
            }
        }
    }
    note_partial(issues, "validator stakers", failed, ids.len());
}

/// Holder list of one token, pages in sequence
async fn fetch_holders(
    index: &dyn IndexSource,
    token: &TokenSpec,
    page_size: usize,
    policy: RetryPolicy,
) -> (BTreeMap<AccountId, f64>, BTreeMap<AccountId, String>, Option<SourceError>) {
    let mut holders = BTreeMap::new();
    let mut names = BTreeMap::new();
    let mut cursor: Option<String> = None;
    let mut seen_cursors: BTreeSet<String> = BTreeSet::new();
    let mut page_number = 0;

    loop {
        page_number += 1;
        let scope = format!("holders {} page {}", token.symbol, page_number);
        let current = cursor.as_deref();
        let page = match with_retry(policy, &scope, move || {
            index.holders_page(token, current, page_size)
        })
        .await
        {
            Ok(page) => page,
            Err(err) => return (holders, names, Some(err)),
        };

        for holder in page.holders {
            if let Some(username) = holder.username {
                names.insert(holder.account_id.clone(), username);
            }
            *holders.entry(holder.account_id).or_insert(0.0) += holder.amount;
        }

        // A cursor seen before means the upstream is cycling
        match page.next_cursor {
            Some(next) if seen_cursors.insert(next.clone()) => cursor = Some(next),
            Some(next) => {
                warn!("{}: cursor {} repeated, stopping", token.symbol, next);
                break;
            }
            None => break,
        }
    }

    debug!(
        "{}: {} holders over {} pages",
        token.symbol,
        holders.len(),
        page_number
    );
    (holders, names, None)
}

async fn fetch_tokens(
    sources: Sources<'_>,
    roster: &Roster,
    policy: RetryPolicy,
    snapshot: &mut Snapshot,
    issues: &mut Vec<DataIssue>,
) {
    let tokens: Vec<TokenSpec> = roster
        .tokens()
        .iter()
        .filter(|t| !t.is_native() && t.creator.is_some())
        .cloned()
        .collect();
    let concurrency = roster.fetch().concurrency;
    let page_size = roster.fetch().effective_page_size();
    let index = sources.index;
    let ledger = sources.ledger;

    let holder_results = in_batches(&tokens, concurrency, |token| {
        fetch_holders(index, token, page_size, policy)
    })
    .await;

    let mut failed = 0;
    for (token, (holders, names, error)) in tokens.iter().zip(holder_results) {
        if let Some(err) = error {
            warn!("holders {}: {}", token.symbol, err);
            failed += 1;
            issues.push(DataIssue::from_source_error(
                format!("holders {}", token.symbol),
                &err,
            ));
        }
        snapshot.names.extend(names);
        snapshot.holders.insert(token.symbol.clone(), holders);
    }
    note_partial(issues, "holder lists", failed, tokens.len());

    let supply_results = in_batches(&tokens, concurrency, |token| {
        let scope = format!("supply {}", token.symbol);
        async move { with_retry(policy, &scope, move || ledger.token_supply(token)).await }
    })
    .await;

    for (token, result) in tokens.iter().zip(supply_results) {
        let symbol: TokenSymbol = token.symbol.clone();
        match result {
            Ok(supply) => {
                snapshot.network.token_supplies.insert(symbol, supply);
            }
            Err(err) => {
                warn!("supply {}: {}", symbol, err);
                issues.push(DataIssue::from_source_error(format!("supply {}", symbol), &err));
            }
        }
    }
}

/// Look up usernames for stakers that are not already named
async fn resolve_names(
    ledger: &dyn LedgerSource,
    roster: &Roster,
    policy: RetryPolicy,
    snapshot: &mut Snapshot,
    issues: &mut Vec<DataIssue>,
) {
    let unnamed: Vec<AccountId> = snapshot
        .validators
        .values()
        .flat_map(|v| v.stakers.keys())
        .filter(|id| !snapshot.names.contains_key(*id))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if unnamed.is_empty() {
        return;
    }
    debug!("Resolving names for {} stakers", unnamed.len());

    let batches: Vec<Vec<AccountId>> = unnamed
        .chunks(NAME_BATCH_SIZE)
        .map(|chunk| chunk.to_vec())
        .collect();
    let results = in_batches(&batches, roster.fetch().concurrency, |batch| async move {
        with_retry(policy, "usernames", move || ledger.usernames(batch)).await
    })
    .await;

    for result in results {
        match result {
            Ok(names) => snapshot.names.extend(names),
            Err(err) => {
                warn!("usernames: {}", err);
                issues.push(DataIssue::from_source_error("usernames", &err));
            }
        }
    }
}
