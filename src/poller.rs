//! The polling loop: one cycle per tick, prices refreshed on their own tick.
//!
//! Roster and store live for the whole loop. Cycles run one after another on
//! the current task, so the store only ever has one writer. A cycle that
//! overruns its interval makes the missed ticks collapse into one; each new
//! report replaces the previous one (last fetch wins).

use async_trait::async_trait;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

use crate::cycle::{run_cycle, CycleOutcome};
use crate::model::{sanitize_amount, TokenSymbol};
use crate::roster::Roster;
use crate::sources::{with_retry, PriceOracle, RetryPolicy, Sources};
use crate::store::SnapshotStore;
use crate::utils::error::SourceError;
use crate::utils::Clock;

/// Timing of the polling loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSettings {
    /// Time between balance/stake cycles
    pub cycle_interval: Duration,
    /// Time between price refreshes
    pub price_interval: Duration,
    /// Stop after this many cycles; `None` runs forever
    pub max_cycles: Option<usize>,
}

/// Latest polled price per symbol, served to the cycles as their oracle
pub struct PolledPrices<'a> {
    upstream: &'a dyn PriceOracle,
    latest: Mutex<BTreeMap<TokenSymbol, f64>>,
}

impl<'a> PolledPrices<'a> {
    pub fn new(upstream: &'a dyn PriceOracle) -> Self {
        Self {
            upstream,
            latest: Mutex::new(BTreeMap::new()),
        }
    }

    /// Poll the upstream for every roster token.
    ///
    /// A failed symbol keeps its last known price. Returns how many prices
    /// were updated.
    pub async fn refresh(&self, roster: &Roster) -> usize {
        let policy = RetryPolicy::from_config(roster.fetch());
        let upstream = self.upstream;
        let mut updated = BTreeMap::new();

        for token in roster.tokens() {
            let symbol = token.symbol.as_str();
            let scope = format!("price {}", symbol);
            match with_retry(policy, &scope, move || upstream.usd_price(symbol)).await {
                Ok(Some(price)) => {
                    updated.insert(token.symbol.clone(), sanitize_amount(price));
                }
                Ok(None) => debug!("No live price for {}", symbol),
                Err(err) => warn!("{}: {}, keeping last price", scope, err),
            }
        }

        let count = updated.len();
        match self.latest.lock() {
            Ok(mut latest) => latest.extend(updated),
            Err(_) => warn!("Price cache lock poisoned; dropping refresh"),
        }
        count
    }

    pub fn latest(&self) -> BTreeMap<TokenSymbol, f64> {
        self.latest
            .lock()
            .map(|latest| latest.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl<'a> PriceOracle for PolledPrices<'a> {
    async fn usd_price(&self, symbol: &str) -> Result<Option<f64>, SourceError> {
        let latest = self
            .latest
            .lock()
            .map_err(|_| SourceError::malformed("price cache lock poisoned"))?;
        Ok(latest.get(symbol).copied())
    }
}

/// Run cycles until `settings.max_cycles` is reached
///
/// **Public** - used by the `watch` command
///
/// # Arguments
/// * `sources` - Upstream collaborators; prices are polled from `sources.prices`
/// * `roster` - Static roster shared by every cycle
/// * `store` - Persistent fallback store shared by every cycle
/// * `clock` - Source of "now"
/// * `settings` - Intervals and cycle limit
/// * `on_cycle` - Receives each cycle's outcome as soon as it completes
///
/// # Returns
/// The number of cycles run
pub async fn run_watch<F>(
    sources: Sources<'_>,
    roster: &Roster,
    store: &dyn SnapshotStore,
    clock: &dyn Clock,
    settings: &PollSettings,
    mut on_cycle: F,
) -> usize
where
    F: FnMut(CycleOutcome),
{
    let prices = PolledPrices::new(sources.prices);
    let cycle_sources = Sources {
        prices: &prices,
        ..sources
    };

    let mut cycle_tick = interval(settings.cycle_interval);
    cycle_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut price_tick = interval(settings.price_interval);
    price_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut cycles = 0;
    loop {
        // Prices first when both are due, so a cycle sees the freshest price
        tokio::select! {
            biased;
            _ = price_tick.tick() => {
                let updated = prices.refresh(roster).await;
                debug!("Refreshed {} prices", updated);
            }
            _ = cycle_tick.tick() => {
                cycles += 1;
                info!("Polling cycle {}", cycles);
                on_cycle(run_cycle(cycle_sources, roster, store, clock).await);
                if settings.max_cycles.is_some_and(|max| cycles >= max) {
                    break;
                }
            }
        }
    }

    info!("Polling stopped after {} cycles", cycles);
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::parse_roster;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingOracle {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PriceOracle for CountingOracle {
        async fn usd_price(&self, symbol: &str) -> Result<Option<f64>, SourceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            match (symbol, call) {
                ("DESO", 0) => Ok(Some(8.0)),
                ("DESO", _) => Err(SourceError::HttpStatus {
                    status: 503,
                    body: "busy".to_string(),
                }),
                _ => Ok(None),
            }
        }
    }

    const ROSTER: &str = r#"
total_issued_supply = 100.0

[fetch]
max_attempts = 1
backoff_ms = 0

[[tokens]]
symbol = "DESO"
kind = "native"

[[accounts]]
id = "A"
category = "foundation"
"#;

    #[tokio::test]
    async fn test_failed_refresh_keeps_last_price() {
        let roster = parse_roster(ROSTER).unwrap();
        let oracle = CountingOracle {
            calls: AtomicUsize::new(0),
        };
        let prices = PolledPrices::new(&oracle);

        assert_eq!(prices.usd_price("DESO").await.unwrap(), None);
        assert_eq!(prices.refresh(&roster).await, 1);
        assert_eq!(prices.refresh(&roster).await, 0);

        assert_eq!(prices.usd_price("DESO").await.unwrap(), Some(8.0));
        assert_eq!(prices.latest().len(), 1);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
    }
}
