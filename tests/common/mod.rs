//! In-memory sources and fixtures shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use deso_circulation::model::{AccountId, StakeEntry, TokenSpec, TokenSymbol};
use deso_circulation::roster::{parse_roster, Roster};
use deso_circulation::sources::{
    AccountIdentity, HolderEntry, HolderPage, IndexSource, LedgerSource, PriceOracle,
    ValidatorInfo,
};
use deso_circulation::utils::{FixedClock, SourceError};

/// Three-account roster: A (Foundation), B (Community, named), C (Community, unnamed)
pub const SCENARIO_ROSTER: &str = r#"
total_issued_supply = 5000.0
top_n = 2
materiality_threshold = 0.0

[fetch]
max_attempts = 1
backoff_ms = 0
page_size = 100

[[tokens]]
symbol = "DESO"
kind = "native"
static_usd_price = 10.0

[[tokens]]
symbol = "PROJ"
kind = "project"
creator = "BC1creator"
static_usd_price = 0.5

[[validators]]
id = "core1"
name = "Core One"

[[accounts]]
id = "A"
display_name = "Account A"
category = "foundation"

[[accounts]]
id = "B"
display_name = "Account B"
category = "community"

[[accounts]]
id = "C"
category = "community"
"#;

pub fn scenario_roster() -> Roster {
    parse_roster(SCENARIO_ROSTER).unwrap()
}

pub fn clock() -> FixedClock {
    FixedClock(at(2024, 6, 1))
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

fn unavailable(what: &str) -> SourceError {
    SourceError::HttpStatus {
        status: 503,
        body: format!("{} unavailable", what),
    }
}

/// Programmable stand-in for the node API, indexer and price feed
#[derive(Default)]
pub struct MockSource {
    /// Spendable (unstaked) balances per account id
    pub balances: HashMap<AccountId, BTreeMap<TokenSymbol, f64>>,
    /// username -> account id
    pub usernames: HashMap<String, AccountId>,
    pub stakes: Vec<StakeEntry>,
    pub validators: Vec<ValidatorInfo>,
    pub holders: HashMap<TokenSymbol, Vec<HolderEntry>>,
    pub token_supplies: HashMap<TokenSymbol, f64>,
    pub prices: HashMap<TokenSymbol, f64>,
    pub total_supply: f64,
    pub ccv1_locked: f64,
    /// Accounts whose balance lookups fail
    pub failing: HashSet<AccountId>,
    /// Every call fails
    pub offline: bool,
    pub holder_page_calls: AtomicUsize,
    pub price_calls: AtomicUsize,
}

impl MockSource {
    /// Upstream data for the three-account scenario
    pub fn scenario() -> Self {
        let mut source = MockSource {
            total_supply: 5000.0,
            ..MockSource::default()
        };
        source.set_balance("A", "DESO", 600.0);
        source.set_balance("B", "DESO", 0.0);
        source.set_balance("C", "DESO", 0.0);
        source.stakes = vec![
            StakeEntry::new("A", "core1", 400.0),
            StakeEntry::new("B", "BC1community", 500.0),
        ];
        source.validators = vec![
            ValidatorInfo {
                validator_id: "core1".to_string(),
                display_name: Some("core-one".to_string()),
                reported_total: 400.0,
            },
            ValidatorInfo {
                validator_id: "BC1community".to_string(),
                display_name: None,
                reported_total: 500.0,
            },
        ];
        source.prices.insert("DESO".to_string(), 10.0);
        source
    }

    pub fn set_balance(&mut self, account: &str, symbol: &str, amount: f64) {
        self.balances
            .entry(account.to_string())
            .or_default()
            .insert(symbol.to_string(), amount);
    }

    fn check_online(&self, what: &str) -> Result<(), SourceError> {
        if self.offline {
            Err(unavailable(what))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LedgerSource for MockSource {
    async fn resolve_identity(
        &self,
        account_id: Option<&str>,
        username: Option<&str>,
    ) -> Result<AccountIdentity, SourceError> {
        self.check_online("profile")?;
        match (account_id, username) {
            (_, Some(username)) => self
                .usernames
                .get(username)
                .map(|id| AccountIdentity {
                    account_id: id.clone(),
                    username: Some(username.to_string()),
                })
                .ok_or_else(|| SourceError::malformed(format!("unknown username {}", username))),
            (Some(id), None) => Ok(AccountIdentity {
                account_id: id.to_string(),
                username: self
                    .usernames
                    .iter()
                    .find(|(_, v)| v.as_str() == id)
                    .map(|(k, _)| k.clone()),
            }),
            (None, None) => Err(SourceError::malformed("no id or username")),
        }
    }

    async fn balances(
        &self,
        account_id: &str,
        _tokens: &[TokenSpec],
    ) -> Result<BTreeMap<TokenSymbol, f64>, SourceError> {
        self.check_online("balances")?;
        if self.failing.contains(account_id) {
            return Err(unavailable("balances"));
        }
        Ok(self.balances.get(account_id).cloned().unwrap_or_default())
    }

    async fn account_stakes(&self, account_id: &str) -> Result<Vec<StakeEntry>, SourceError> {
        self.check_online("stake entries")?;
        Ok(self
            .stakes
            .iter()
            .filter(|s| s.staker_id == account_id)
            .cloned()
            .collect())
    }

    async fn validators(&self) -> Result<Vec<ValidatorInfo>, SourceError> {
        self.check_online("validators")?;
        Ok(self.validators.clone())
    }

    async fn validator_stakers(&self, validator_id: &str) -> Result<Vec<StakeEntry>, SourceError> {
        self.check_online("stake entries")?;
        Ok(self
            .stakes
            .iter()
            .filter(|s| s.validator_id == validator_id)
            .cloned()
            .collect())
    }

    async fn usernames(
        &self,
        account_ids: &[AccountId],
    ) -> Result<BTreeMap<AccountId, String>, SourceError> {
        self.check_online("users")?;
        Ok(self
            .usernames
            .iter()
            .filter(|(_, id)| account_ids.contains(id))
            .map(|(name, id)| (id.clone(), name.clone()))
            .collect())
    }

    async fn total_supply(&self) -> Result<f64, SourceError> {
        self.check_online("total supply")?;
        Ok(self.total_supply)
    }

    async fn token_supply(&self, token: &TokenSpec) -> Result<f64, SourceError> {
        self.check_online("profile")?;
        Ok(self.token_supplies.get(&token.symbol).copied().unwrap_or(0.0))
    }
}

#[async_trait]
impl IndexSource for MockSource {
    /// Offset-cursor pages over the configured holder list
    async fn holders_page(
        &self,
        token: &TokenSpec,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<HolderPage, SourceError> {
        self.check_online("holders")?;
        self.holder_page_calls.fetch_add(1, Ordering::SeqCst);

        let all = self.holders.get(&token.symbol).cloned().unwrap_or_default();
        let start: usize = cursor
            .map(|c| c.parse().map_err(|_| SourceError::malformed("bad cursor")))
            .transpose()?
            .unwrap_or(0);
        let end = (start + page_size).min(all.len());
        Ok(HolderPage {
            holders: all.get(start..end).map(<[_]>::to_vec).unwrap_or_default(),
            next_cursor: (end < all.len()).then(|| end.to_string()),
        })
    }

    async fn ccv1_locked(&self) -> Result<f64, SourceError> {
        self.check_online("graphql")?;
        Ok(self.ccv1_locked)
    }
}

#[async_trait]
impl PriceOracle for MockSource {
    async fn usd_price(&self, symbol: &str) -> Result<Option<f64>, SourceError> {
        self.check_online("exchange rate")?;
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.prices.get(symbol).copied())
    }
}
