//! Static account roster.
//!
//! The roster is loaded once at startup from TOML. It names the tracked
//! accounts and their categories, the Core validator allow-list, the token
//! list, and the static defaults that back the coarsest fallback.

mod loader;

pub use loader::{load_roster, parse_roster};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::model::{
    AccountId, AccountRecord, Category, NetworkRecord, Snapshot, TokenSpec, TokenSymbol,
    ValidatorId, ValidatorRecord, ValidatorType,
};
use crate::utils::config::{
    DEFAULT_BACKOFF_MS, DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, DEFAULT_PAGE_SIZE,
    DEFAULT_TOP_N, MAX_PAGE_SIZE, MIN_PAGE_SIZE,
};

/// One configured account
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AccountSpec {
    /// Public key; may be omitted when `username` is given
    #[serde(default)]
    pub id: Option<AccountId>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,

    /// Accounts sharing a merge key are one logical holder
    #[serde(default)]
    pub merge_key: Option<String>,

    pub category: Category,

    #[serde(default)]
    pub static_balances: BTreeMap<TokenSymbol, f64>,

    #[serde(default)]
    pub static_stakes: BTreeMap<ValidatorId, f64>,
}

impl AccountSpec {
    /// Key under which this account's records live in every snapshot
    pub fn key(&self) -> String {
        match (&self.id, &self.username) {
            (Some(id), _) => id.clone(),
            (None, Some(username)) => format!("@{}", username),
            (None, None) => String::new(),
        }
    }

    pub fn merge_key(&self) -> String {
        self.merge_key.clone().unwrap_or_else(|| self.key())
    }

    /// Configured display name, falling back to the username
    pub fn display_label(&self) -> Option<String> {
        self.display_name.clone().or_else(|| self.username.clone())
    }
}

/// Core validator allow-list entry
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ValidatorSpec {
    pub id: ValidatorId,
    pub name: String,
    #[serde(default)]
    pub static_total: Option<f64>,
}

/// Fan-out, retry and pagination settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FetchConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_BACKOFF_MS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl FetchConfig {
    /// Page size clamped to what the indexing API accepts
    pub fn effective_page_size(&self) -> usize {
        self.page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
    }
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_ms() -> u64 {
    DEFAULT_BACKOFF_MS
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

/// Complete roster file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RosterConfig {
    /// Static default for the issued native supply
    pub total_issued_supply: f64,

    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Named Community holders below this native amount collapse into "Other (named)"
    #[serde(default)]
    pub materiality_threshold: f64,

    #[serde(default)]
    pub tokens: Vec<TokenSpec>,

    /// Core validator allow-list
    #[serde(default)]
    pub validators: Vec<ValidatorSpec>,

    #[serde(default)]
    pub accounts: Vec<AccountSpec>,

    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Validated roster with lookup indexes
#[derive(Debug, Clone)]
pub struct Roster {
    config: RosterConfig,
    by_key: HashMap<String, usize>,
    core_validators: HashMap<ValidatorId, usize>,
}

impl Roster {
    /// Wrap an already-validated config
    pub(crate) fn from_config(config: RosterConfig) -> Self {
        let by_key = config
            .accounts
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.key(), i))
            .collect();
        let core_validators = config
            .validators
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.id.clone(), i))
            .collect();
        Self {
            config,
            by_key,
            core_validators,
        }
    }

    pub fn config(&self) -> &RosterConfig {
        &self.config
    }

    pub fn accounts(&self) -> &[AccountSpec] {
        &self.config.accounts
    }

    pub fn tokens(&self) -> &[TokenSpec] {
        &self.config.tokens
    }

    pub fn fetch(&self) -> &FetchConfig {
        &self.config.fetch
    }

    pub fn top_n(&self) -> usize {
        self.config.top_n
    }

    pub fn materiality_threshold(&self) -> f64 {
        self.config.materiality_threshold
    }

    /// Override the display budget (CLI `--top-n`)
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.config.top_n = top_n;
        self
    }

    /// The native coin spec; validation guarantees exactly one exists
    pub fn native_token(&self) -> Option<&TokenSpec> {
        self.config.tokens.iter().find(|t| t.is_native())
    }

    pub fn native_symbol(&self) -> &str {
        self.native_token()
            .map(|t| t.symbol.as_str())
            .unwrap_or(crate::utils::config::NATIVE_SYMBOL)
    }

    /// Roster entry for a snapshot key
    pub fn account(&self, key: &str) -> Option<&AccountSpec> {
        self.by_key.get(key).map(|&i| &self.config.accounts[i])
    }

    /// Core validators are exactly those on the allow-list
    pub fn validator_type(&self, validator_id: &str) -> ValidatorType {
        if self.core_validators.contains_key(validator_id) {
            ValidatorType::Core
        } else {
            ValidatorType::Community
        }
    }

    pub fn validator_name(&self, validator_id: &str) -> Option<&str> {
        self.core_validators
            .get(validator_id)
            .map(|&i| self.config.validators[i].name.as_str())
    }

    /// Build the coarsest fallback snapshot from static defaults
    pub fn static_snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::default();

        for spec in &self.config.accounts {
            snapshot.accounts.insert(
                spec.key(),
                AccountRecord {
                    balances: spec.static_balances.clone(),
                    stakes: spec.static_stakes.clone(),
                    observed_at: None,
                },
            );
            if let (Some(id), Some(username)) = (&spec.id, &spec.username) {
                snapshot.names.insert(id.clone(), username.clone());
            }
        }

        for spec in &self.config.validators {
            snapshot.validators.insert(
                spec.id.clone(),
                ValidatorRecord {
                    display_name: Some(spec.name.clone()),
                    reported_total: spec.static_total.unwrap_or(0.0),
                    stakers: BTreeMap::new(),
                },
            );
        }

        let mut network = NetworkRecord {
            total_issued: self.config.total_issued_supply,
            ..NetworkRecord::default()
        };
        for token in &self.config.tokens {
            if let Some(price) = token.static_usd_price {
                snapshot.prices.insert(token.symbol.clone(), price);
            }
            if let Some(supply) = token.static_supply {
                network.token_supplies.insert(token.symbol.clone(), supply);
            }
        }
        snapshot.network = network;

        snapshot
    }
}
