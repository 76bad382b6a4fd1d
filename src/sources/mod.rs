//! Upstream data sources.
//!
//! The reconciliation engine never talks to the network. It consumes a
//! `Snapshot` that `fetch` assembles from three collaborators:
//! - `LedgerSource`: identities, balances, stake entries, validators, supplies
//! - `IndexSource`: paginated holder lists and network-wide aggregates
//! - `PriceOracle`: spot USD prices
//!
//! `DesoClient` implements all three over HTTP; tests supply in-memory mocks.

pub mod adapter;
pub mod client;
pub mod fetch;
pub mod types;

pub use client::DesoClient;
pub use fetch::{fetch_live_snapshot, in_batches, with_retry, FetchOutcome, RetryPolicy};

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::model::{AccountId, StakeEntry, TokenSpec, TokenSymbol, ValidatorId};
use crate::utils::error::SourceError;

/// Resolved public key and username of an account
#[derive(Debug, Clone, PartialEq)]
pub struct AccountIdentity {
    pub account_id: AccountId,
    pub username: Option<String>,
}

/// What the validator list reports about one validator
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorInfo {
    pub validator_id: ValidatorId,
    pub display_name: Option<String>,
    /// Decimal native-coin stake the validator reports
    pub reported_total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HolderEntry {
    pub account_id: AccountId,
    pub username: Option<String>,
    /// Decimal token amount
    pub amount: f64,
}

/// One page of a holder list
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HolderPage {
    pub holders: Vec<HolderEntry>,
    /// Cursor for the next page; `None` on the last page
    pub next_cursor: Option<String>,
}

/// Per-account ledger queries
#[async_trait]
pub trait LedgerSource: Send + Sync {
    /// Look up an account by public key or username
    async fn resolve_identity(
        &self,
        account_id: Option<&str>,
        username: Option<&str>,
    ) -> Result<AccountIdentity, SourceError>;

    /// Spendable balance of every given token, in decimal units
    async fn balances(
        &self,
        account_id: &str,
        tokens: &[TokenSpec],
    ) -> Result<BTreeMap<TokenSymbol, f64>, SourceError>;

    /// Stake entries where the account is the staker
    async fn account_stakes(&self, account_id: &str) -> Result<Vec<StakeEntry>, SourceError>;

    async fn validators(&self) -> Result<Vec<ValidatorInfo>, SourceError>;

    /// Stake entries delegated to one validator
    async fn validator_stakers(&self, validator_id: &str) -> Result<Vec<StakeEntry>, SourceError>;

    /// Usernames for a batch of public keys; unknown keys are omitted
    async fn usernames(&self, account_ids: &[AccountId])
        -> Result<BTreeMap<AccountId, String>, SourceError>;

    /// Issued native supply
    async fn total_supply(&self) -> Result<f64, SourceError>;

    /// Circulating amount of a non-native token
    async fn token_supply(&self, token: &TokenSpec) -> Result<f64, SourceError>;
}

/// Indexer queries
#[async_trait]
pub trait IndexSource: Send + Sync {
    async fn holders_page(
        &self,
        token: &TokenSpec,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<HolderPage, SourceError>;

    /// Native coin locked in legacy (CCv1) creator coins
    async fn ccv1_locked(&self) -> Result<f64, SourceError>;
}

/// Spot USD prices
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// `Ok(None)` when the oracle has no price for the symbol
    async fn usd_price(&self, symbol: &str) -> Result<Option<f64>, SourceError>;
}

/// The collaborators one fetch cycle uses
#[derive(Clone, Copy)]
pub struct Sources<'a> {
    pub ledger: &'a dyn LedgerSource,
    pub index: &'a dyn IndexSource,
    pub prices: &'a dyn PriceOracle,
}

impl<'a> Sources<'a> {
    /// Use one value for all three roles
    pub fn from_single<S>(source: &'a S) -> Self
    where
        S: LedgerSource + IndexSource + PriceOracle,
    {
        Self {
            ledger: source,
            index: source,
            prices: source,
        }
    }
}
