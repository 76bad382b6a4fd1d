//! Canonical fetched data for one polling cycle.
//!
//! The same shape holds the Live, Cached and Static snapshots. All amounts are
//! decimal (already normalized) and keyed per field so the merge resolver can
//! pick a source field by field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::account::{AccountId, TokenSymbol, ValidatorId};

/// Balances and stakes of one roster account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(default)]
    pub balances: BTreeMap<TokenSymbol, f64>,
    #[serde(default)]
    pub stakes: BTreeMap<ValidatorId, f64>,
    /// When the oldest field in this record was fetched; `None` for static defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
}

impl AccountRecord {
    pub fn is_meaningful(&self) -> bool {
        any_nonzero(&self.balances) || any_nonzero(&self.stakes)
    }
}

/// What a validator reports about itself plus its staker list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatorRecord {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub reported_total: f64,
    #[serde(default)]
    pub stakers: BTreeMap<AccountId, f64>,
}

impl ValidatorRecord {
    pub fn is_meaningful(&self) -> bool {
        self.reported_total > 0.0 || any_nonzero(&self.stakers)
    }
}

/// Network-wide aggregates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    #[serde(default)]
    pub total_issued: f64,
    /// Native coin locked in legacy (CCv1) creator coins
    #[serde(default)]
    pub ccv1_locked: f64,
    /// Reported circulating amount per non-native token
    #[serde(default)]
    pub token_supplies: BTreeMap<TokenSymbol, f64>,
}

/// Everything fetched (or defaulted) for one source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub observed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accounts: BTreeMap<AccountId, AccountRecord>,
    #[serde(default)]
    pub validators: BTreeMap<ValidatorId, ValidatorRecord>,
    /// Holder amounts per token, from the paginated holder lists
    #[serde(default)]
    pub holders: BTreeMap<TokenSymbol, BTreeMap<AccountId, f64>>,
    /// Resolved display names (usernames) by public key
    #[serde(default)]
    pub names: BTreeMap<AccountId, String>,
    /// Roster key -> resolved public key, for roster entries given by username
    #[serde(default)]
    pub identities: BTreeMap<String, AccountId>,
    /// USD spot price per token
    #[serde(default)]
    pub prices: BTreeMap<TokenSymbol, f64>,
    #[serde(default)]
    pub network: NetworkRecord,
}

impl Snapshot {
    pub fn empty_at(observed_at: DateTime<Utc>) -> Self {
        Self {
            observed_at: Some(observed_at),
            ..Self::default()
        }
    }

    /// True when at least one roster account or validator field is nonzero.
    ///
    /// Only meaningful cycles are promoted to the Cached snapshot. Prices,
    /// holder lists and network aggregates do not count: a cycle where every
    /// roster fetch failed says nothing about the roster.
    pub fn is_meaningful(&self) -> bool {
        self.accounts.values().any(AccountRecord::is_meaningful)
            || self.validators.values().any(ValidatorRecord::is_meaningful)
    }
}

fn any_nonzero<K>(map: &BTreeMap<K, f64>) -> bool {
    map.values().any(|v| *v > 0.0)
}

/// Clamp an upstream number to a finite, non-negative value
pub fn sanitize_amount(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
