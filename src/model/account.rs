//! Tracked accounts, holder categories and provenance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Base58 public key of a ledger account
pub type AccountId = String;

/// Ticker of a token (e.g. "DESO", "dUSDC")
pub type TokenSymbol = String;

/// Public key of a validator
pub type ValidatorId = String;

/// Holder category assigned by the static roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Foundation,
    MarketMaker,
    CoreTeam,
    CommunityInfluencer,
    Community,
}

impl Category {
    /// Categories whose holdings are attributed individually (everything but Community)
    pub const CLASSIFIED: [Category; 4] = [
        Category::Foundation,
        Category::MarketMaker,
        Category::CoreTeam,
        Category::CommunityInfluencer,
    ];

    /// Node label used in the circulation tree
    pub fn label(&self) -> &'static str {
        match self {
            Category::Foundation => "Foundation",
            Category::MarketMaker => "Market Makers",
            Category::CoreTeam => "Core Team",
            Category::CommunityInfluencer => "Community Influencers",
            Category::Community => "Community",
        }
    }

    pub fn is_classified(&self) -> bool {
        !matches!(self, Category::Community)
    }
}

/// Which snapshot a value came from.
///
/// Ordered from freshest to coarsest, so `max` yields the most degraded source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Live,
    Cached,
    Static,
}

/// Where and when a value was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub source: DataSource,
    /// `None` for static roster defaults, which were never observed
    pub observed_at: Option<DateTime<Utc>>,
}

impl Provenance {
    pub fn new(source: DataSource, observed_at: Option<DateTime<Utc>>) -> Self {
        Self {
            source,
            observed_at,
        }
    }

    /// The more degraded of two provenances; the older one on a tie
    pub fn coarsest(self, other: Provenance) -> Provenance {
        if other.source != self.source {
            return if other.source > self.source { other } else { self };
        }
        match (self.observed_at, other.observed_at) {
            (Some(a), Some(b)) if b < a => other,
            _ => self,
        }
    }
}

/// One logical holder after merge resolution and alias merging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedAccount {
    /// Id of the first roster entry sharing the merge key
    pub account_id: AccountId,
    pub display_name: Option<String>,
    pub merge_key: String,
    pub category: Category,
    /// Decimal balances per token (already scaled by the unit normalizer)
    pub balances: BTreeMap<TokenSymbol, f64>,
    /// Decimal native-coin stake per validator
    pub stakes: BTreeMap<ValidatorId, f64>,
    pub provenance: Provenance,
}

impl TrackedAccount {
    /// Decimal balance for a token, zero when absent
    pub fn balance(&self, symbol: &str) -> f64 {
        self.balances.get(symbol).copied().unwrap_or(0.0)
    }

    /// Sum of stake across all validators
    pub fn total_staked(&self) -> f64 {
        self.stakes.values().sum()
    }

    /// Label used when the holder is shown individually
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| short_account_id(&self.account_id))
    }
}

/// Abbreviate a public key for display ("BC1YLg…x7Qz")
pub fn short_account_id(account_id: &str) -> String {
    let chars: Vec<char> = account_id.chars().collect();
    if chars.len() <= 12 {
        return account_id.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}
