//! Output schema definitions for the circulation report.
//!
//! This module defines the structure of the JSON report we write to disk.
//! Schema is versioned to allow future evolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::{AccountId, Category, DataSource, Provenance, ValidatorId};
use super::stake::ValidatorType;
use super::token::TokenBalance;

/// One node of a circulation tree.
///
/// When `children` is non-empty, `amount` and `usd_value` are the sums of the children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CirculationNode {
    pub label: String,

    /// Native-coin (DESO-equivalent) amount
    pub amount: f64,

    pub usd_value: f64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CirculationNode>,
}

impl CirculationNode {
    /// Create a leaf node
    pub fn leaf(label: impl Into<String>, amount: f64, usd_value: f64) -> Self {
        Self {
            label: label.into(),
            amount,
            usd_value,
            children: Vec::new(),
        }
    }

    /// Create an interior node whose totals are the sums of its children
    pub fn branch(label: impl Into<String>, children: Vec<CirculationNode>) -> Self {
        let amount = children.iter().map(|c| c.amount).sum();
        let usd_value = children.iter().map(|c| c.usd_value).sum();
        Self {
            label: label.into(),
            amount,
            usd_value,
            children,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Find a direct child by label
    pub fn child(&self, label: &str) -> Option<&CirculationNode> {
        self.children.iter().find(|c| c.label == label)
    }

    /// Follow a path of labels from this node
    pub fn find(&self, path: &[&str]) -> Option<&CirculationNode> {
        path.iter()
            .try_fold(self, |node, label| node.child(label))
    }
}

/// Anything that can be ranked by the Top-N reducer
pub trait Rankable {
    fn label(&self) -> &str;
    fn amount(&self) -> f64;
    fn usd_value(&self) -> f64;
}

/// A plain (label, amount, usd) entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub label: String,
    pub amount: f64,
    pub usd_value: f64,
}

impl RankedEntry {
    pub fn new(label: impl Into<String>, amount: f64, usd_value: f64) -> Self {
        Self {
            label: label.into(),
            amount,
            usd_value,
        }
    }
}

impl Rankable for RankedEntry {
    fn label(&self) -> &str {
        &self.label
    }

    fn amount(&self) -> f64 {
        self.amount
    }

    fn usd_value(&self) -> f64 {
        self.usd_value
    }
}

/// Top N entries plus a closing "Others" remainder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedBucket<T> {
    pub top_entries: Vec<T>,
    pub others_count: usize,
    pub others_amount: f64,
    pub others_usd: f64,
}

impl<T: Rankable> RankedBucket<T> {
    /// Amount across top entries and Others
    pub fn total_amount(&self) -> f64 {
        self.top_entries.iter().map(|e| e.amount()).sum::<f64>() + self.others_amount
    }

    pub fn total_usd(&self) -> f64 {
        self.top_entries.iter().map(|e| e.usd_value()).sum::<f64>() + self.others_usd
    }
}

/// Ranked view of one validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorSummary {
    pub validator_id: ValidatorId,
    pub display_name: String,
    pub kind: ValidatorType,
    /// Attributed plus unattributed stake
    pub total_staked: f64,
    pub unattributed: f64,
    pub staker_count: usize,
    pub usd_value: f64,
}

impl Rankable for ValidatorSummary {
    fn label(&self) -> &str {
        &self.display_name
    }

    fn amount(&self) -> f64 {
        self.total_staked
    }

    fn usd_value(&self) -> f64 {
        self.usd_value
    }
}

/// Headline supply figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyTotals {
    pub total_issued: f64,
    pub total_staked: f64,
    /// Stake reported by validators but not attributed to any staker
    pub unattributed_stake: f64,
    /// Unstaked native balance of non-Community classified holders
    pub classified_unstaked: f64,
    /// `max(0, total_issued - total_staked - classified_unstaked)`
    pub free_float: f64,
}

impl SupplyTotals {
    /// Native coin not locked with a validator
    pub fn total_unstaked(&self) -> f64 {
        self.classified_unstaked + self.free_float
    }
}

/// A degradation observed while producing the report.
///
/// These never abort a cycle; they are carried alongside the figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataIssue {
    /// Upstream unreachable or answered with a non-success status
    TransportFailure { scope: String, message: String },
    /// Upstream answered but the payload could not be decoded
    MalformedResponse { scope: String, message: String },
    /// Some members of a batch failed
    PartialDataFailure {
        scope: String,
        failed: usize,
        attempted: usize,
    },
    /// No live data and no usable persisted snapshot
    StaleFallback { reason: String },
}

impl DataIssue {
    pub fn from_source_error(scope: impl Into<String>, err: &crate::utils::SourceError) -> Self {
        let scope = scope.into();
        let message = err.to_string();
        if err.is_transport() {
            DataIssue::TransportFailure { scope, message }
        } else {
            DataIssue::MalformedResponse { scope, message }
        }
    }
}

/// How current the report's figures are
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Freshness {
    /// Coarsest source feeding any account
    pub source: DataSource,
    pub live_observed_at: Option<DateTime<Utc>>,
    pub cached_observed_at: Option<DateTime<Utc>>,
    /// True when figures fell back to static roster defaults
    pub stale: bool,
    #[serde(default)]
    pub issues: Vec<DataIssue>,
}

/// Per-holder provenance line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub merge_key: String,
    pub account_id: AccountId,
    pub display_name: Option<String>,
    pub category: Category,
    pub native_balance: f64,
    pub staked: f64,
    pub unstaked: f64,
    /// Every token held, valued at the merged USD price
    #[serde(default)]
    pub balances: Vec<TokenBalance>,
    pub provenance: Provenance,
}

/// Top-level report structure written to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CirculationReport {
    /// Schema version for compatibility checking
    pub version: String,

    pub generated_at: DateTime<Utc>,

    /// Native supply: Staked + Not Staked
    pub supply_tree: CirculationNode,

    /// CCv1, project tokens and wrapped assets, DESO-equivalent
    pub token_sections: Vec<CirculationNode>,

    /// Validators ranked by USD value
    pub validators: RankedBucket<ValidatorSummary>,

    pub totals: SupplyTotals,

    pub accounts: Vec<AccountSummary>,

    pub freshness: Freshness,
}
