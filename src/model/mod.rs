//! Canonical data model shared by the reconciliation engine.
//!
//! - Accounts, categories and provenance
//! - Tokens and balances
//! - Stake entries and validators
//! - Fetched snapshots
//! - The serializable report schema

pub mod account;
pub mod schema;
pub mod snapshot;
pub mod stake;
pub mod token;

// Re-export main types
pub use account::{
    short_account_id, AccountId, Category, DataSource, Provenance, TokenSymbol, TrackedAccount,
    ValidatorId,
};
pub use schema::{
    AccountSummary, CirculationNode, CirculationReport, DataIssue, Freshness, Rankable,
    RankedBucket, RankedEntry, SupplyTotals, ValidatorSummary,
};
pub use snapshot::{sanitize_amount, AccountRecord, NetworkRecord, Snapshot, ValidatorRecord};
pub use stake::{StakeEntry, Validator, ValidatorType};
pub use token::{TokenBalance, TokenKind, TokenSpec};
