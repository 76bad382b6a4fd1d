//! Aggregation of reconciled holdings into reportable structures.
//!
//! This module turns stake entries and classified holdings into:
//! - Validators grouped by type (Core / Community)
//! - Top-N + Others ranked buckets
//! - The closed circulation trees
//! - Supply totals and the free-float residual

pub mod free_float;
pub mod top_n;
pub mod tree_builder;
pub mod validators;
pub mod verify;

// Re-export main types and functions
pub use free_float::{compute_supply_totals, free_float, plug_value};
pub use top_n::{rank_order, reduce_top_n};
pub use tree_builder::{
    build_supply_tree, build_token_sections, Holding, StakeGroup, TokenSection, TreeParams,
};
pub use validators::{aggregate_validators, summarize_validators, total_for_type};
pub use verify::{check_tree, verify_report, Violation};
