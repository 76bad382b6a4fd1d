//! Build the circulation trees from aggregated holdings.
//!
//! Every interior node is a pure sum of its children. The only top-down
//! figures are plug leaves ("Unattributed", "Free Float", a token's
//! "Others"), each `max(0, expected - siblings)`, so every level closes.
//!
//! Example native tree:
//! ```text
//! Total Supply
//! ├── Staked
//! │   ├── Core Validators
//! │   │   ├── Foundation
//! │   │   │   └── Treasury
//! │   │   ├── Community
//! │   │   └── Unattributed
//! │   └── Community Validators
//! └── Not Staked
//!     ├── Foundation
//!     └── Free Float
//! ```

use log::debug;

use super::free_float::plug_value;
use super::top_n::reduce_top_n;
use crate::model::{
    short_account_id, Category, CirculationNode, RankedEntry, SupplyTotals, TokenKind,
    TokenSymbol, ValidatorType,
};
use crate::utils::config::{
    LABEL_CCV1_LOCKED, LABEL_FREE_FLOAT, LABEL_NOT_STAKED, LABEL_OTHERS, LABEL_OTHER_NAMED,
    LABEL_PROJECT_TOKENS, LABEL_STAKED, LABEL_TOTAL_SUPPLY, LABEL_UNATTRIBUTED, LABEL_UNNAMED,
    LABEL_WRAPPED_ASSETS,
};

/// Amount attributed to one logical holder
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub holder_key: String,
    /// Resolved display name; `None` means the holder is unnamed
    pub label: Option<String>,
    pub category: Category,
    pub amount: f64,
}

impl Holding {
    fn display_label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| short_account_id(&self.holder_key))
    }
}

/// Staked holdings under one validator type
#[derive(Debug, Clone, PartialEq)]
pub struct StakeGroup {
    pub kind: ValidatorType,
    pub holdings: Vec<Holding>,
    /// Stake the type's validators account for, reported or derived
    pub expected_total: f64,
}

/// Holder list of one non-native token, in token units
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSection {
    pub symbol: TokenSymbol,
    pub kind: TokenKind,
    pub holdings: Vec<Holding>,
    /// Reported circulating amount, zero when unknown
    pub reported_supply: f64,
    pub usd_price: f64,
}

/// Display and valuation parameters shared by every subtree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub native_usd_price: f64,
    pub top_n: usize,
    /// Named Community holders below this native amount collapse into "Other (named)"
    pub materiality_threshold: f64,
}

impl TreeParams {
    fn native_leaf(&self, label: impl Into<String>, amount: f64) -> CirculationNode {
        CirculationNode::leaf(label, amount, amount * self.native_usd_price)
    }

    /// Convert a token amount to native-coin terms through USD
    pub fn native_equivalent(&self, token_amount: f64, token_usd_price: f64) -> f64 {
        if self.native_usd_price > 0.0 {
            token_amount * token_usd_price / self.native_usd_price
        } else {
            0.0
        }
    }
}

/// Build the native supply tree
///
/// **Public** - main entry point for tree building
///
/// # Arguments
/// * `groups` - Staked holdings per validator type
/// * `unstaked` - Unstaked native holdings of classified (non-Community) holders
/// * `totals` - Supply totals; supplies the Free Float plug
/// * `params` - Valuation and display parameters
///
/// # Returns
/// "Total Supply" with "Staked" and "Not Staked" branches
pub fn build_supply_tree(
    groups: &[StakeGroup],
    unstaked: &[Holding],
    totals: &SupplyTotals,
    params: &TreeParams,
) -> CirculationNode {
    let staked_children: Vec<CirculationNode> = groups
        .iter()
        .map(|group| build_validator_type_node(group, params))
        .collect();
    let staked = CirculationNode::branch(LABEL_STAKED, staked_children);

    let mut not_staked_children = category_nodes(
        unstaked.iter().filter(|h| h.category.is_classified()),
        params,
    );
    not_staked_children.push(params.native_leaf(LABEL_FREE_FLOAT, totals.free_float));
    let not_staked = CirculationNode::branch(LABEL_NOT_STAKED, not_staked_children);

    debug!(
        "Built supply tree: staked {:.2}, not staked {:.2}",
        staked.amount, not_staked.amount
    );

    CirculationNode::branch(LABEL_TOTAL_SUPPLY, vec![staked, not_staked])
}

/// One validator-type node: category buckets plus the "Unattributed" plug
fn build_validator_type_node(group: &StakeGroup, params: &TreeParams) -> CirculationNode {
    let mut children = category_nodes(group.holdings.iter(), params);
    if let Some(community) = community_node(
        group
            .holdings
            .iter()
            .filter(|h| h.category == Category::Community),
        params,
    ) {
        children.push(community);
    }

    let unattributed = plug_value(group.expected_total, &children);
    children.push(params.native_leaf(LABEL_UNATTRIBUTED, unattributed));

    CirculationNode::branch(group.kind.label(), children)
}

/// One bucket per classified category that has holders, in category order
fn category_nodes<'h>(
    holdings: impl Iterator<Item = &'h Holding> + Clone,
    params: &TreeParams,
) -> Vec<CirculationNode> {
    Category::CLASSIFIED
        .iter()
        .filter_map(|category| {
            let entries: Vec<RankedEntry> = holdings
                .clone()
                .filter(|h| h.category == *category)
                .map(|h| ranked_native(h, params))
                .collect();
            if entries.is_empty() {
                None
            } else {
                Some(CirculationNode::branch(
                    category.label(),
                    ranked_leaves(entries, params.top_n),
                ))
            }
        })
        .collect()
}

/// Community bucket with two-tier demotion.
///
/// Material named holders are Top-N reduced; small named holders collapse
/// into "Other (named)" and holders without a name into "Unnamed".
fn community_node<'h>(
    holdings: impl Iterator<Item = &'h Holding>,
    params: &TreeParams,
) -> Option<CirculationNode> {
    let mut material = Vec::new();
    let mut other_named = 0.0;
    let mut unnamed = 0.0;
    let mut seen = false;

    for holding in holdings {
        seen = true;
        match &holding.label {
            Some(_) if holding.amount >= params.materiality_threshold => {
                material.push(ranked_native(holding, params));
            }
            Some(_) => other_named += holding.amount,
            None => unnamed += holding.amount,
        }
    }
    if !seen {
        return None;
    }

    let mut children = ranked_leaves(material, params.top_n);
    if other_named > 0.0 {
        children.push(params.native_leaf(LABEL_OTHER_NAMED, other_named));
    }
    if unnamed > 0.0 {
        children.push(params.native_leaf(LABEL_UNNAMED, unnamed));
    }
    Some(CirculationNode::branch(Category::Community.label(), children))
}

fn ranked_native(holding: &Holding, params: &TreeParams) -> RankedEntry {
    RankedEntry::new(
        holding.display_label(),
        holding.amount,
        holding.amount * params.native_usd_price,
    )
}

/// Top-N leaves followed by an "Others" leaf holding the exact tail sum
fn ranked_leaves(entries: Vec<RankedEntry>, top_n: usize) -> Vec<CirculationNode> {
    let bucket = reduce_top_n(entries, top_n);
    let mut leaves: Vec<CirculationNode> = bucket
        .top_entries
        .into_iter()
        .map(|e| CirculationNode::leaf(e.label, e.amount, e.usd_value))
        .collect();
    if bucket.others_count > 0 {
        leaves.push(CirculationNode::leaf(
            LABEL_OTHERS,
            bucket.others_amount,
            bucket.others_usd,
        ));
    }
    leaves
}

/// Build the non-native sections (CCv1, project tokens, wrapped assets)
///
/// **Public** - companion to `build_supply_tree`
///
/// Amounts are native-coin equivalents; USD values are the tokens' own.
pub fn build_token_sections(
    ccv1_locked: f64,
    tokens: &[TokenSection],
    params: &TreeParams,
) -> Vec<CirculationNode> {
    let section = |label: &str, kind: TokenKind| {
        let children = tokens
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| build_token_node(t, params))
            .collect();
        CirculationNode::branch(label, children)
    };

    vec![
        params.native_leaf(LABEL_CCV1_LOCKED, ccv1_locked),
        section(LABEL_PROJECT_TOKENS, TokenKind::Project),
        section(LABEL_WRAPPED_ASSETS, TokenKind::Wrapped),
    ]
}

/// Top-N holders of one token plus an "Others" plug against its supply
fn build_token_node(token: &TokenSection, params: &TreeParams) -> CirculationNode {
    let held: f64 = token.holdings.iter().map(|h| h.amount).sum();
    let supply = if token.reported_supply > 0.0 {
        token.reported_supply
    } else {
        held
    };

    let entries: Vec<RankedEntry> = token
        .holdings
        .iter()
        .map(|h| {
            RankedEntry::new(
                h.display_label(),
                params.native_equivalent(h.amount, token.usd_price),
                h.amount * token.usd_price,
            )
        })
        .collect();
    let bucket = reduce_top_n(entries, params.top_n);

    let mut children: Vec<CirculationNode> = bucket
        .top_entries
        .into_iter()
        .map(|e| CirculationNode::leaf(e.label, e.amount, e.usd_value))
        .collect();

    let expected_amount = params.native_equivalent(supply, token.usd_price);
    let expected_usd = supply * token.usd_price;
    let accounted_usd: f64 = children.iter().map(|c| c.usd_value).sum();
    let others_amount = plug_value(expected_amount, &children);
    let others_usd = (expected_usd - accounted_usd).max(0.0);
    children.push(CirculationNode::leaf(LABEL_OTHERS, others_amount, others_usd));

    CirculationNode::branch(token.symbol.clone(), children)
}
