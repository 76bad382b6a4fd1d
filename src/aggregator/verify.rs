//! Conservation checks over a finished report.
//!
//! Used by the `validate` command and by tests. A report produced by the
//! reconciliation pass should never yield node-level violations; a global
//! imbalance can only appear when upstream figures are inconsistent
//! (e.g. classified holdings larger than the issued supply).

use serde::Serialize;
use std::fmt;

use crate::model::{CirculationNode, CirculationReport, RankedBucket, Rankable};
use crate::utils::config::CONSERVATION_TOLERANCE;

/// One broken invariant
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// An interior node does not equal the sum of its children
    Unbalanced {
        path: String,
        amount: f64,
        children_sum: f64,
    },
    Negative { path: String, amount: f64 },
    NonFinite { path: String },
    /// Staked + Not Staked differs from the issued supply
    GlobalImbalance { expected: f64, actual: f64 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Unbalanced {
                path,
                amount,
                children_sum,
            } => write!(
                f,
                "{}: amount {} != children sum {}",
                path, amount, children_sum
            ),
            Violation::Negative { path, amount } => write!(f, "{}: negative value {}", path, amount),
            Violation::NonFinite { path } => write!(f, "{}: non-finite value", path),
            Violation::GlobalImbalance { expected, actual } => write!(
                f,
                "supply tree totals {} but issued supply is {}",
                actual, expected
            ),
        }
    }
}

/// Relative comparison used for every conservation check
pub fn approx_eq(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= CONSERVATION_TOLERANCE * scale
}

/// Check one tree: finiteness, non-negativity and amount == sum(children)
pub fn check_tree(root: &CirculationNode) -> Vec<Violation> {
    let mut violations = Vec::new();
    walk(root, &root.label, &mut violations);
    violations
}

fn walk(node: &CirculationNode, path: &str, violations: &mut Vec<Violation>) {
    for (label, value) in [("amount", node.amount), ("usd_value", node.usd_value)] {
        if !value.is_finite() {
            violations.push(Violation::NonFinite {
                path: format!("{} ({})", path, label),
            });
        } else if value < 0.0 {
            violations.push(Violation::Negative {
                path: format!("{} ({})", path, label),
                amount: value,
            });
        }
    }

    if node.children.is_empty() {
        return;
    }

    let children_sum: f64 = node.children.iter().map(|c| c.amount).sum();
    if !approx_eq(node.amount, children_sum) {
        violations.push(Violation::Unbalanced {
            path: path.to_string(),
            amount: node.amount,
            children_sum,
        });
    }

    for child in &node.children {
        walk(child, &format!("{} / {}", path, child.label), violations);
    }
}

fn check_bucket<T: Rankable>(name: &str, bucket: &RankedBucket<T>) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (field, value) in [
        ("others_amount", bucket.others_amount),
        ("others_usd", bucket.others_usd),
    ] {
        if !value.is_finite() || value < 0.0 {
            violations.push(Violation::Negative {
                path: format!("{} ({})", name, field),
                amount: value,
            });
        }
    }
    violations
}

/// Check every invariant of a report
///
/// **Public** - used by the `validate` command
///
/// # Returns
/// All violations found; empty when the report is fully closed
pub fn verify_report(report: &CirculationReport) -> Vec<Violation> {
    let mut violations = check_tree(&report.supply_tree);
    for section in &report.token_sections {
        violations.extend(check_tree(section));
    }
    violations.extend(check_bucket("validators", &report.validators));

    let totals = &report.totals;
    for (field, value) in [
        ("totals.free_float", totals.free_float),
        ("totals.total_staked", totals.total_staked),
        ("totals.classified_unstaked", totals.classified_unstaked),
    ] {
        if !value.is_finite() || value < 0.0 {
            violations.push(Violation::Negative {
                path: field.to_string(),
                amount: value,
            });
        }
    }
    for account in &report.accounts {
        if account.unstaked < 0.0 {
            violations.push(Violation::Negative {
                path: format!("accounts / {}", account.merge_key),
                amount: account.unstaked,
            });
        }
    }

    if !approx_eq(report.supply_tree.amount, totals.total_issued) {
        violations.push(Violation::GlobalImbalance {
            expected: totals.total_issued,
            actual: report.supply_tree.amount,
        });
    }

    violations
}
