//! Free-float and plug-value calculation.
//!
//! Free float is the one figure that absorbs upstream measurement error, so
//! it is computed last from the other totals and floored at zero.

use log::info;

use super::validators::total_for_type;
use crate::model::{CirculationNode, SupplyTotals, Validator, ValidatorType};

/// Plug leaf value: what the parent must total minus its other children, floored at zero
pub fn plug_value(expected_total: f64, siblings: &[CirculationNode]) -> f64 {
    let accounted: f64 = siblings.iter().map(|c| c.amount).sum();
    (expected_total - accounted).max(0.0)
}

/// `max(0, issued - staked - classified_unstaked)`
pub fn free_float(total_issued: f64, total_staked: f64, classified_unstaked: f64) -> f64 {
    (total_issued - total_staked - classified_unstaked).max(0.0)
}

/// Compute the headline supply figures
///
/// **Public** - main entry point for supply totals
///
/// # Arguments
/// * `total_issued` - Issued native supply (merged)
/// * `validators` - Aggregated validators
/// * `classified_unstaked` - Unstaked native balance of non-Community roster holders
pub fn compute_supply_totals(
    total_issued: f64,
    validators: &[Validator],
    classified_unstaked: f64,
) -> SupplyTotals {
    let total_staked = total_for_type(validators, ValidatorType::Core)
        + total_for_type(validators, ValidatorType::Community);
    let unattributed_stake = validators.iter().map(Validator::unattributed).sum();

    let totals = SupplyTotals {
        total_issued,
        total_staked,
        unattributed_stake,
        classified_unstaked,
        free_float: free_float(total_issued, total_staked, classified_unstaked),
    };

    info!(
        "Supply: issued {:.2} | staked {:.2} | classified unstaked {:.2} | free float {:.2}",
        totals.total_issued, totals.total_staked, totals.classified_unstaked, totals.free_float
    );
    totals
}
