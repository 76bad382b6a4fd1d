use serde::{Deserialize, Serialize};

use super::account::{AccountId, ValidatorId};

/// Native coin delegated by one staker to one validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeEntry {
    pub staker_id: AccountId,
    pub validator_id: ValidatorId,
    pub staked_amount: f64,
}

impl StakeEntry {
    pub fn new(
        staker_id: impl Into<AccountId>,
        validator_id: impl Into<ValidatorId>,
        staked_amount: f64,
    ) -> Self {
        Self {
            staker_id: staker_id.into(),
            validator_id: validator_id.into(),
            staked_amount,
        }
    }
}

/// Core validators are known infrastructure operators; everything else is Community
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorType {
    Core,
    Community,
}

impl ValidatorType {
    pub fn label(&self) -> &'static str {
        match self {
            ValidatorType::Core => crate::utils::config::LABEL_CORE_VALIDATORS,
            ValidatorType::Community => crate::utils::config::LABEL_COMMUNITY_VALIDATORS,
        }
    }
}

/// A validator with its attributed stake entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    pub validator_id: ValidatorId,
    pub display_name: String,
    pub kind: ValidatorType,
    /// Sum of `members` (derived, never reported)
    pub total_staked: f64,
    /// Total the validator itself reports, zero when unknown
    pub reported_total: f64,
    pub members: Vec<StakeEntry>,
}

impl Validator {
    /// Reported stake that no member entry accounts for
    pub fn unattributed(&self) -> f64 {
        (self.reported_total - self.total_staked).max(0.0)
    }

    /// Stake this validator contributes to the staked total
    pub fn effective_total(&self) -> f64 {
        self.total_staked.max(self.reported_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(total: f64, reported: f64) -> Validator {
        Validator {
            validator_id: "v1".to_string(),
            display_name: "v1".to_string(),
            kind: ValidatorType::Core,
            total_staked: total,
            reported_total: reported,
            members: vec![],
        }
    }

    #[test]
    fn test_unattributed_gap() {
        let v = validator(90.0, 100.0);
        assert_eq!(v.unattributed(), 10.0);
        assert_eq!(v.effective_total(), 100.0);
    }

    #[test]
    fn test_unattributed_never_negative() {
        let v = validator(120.0, 100.0);
        assert_eq!(v.unattributed(), 0.0);
        assert_eq!(v.effective_total(), 120.0);
    }
}
