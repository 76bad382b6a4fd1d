use serde::{Deserialize, Serialize};

use super::account::{AccountId, TokenSymbol};
use crate::utils::config::{DAO_TOKEN_DECIMALS, NATIVE_DECIMALS};

/// How a token participates in the breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// The ledger's base coin
    Native,
    /// Project / DAO token bought with the native coin
    Project,
    /// Wrapped external asset (dUSDC, dBTC, ...)
    Wrapped,
}

impl TokenKind {
    /// Default fixed-point exponent for the kind
    pub fn default_decimals(&self) -> u32 {
        match self {
            TokenKind::Native => NATIVE_DECIMALS,
            TokenKind::Project | TokenKind::Wrapped => DAO_TOKEN_DECIMALS,
        }
    }
}

/// Static description of a tracked token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSpec {
    pub symbol: TokenSymbol,
    pub kind: TokenKind,
    #[serde(default)]
    pub decimals: Option<u32>,
    /// Account whose holder list defines this token (DAO coin creator)
    #[serde(default)]
    pub creator: Option<AccountId>,
    #[serde(default)]
    pub static_usd_price: Option<f64>,
    /// Known circulating amount, used when the live supply is missing
    #[serde(default)]
    pub static_supply: Option<f64>,
}

impl TokenSpec {
    pub fn decimals(&self) -> u32 {
        self.decimals.unwrap_or_else(|| self.kind.default_decimals())
    }

    pub fn is_native(&self) -> bool {
        self.kind == TokenKind::Native
    }
}

/// A decimal amount of one token with its USD valuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub symbol: TokenSymbol,
    pub amount: f64,
    pub usd_value: f64,
}

impl TokenBalance {
    /// Value an amount at a USD price
    pub fn priced(symbol: impl Into<TokenSymbol>, amount: f64, usd_price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            amount,
            usd_value: amount * usd_price,
        }
    }
}
