//! Wire shapes of the DeSo node and GraphQL APIs.
//!
//! These mirror the JSON exactly (PascalCase fields) and carry raw amounts.
//! Nothing outside `sources` sees them: `adapter` converts them into the
//! canonical model before any merge or classification runs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An amount that may arrive as a JSON number or as a (hex or decimal) string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WireAmount {
    Number(u64),
    Text(String),
}

impl Default for WireAmount {
    fn default() -> Self {
        WireAmount::Number(0)
    }
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProfileRequest {
    #[serde(rename = "PublicKeyBase58Check", skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsersRequest {
    #[serde(rename = "PublicKeysBase58Check")]
    pub public_keys: Vec<String>,
    #[serde(rename = "SkipForLeaderboard")]
    pub skip_for_leaderboard: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HoldersRequest {
    #[serde(rename = "PublicKeyBase58Check")]
    pub creator: String,
    #[serde(rename = "LastPublicKeyBase58Check")]
    pub cursor: String,
    #[serde(rename = "NumToFetch")]
    pub num_to_fetch: usize,
    #[serde(rename = "IsDAOCoin")]
    pub is_dao_coin: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StakeEntriesRequest {
    #[serde(rename = "StakerPublicKeyBase58Check", skip_serializing_if = "Option::is_none")]
    pub staker: Option<String>,
    #[serde(rename = "ValidatorPublicKeyBase58Check", skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidatorsRequest {
    #[serde(rename = "Limit")]
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest {
    pub query: String,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileEntry {
    #[serde(rename = "PublicKeyBase58Check", default)]
    pub public_key: String,
    #[serde(rename = "Username", default)]
    pub username: String,
    #[serde(rename = "DAOCoinEntry", default)]
    pub dao_coin_entry: Option<DaoCoinEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DaoCoinEntry {
    #[serde(rename = "CoinsInCirculationNanos", default)]
    pub coins_in_circulation: WireAmount,
    #[serde(rename = "NumberOfHolders", default)]
    pub number_of_holders: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResponse {
    #[serde(rename = "Profile", default)]
    pub profile: Option<ProfileEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsersResponse {
    #[serde(rename = "UserList", default)]
    pub user_list: Option<Vec<UserEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
    #[serde(rename = "PublicKeyBase58Check")]
    pub public_key: String,
    /// Spendable native balance in nanos
    #[serde(rename = "BalanceNanos", default)]
    pub balance_nanos: u64,
    #[serde(rename = "ProfileEntryResponse", default)]
    pub profile: Option<ProfileEntry>,
    #[serde(rename = "UsersYouHODL", default)]
    pub users_you_hodl: Option<Vec<HodlEntry>>,
}

/// One balance line of a holder list or a user's holdings
#[derive(Debug, Clone, Deserialize)]
pub struct HodlEntry {
    #[serde(rename = "HODLerPublicKeyBase58Check", default)]
    pub holder: String,
    #[serde(rename = "CreatorPublicKeyBase58Check", default)]
    pub creator: String,
    #[serde(rename = "BalanceNanosUint256", default)]
    pub balance: WireAmount,
    #[serde(rename = "IsDAOCoin", default)]
    pub is_dao_coin: bool,
    #[serde(rename = "ProfileEntryResponse", default)]
    pub profile: Option<ProfileEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HoldersResponse {
    #[serde(rename = "Hodlers", default)]
    pub hodlers: Option<Vec<HodlEntry>>,
    #[serde(rename = "LastPublicKeyBase58Check", default)]
    pub last_public_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidatorsResponse {
    #[serde(rename = "ValidatorEntries", default)]
    pub validator_entries: Option<Vec<ValidatorEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidatorEntry {
    #[serde(rename = "ValidatorPublicKeyBase58Check")]
    pub public_key: String,
    #[serde(rename = "TotalStakeAmountNanos", default)]
    pub total_stake: WireAmount,
    #[serde(rename = "ExtraData", default)]
    pub extra_data: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StakeEntriesResponse {
    #[serde(rename = "StakeEntries", default)]
    pub stake_entries: Option<Vec<WireStakeEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireStakeEntry {
    #[serde(rename = "StakerPublicKeyBase58Check")]
    pub staker: String,
    #[serde(rename = "ValidatorPublicKeyBase58Check")]
    pub validator: String,
    #[serde(rename = "StakeAmountNanos", default)]
    pub amount: WireAmount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeRateResponse {
    #[serde(rename = "USDCentsPerDeSoExchangeRate", default)]
    pub usd_cents_per_deso: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

/// `profiles { aggregates { sum { desoLockedNanos } } }`
#[derive(Debug, Clone, Deserialize)]
pub struct LockedAggregateData {
    pub profiles: LockedAggregate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LockedAggregate {
    pub aggregates: LockedAggregates,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LockedAggregates {
    pub sum: LockedSum,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LockedSum {
    #[serde(rename = "desoLockedNanos", default)]
    pub deso_locked_nanos: Option<WireAmount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_amount_accepts_number_and_string() {
        let n: WireAmount = serde_json::from_str("42").unwrap();
        let s: WireAmount = serde_json::from_str("\"0x2a\"").unwrap();
        assert_eq!(n, WireAmount::Number(42));
        assert_eq!(s, WireAmount::Text("0x2a".to_string()));
    }

    #[test]
    fn test_decode_holders_page() {
        let json = r#"{
            "Hodlers": [
                {
                    "HODLerPublicKeyBase58Check": "BC1holder",
                    "CreatorPublicKeyBase58Check": "BC1creator",
                    "BalanceNanosUint256": "0xde0b6b3a7640000",
                    "IsDAOCoin": true,
                    "ProfileEntryResponse": { "Username": "holder" }
                }
            ],
            "LastPublicKeyBase58Check": "BC1holder"
        }"#;
        let response: HoldersResponse = serde_json::from_str(json).unwrap();
        let hodlers = response.hodlers.unwrap();
        assert_eq!(hodlers.len(), 1);
        assert_eq!(hodlers[0].holder, "BC1holder");
        assert_eq!(
            hodlers[0].profile.as_ref().map(|p| p.username.as_str()),
            Some("holder")
        );
        assert_eq!(response.last_public_key, "BC1holder");
    }

    #[test]
    fn test_profile_request_skips_missing_fields() {
        let request = ProfileRequest {
            public_key: None,
            username: Some("whale".to_string()),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({ "Username": "whale" }));
    }
}
