//! Wire-to-canonical conversion.
//!
//! Each function takes one decoded response and either yields canonical
//! records or fails with `MalformedResponse`. Amounts are normalized here and
//! nowhere else.

use std::collections::BTreeMap;

use super::types::{
    ExchangeRateResponse, GraphQlResponse, HoldersResponse, HodlEntry, LockedAggregateData,
    ProfileResponse, StakeEntriesResponse, UserEntry, UsersResponse, ValidatorsResponse,
    WireAmount,
};
use super::{AccountIdentity, HolderEntry, HolderPage, ValidatorInfo};
use crate::model::{sanitize_amount, StakeEntry, TokenSpec, TokenSymbol};
use crate::reconcile::units::{normalize, to_decimal};
use crate::utils::config::NATIVE_DECIMALS;
use crate::utils::error::SourceError;

/// Normalize a wire amount with the given exponent
pub fn wire_amount(amount: &WireAmount, decimals: u32) -> Result<f64, SourceError> {
    let value = match amount {
        WireAmount::Number(n) => to_decimal(u128::from(*n), decimals),
        WireAmount::Text(text) => normalize(text, decimals)?,
    };
    Ok(sanitize_amount(value))
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn identity(response: ProfileResponse) -> Result<AccountIdentity, SourceError> {
    let profile = response
        .profile
        .ok_or_else(|| SourceError::malformed("profile missing from response"))?;
    let account_id = non_empty(&profile.public_key)
        .ok_or_else(|| SourceError::malformed("profile has no public key"))?;
    Ok(AccountIdentity {
        account_id,
        username: non_empty(&profile.username),
    })
}

/// Circulating amount of a DAO token from its creator's profile
pub fn token_supply(response: ProfileResponse, token: &TokenSpec) -> Result<f64, SourceError> {
    let profile = response
        .profile
        .ok_or_else(|| SourceError::malformed(format!("profile for {} missing", token.symbol)))?;
    match profile.dao_coin_entry {
        Some(entry) => wire_amount(&entry.coins_in_circulation, token.decimals()),
        None => Ok(0.0),
    }
}

/// Find one user in a users response
pub fn single_user(response: UsersResponse, account_id: &str) -> Result<UserEntry, SourceError> {
    response
        .user_list
        .unwrap_or_default()
        .into_iter()
        .find(|u| u.public_key == account_id)
        .ok_or_else(|| SourceError::malformed(format!("user {} missing from response", account_id)))
}

/// Spendable balances of one user for every roster token
///
/// Tokens the user does not hold are present with zero.
pub fn balances(user: &UserEntry, tokens: &[TokenSpec]) -> Result<BTreeMap<TokenSymbol, f64>, SourceError> {
    let holdings = user.users_you_hodl.as_deref().unwrap_or_default();
    let mut balances = BTreeMap::new();

    for token in tokens {
        let amount = if token.is_native() {
            to_decimal(u128::from(user.balance_nanos), token.decimals())
        } else {
            match &token.creator {
                Some(creator) => holdings
                    .iter()
                    .filter(|h| &h.creator == creator && h.is_dao_coin)
                    .map(|h| wire_amount(&h.balance, token.decimals()))
                    .sum::<Result<f64, SourceError>>()?,
                None => 0.0,
            }
        };
        balances.insert(token.symbol.clone(), sanitize_amount(amount));
    }
    Ok(balances)
}

/// Usernames by public key
pub fn usernames(response: UsersResponse) -> BTreeMap<String, String> {
    response
        .user_list
        .unwrap_or_default()
        .into_iter()
        .filter_map(|user| {
            let username = user.profile.as_ref().and_then(|p| non_empty(&p.username))?;
            Some((user.public_key, username))
        })
        .collect()
}

pub fn stake_entries(response: StakeEntriesResponse) -> Result<Vec<StakeEntry>, SourceError> {
    response
        .stake_entries
        .unwrap_or_default()
        .into_iter()
        .map(|entry| {
            let amount = wire_amount(&entry.amount, NATIVE_DECIMALS)?;
            Ok(StakeEntry::new(entry.staker, entry.validator, amount))
        })
        .collect()
}

pub fn validators(response: ValidatorsResponse) -> Result<Vec<ValidatorInfo>, SourceError> {
    response
        .validator_entries
        .unwrap_or_default()
        .into_iter()
        .map(|entry| {
            Ok(ValidatorInfo {
                reported_total: wire_amount(&entry.total_stake, NATIVE_DECIMALS)?,
                display_name: entry
                    .extra_data
                    .get("DisplayName")
                    .and_then(|name| non_empty(name)),
                validator_id: entry.public_key,
            })
        })
        .collect()
}

/// One page of a token's holder list
///
/// The cursor is the last key of the page; a short page (or an empty cursor)
/// ends pagination.
pub fn holder_page(
    response: HoldersResponse,
    token: &TokenSpec,
    page_size: usize,
) -> Result<HolderPage, SourceError> {
    let hodlers: Vec<HodlEntry> = response.hodlers.unwrap_or_default();
    let full_page = hodlers.len() >= page_size;

    let holders = hodlers
        .into_iter()
        .map(|h| {
            Ok(HolderEntry {
                amount: wire_amount(&h.balance, token.decimals())?,
                username: h.profile.as_ref().and_then(|p| non_empty(&p.username)),
                account_id: h.holder,
            })
        })
        .collect::<Result<Vec<_>, SourceError>>()?;

    let next_cursor = if full_page {
        non_empty(&response.last_public_key)
    } else {
        None
    };
    Ok(HolderPage {
        holders,
        next_cursor,
    })
}

/// USD per native coin; `None` when the feed reports zero
pub fn usd_price(response: ExchangeRateResponse) -> Option<f64> {
    if response.usd_cents_per_deso == 0 {
        None
    } else {
        Some(response.usd_cents_per_deso as f64 / 100.0)
    }
}

pub fn ccv1_locked(response: GraphQlResponse<LockedAggregateData>) -> Result<f64, SourceError> {
    if let Some(error) = response.errors.as_ref().and_then(|e| e.first()) {
        return Err(SourceError::malformed(format!("GraphQL error: {}", error.message)));
    }
    let data = response
        .data
        .ok_or_else(|| SourceError::malformed("GraphQL response has no data"))?;
    match data.profiles.aggregates.sum.deso_locked_nanos {
        Some(amount) => wire_amount(&amount, NATIVE_DECIMALS),
        None => Ok(0.0),
    }
}
