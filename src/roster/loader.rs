//! Roster loading and validation.

use log::{debug, info};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use super::{Roster, RosterConfig};
use crate::utils::error::ConfigError;

/// Load the roster from a TOML file
///
/// # Arguments
/// * `path` - Path to the roster TOML
///
/// # Errors
/// * `ConfigError::Io` - If the file cannot be read
/// * `ConfigError::Parse` - If the TOML is invalid
/// * `ConfigError::Invalid` - If the roster fails validation
///
/// # Example
/// ```ignore
/// let roster = load_roster("roster.toml")?;
/// ```
pub fn load_roster(path: impl AsRef<Path>) -> Result<Roster, ConfigError> {
    let path = path.as_ref();
    debug!("Reading roster from: {}", path.display());

    let contents = fs::read_to_string(path)?;
    let roster = parse_roster(&contents)?;

    info!(
        "Loaded roster: {} accounts, {} tokens, {} core validators",
        roster.accounts().len(),
        roster.tokens().len(),
        roster.config().validators.len()
    );
    Ok(roster)
}

/// Parse and validate roster TOML held in memory
pub fn parse_roster(contents: &str) -> Result<Roster, ConfigError> {
    let config: RosterConfig = toml::from_str(contents)?;
    validate(&config)?;
    Ok(Roster::from_config(config))
}

fn validate(config: &RosterConfig) -> Result<(), ConfigError> {
    if config.accounts.is_empty() {
        return Err(invalid("roster has no accounts"));
    }

    if config.top_n == 0 {
        return Err(invalid("top_n must be greater than 0"));
    }

    check_number("total_issued_supply", config.total_issued_supply)?;
    check_number("materiality_threshold", config.materiality_threshold)?;

    let native_count = config.tokens.iter().filter(|t| t.is_native()).count();
    if native_count != 1 {
        return Err(invalid(format!(
            "exactly one native token is required, found {}",
            native_count
        )));
    }

    let mut symbols = HashSet::new();
    for token in &config.tokens {
        if !symbols.insert(token.symbol.as_str()) {
            return Err(invalid(format!("duplicate token symbol {}", token.symbol)));
        }
        if let Some(price) = token.static_usd_price {
            check_number(&format!("tokens.{}.static_usd_price", token.symbol), price)?;
        }
        if let Some(supply) = token.static_supply {
            check_number(&format!("tokens.{}.static_supply", token.symbol), supply)?;
        }
    }

    let mut keys = HashSet::new();
    for spec in &config.accounts {
        if spec.id.is_none() && spec.username.is_none() {
            return Err(invalid("every account needs an id or a username"));
        }
        let key = spec.key();
        if !keys.insert(key.clone()) {
            return Err(invalid(format!("duplicate account {}", key)));
        }
        for (symbol, amount) in &spec.static_balances {
            check_number(&format!("accounts.{}.static_balances.{}", key, symbol), *amount)?;
        }
        for (validator, amount) in &spec.static_stakes {
            check_number(&format!("accounts.{}.static_stakes.{}", key, validator), *amount)?;
        }
    }

    let mut validator_ids = HashSet::new();
    for validator in &config.validators {
        if !validator_ids.insert(validator.id.as_str()) {
            return Err(invalid(format!("duplicate validator {}", validator.id)));
        }
        if let Some(total) = validator.static_total {
            check_number(&format!("validators.{}.static_total", validator.id), total)?;
        }
    }

    if config.fetch.concurrency == 0 {
        return Err(invalid("fetch.concurrency must be greater than 0"));
    }
    if config.fetch.max_attempts == 0 {
        return Err(invalid("fetch.max_attempts must be greater than 0"));
    }

    Ok(())
}

fn check_number(field: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(format!(
            "{} must be a finite non-negative number, got {}",
            field, value
        )));
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}
