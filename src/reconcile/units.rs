//! Unit normalization for raw ledger amounts.
//!
//! Upstream amounts are fixed-point integers: native balances in nanos
//! (plain decimal integers), DAO token balances as uint256 hex strings.

use crate::utils::error::SourceError;

/// Parse a raw amount string into base units.
///
/// Accepts `0x`-prefixed hex and plain decimal integers. An empty string is zero.
///
/// # Errors
/// * `SourceError::MalformedResponse` - bad digits or a value wider than 128 bits
pub fn parse_raw_amount(raw: &str) -> Result<u128, SourceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }

    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        let digits = hex.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(0);
        }
        if digits.len() > 32 {
            return Err(SourceError::malformed(format!(
                "amount {} overflows 128 bits",
                trimmed
            )));
        }
        return u128::from_str_radix(digits, 16)
            .map_err(|e| SourceError::malformed(format!("bad hex amount {}: {}", trimmed, e)));
    }

    trimmed
        .parse::<u128>()
        .map_err(|e| SourceError::malformed(format!("bad amount {}: {}", trimmed, e)))
}

/// Scale base units down by `10^decimals`.
///
/// Integer and fractional parts are converted separately so 1e18-scaled
/// values keep their precision.
pub fn to_decimal(raw: u128, decimals: u32) -> f64 {
    let Some(scale) = 10u128.checked_pow(decimals) else {
        return 0.0;
    };
    let whole = raw / scale;
    let fraction = raw % scale;
    whole as f64 + fraction as f64 / scale as f64
}

/// Parse and scale in one step
pub fn normalize(raw: &str, decimals: u32) -> Result<f64, SourceError> {
    parse_raw_amount(raw).map(|units| to_decimal(units, decimals))
}
