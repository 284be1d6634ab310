//! Money Conversion Module
//!
//! Unified conversion between client-facing major-unit amounts (`10.50` USD),
//! the minor units the collection provider speaks (`1050` cents) and the loan
//! contract's own scale. All conversions MUST go through this module.
//!
//! ## Internal Representation
//! - Amounts in flight are `u64` minor units (cents)
//! - Client input arrives as `Decimal` (never `f64` arithmetic)
//! - The custodial provider takes and returns major-unit strings (`"10.50"`)
//! - The loan contract uses `CONTRACT_UNITS_PER_MINOR` units per cent

use rust_decimal::RoundingStrategy;
use rust_decimal::prelude::*;
use std::str::FromStr;
use thiserror::Error;

/// Amount in minor currency units (cents for USD)
pub type MinorUnits = u64;

/// Minor units per major unit (USD has 2 decimals)
pub const MINOR_DECIMALS: u32 = 2;

/// Loan contract amount scale: 1 cent == 10 contract units (1 USD == 1000)
pub const CONTRACT_UNITS_PER_MINOR: u64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Amount too large, would overflow")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Precision overflow: {0} has more than 2 decimals")]
    PrecisionOverflow(String),
}

/// Convert a major-unit amount to minor units, rounding half away from zero.
///
/// `10.005` becomes `1001`; `0.004` rounds to zero and is rejected.
pub fn to_minor_units(amount: Decimal) -> Result<MinorUnits, MoneyError> {
    if amount <= Decimal::ZERO {
        return Err(MoneyError::InvalidAmount);
    }
    let scaled = amount
        .checked_mul(Decimal::from(10u64.pow(MINOR_DECIMALS)))
        .ok_or(MoneyError::Overflow)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let minor = scaled.to_u64().ok_or(MoneyError::Overflow)?;
    if minor == 0 {
        return Err(MoneyError::InvalidAmount);
    }
    Ok(minor)
}

/// Render minor units as the major-unit string the custodial provider expects.
///
/// ```
/// use credura_settlement::money::format_major;
/// assert_eq!(format_major(1050), "10.50");
/// ```
pub fn format_major(minor: MinorUnits) -> String {
    // Every u64 fits the 96-bit mantissa
    Decimal::from_i128_with_scale(i128::from(minor), MINOR_DECIMALS).to_string()
}

/// Parse a major-unit string from the custodial provider into minor units.
///
/// Rejects sub-cent precision instead of silently truncating it.
pub fn parse_major(amount: &str) -> Result<MinorUnits, MoneyError> {
    let trimmed = amount.trim();
    if trimmed.starts_with('-') {
        return Err(MoneyError::InvalidAmount);
    }
    let value =
        Decimal::from_str(trimmed).map_err(|_| MoneyError::InvalidFormat(trimmed.to_string()))?;
    if value.normalize().scale() > MINOR_DECIMALS {
        return Err(MoneyError::PrecisionOverflow(trimmed.to_string()));
    }
    let scaled = value
        .checked_mul(Decimal::from(10u64.pow(MINOR_DECIMALS)))
        .ok_or(MoneyError::Overflow)?;
    scaled.to_u64().ok_or(MoneyError::Overflow)
}

/// Scale minor units to the loan contract's amount units.
pub fn to_contract_units(minor: MinorUnits) -> Result<u64, MoneyError> {
    minor
        .checked_mul(CONTRACT_UNITS_PER_MINOR)
        .ok_or(MoneyError::Overflow)
}
