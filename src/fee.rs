//! Fee calculation utilities
//!
//! Two flat 10% charges apply to a loan: the surcharge added to what the
//! borrower is debited, and the premium recorded on-chain with each funding
//! request.

use rust_decimal::Decimal;

/// Percentage added to the requested amount before the collection schedule is built.
pub const COLLECTION_SURCHARGE_PERCENT: u64 = 10;

/// Percentage added to the gross funding amount passed to the loan contract.
pub const FUNDING_PREMIUM_PERCENT: u64 = 10;

/// Apply the collection surcharge to a major-unit amount.
///
/// ```
/// use credura_settlement::fee::apply_surcharge;
/// use rust_decimal::Decimal;
/// assert_eq!(apply_surcharge(Decimal::from(100)), Decimal::from(110));
/// ```
pub fn apply_surcharge(amount: Decimal) -> Decimal {
    amount * Decimal::from(100 + COLLECTION_SURCHARGE_PERCENT) / Decimal::from(100)
}

/// Gross amount plus the funding premium, rounded half up.
///
/// Uses u128 intermediate to prevent overflow; saturates at `u64::MAX`.
#[inline]
pub fn with_premium(gross: u64) -> u64 {
    let total = (gross as u128 * (100 + FUNDING_PREMIUM_PERCENT) as u128 + 50) / 100;
    u64::try_from(total).unwrap_or(u64::MAX)
}
