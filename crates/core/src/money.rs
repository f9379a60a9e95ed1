//! Money values.
//!
//! Balances and transfer amounts are fixed-scale decimals. The ledger stores
//! them as `NUMERIC(19, 4)`: [`MONEY_SCALE`] fractional digits and
//! [`MONEY_INTEGER_DIGITS`] integer digits. Anything finer or larger is
//! rejected at the edge instead of being rounded or refused by storage.

use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};

/// Signed money amount.
pub type Amount = Decimal;

/// Number of fractional digits kept for every amount.
pub const MONEY_SCALE: u32 = 4;

/// Number of integer digits kept for every amount.
pub const MONEY_INTEGER_DIGITS: u32 = 15;

/// Exclusive upper bound on the magnitude of a single amount (10^15).
pub fn money_limit() -> Amount {
    Decimal::from_i128_with_scale(10i128.pow(MONEY_INTEGER_DIGITS), 0)
}

/// Validate that `amount` fits the ledger's money precision and range.
///
/// `what` names the field in the error message (e.g. "balance", "amount").
pub fn ensure_money(amount: Amount, what: &str) -> DomainResult<Amount> {
    if amount.abs() >= money_limit() {
        return Err(DomainError::invalid_input(format!(
            "{what} must have at most {MONEY_INTEGER_DIGITS} integer digits"
        )));
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(DomainError::invalid_input(format!(
            "{what} must have at most {MONEY_SCALE} fractional digits"
        )));
    }
    Ok(amount)
}
