use serde::{Deserialize, Serialize};

use tally_core::money::ensure_money;
use tally_core::{AccountId, Amount, DomainError, DomainResult};

/// An account row.
///
/// `balance` is whatever the reader put there: the stored opening snapshot when
/// it comes straight from storage, or the replayed balance once the engine has
/// folded the account's transfer events onto it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub balance: Amount,
}

impl Account {
    pub fn new(id: AccountId, balance: Amount) -> Self {
        Self { id, balance }
    }

    /// Same account, different balance.
    pub fn with_balance(self, balance: Amount) -> Self {
        Self { balance, ..self }
    }
}

/// Validate the balance an account is opened with.
pub fn validate_opening_balance(balance: Amount) -> DomainResult<Amount> {
    if balance < Amount::ZERO {
        return Err(DomainError::invalid_input("balance must be zero or greater"));
    }
    ensure_money(balance, "balance")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn zero_and_positive_balances_are_accepted() {
        assert_eq!(validate_opening_balance(dec!(0.00)).unwrap(), dec!(0));
        assert_eq!(validate_opening_balance(dec!(100.00)).unwrap(), dec!(100));
    }

    #[test]
    fn negative_balance_is_rejected() {
        let err = validate_opening_balance(dec!(-1.00)).unwrap_err();
        assert_eq!(err, DomainError::invalid_input("balance must be zero or greater"));
    }

    #[test]
    fn balance_beyond_storage_range_is_rejected() {
        let err = validate_opening_balance(Amount::MAX).unwrap_err();
        assert_eq!(
            err,
            DomainError::invalid_input("balance must have at most 15 integer digits")
        );
        assert!(validate_opening_balance(dec!(999999999999999.9999)).is_ok());
    }

    #[test]
    fn negative_zero_is_still_zero() {
        assert!(validate_opening_balance(-dec!(0.00)).is_ok());
    }

    #[test]
    fn with_balance_keeps_identity() {
        let id = AccountId::new();
        let account = Account::new(id, dec!(10)).with_balance(dec!(7.5));
        assert_eq!(account.id, id);
        assert_eq!(account.balance, dec!(7.5));
    }

    #[test]
    fn serializes_balance_as_decimal_string() {
        let account = Account::new(AccountId::new(), dec!(70.00));
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["balance"], "70.00");
    }
}
