use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_core::money::ensure_money;
use tally_core::{AccountId, Amount, DomainError, DomainResult, Event, EventId};

/// Request to move `amount` from one account to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub from_account: AccountId,
    pub to_account: AccountId,
    pub amount: Amount,
}

impl TransferRequest {
    pub fn new(from_account: AccountId, to_account: AccountId, amount: Amount) -> Self {
        Self {
            from_account,
            to_account,
            amount,
        }
    }

    /// Reject requests that can never be recorded, before any lock is taken.
    pub fn validate(&self) -> DomainResult<()> {
        if self.amount <= Amount::ZERO {
            return Err(DomainError::invalid_input("amount must be greater than zero"));
        }
        ensure_money(self.amount, "amount")?;
        if self.from_account == self.to_account {
            return Err(DomainError::invalid_input(
                "cannot transfer from an account to itself",
            ));
        }
        Ok(())
    }

    /// Accounts to lock, de-duplicated and in ascending id order.
    ///
    /// Every transfer acquires its locks in this order, so two transfers over the
    /// same pair can never wait on each other in opposite directions.
    pub fn lock_set(&self) -> Vec<AccountId> {
        let mut ids = vec![self.from_account, self.to_account];
        ids.sort();
        ids.dedup();
        ids
    }

    /// The negative half, recorded against the source account.
    pub fn debit(&self, occurred_at: DateTime<Utc>) -> NewTransferEvent {
        NewTransferEvent {
            event_id: EventId::new(),
            aggregate_id: self.from_account,
            from_account: self.from_account,
            to_account: self.to_account,
            amount: -self.amount,
            occurred_at,
        }
    }

    /// The positive half, recorded against the destination account.
    pub fn credit(&self, occurred_at: DateTime<Utc>) -> NewTransferEvent {
        NewTransferEvent {
            event_id: EventId::new(),
            aggregate_id: self.to_account,
            from_account: self.from_account,
            to_account: self.to_account,
            amount: self.amount,
            occurred_at,
        }
    }
}

/// A transfer event ready to be appended (no sequence assigned yet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransferEvent {
    pub event_id: EventId,
    pub aggregate_id: AccountId,
    pub from_account: AccountId,
    pub to_account: AccountId,
    pub amount: Amount,
    pub occurred_at: DateTime<Utc>,
}

impl NewTransferEvent {
    /// Attach the storage-assigned insertion sequence.
    pub fn into_recorded(self, sequence: u64) -> TransferEvent {
        TransferEvent {
            sequence,
            event_id: self.event_id,
            aggregate_id: self.aggregate_id,
            from_account: self.from_account,
            to_account: self.to_account,
            amount: self.amount,
            occurred_at: self.occurred_at,
        }
    }
}

/// One half of a transfer, recorded against exactly one account's timeline.
///
/// Immutable once recorded. `sequence` is the insertion order assigned by the
/// store; replay processes an account's events in ascending `sequence`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferEvent {
    pub sequence: u64,
    pub event_id: EventId,
    pub aggregate_id: AccountId,
    pub from_account: AccountId,
    pub to_account: AccountId,
    /// Negative for the debit half, positive for the credit half.
    pub amount: Amount,
    #[serde(rename = "timestamp")]
    pub occurred_at: DateTime<Utc>,
}

impl TransferEvent {
    pub fn is_debit(&self) -> bool {
        self.amount < Amount::ZERO
    }

    /// True if `self` and `other` are the two halves of the same transfer.
    pub fn pairs_with(&self, other: &TransferEvent) -> bool {
        let (debit, credit) = if self.is_debit() { (self, other) } else { (other, self) };
        debit.from_account == credit.from_account
            && debit.to_account == credit.to_account
            && debit.aggregate_id == debit.from_account
            && credit.aggregate_id == credit.to_account
            && debit.amount + credit.amount == Amount::ZERO
            && debit.is_debit()
            && !credit.is_debit()
    }
}

impl Event for TransferEvent {
    fn event_type(&self) -> &'static str {
        if self.is_debit() {
            "ledger.transfer.debited"
        } else {
            "ledger.transfer.credited"
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(amount: Amount) -> TransferRequest {
        TransferRequest::new(AccountId::new(), AccountId::new(), amount)
    }

    #[test]
    fn positive_amount_between_distinct_accounts_is_valid() {
        assert!(request(dec!(30.00)).validate().is_ok());
    }

    #[test]
    fn zero_and_negative_amounts_are_rejected() {
        for amount in [dec!(0), dec!(-5.00)] {
            let err = request(amount).validate().unwrap_err();
            assert_eq!(err, DomainError::invalid_input("amount must be greater than zero"));
        }
    }

    #[test]
    fn sub_scale_amount_is_rejected() {
        let err = request(dec!(0.00001)).validate().unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn amount_beyond_storage_range_is_rejected() {
        for amount in [dec!(1000000000000000), Amount::MAX] {
            let err = request(amount).validate().unwrap_err();
            assert!(matches!(err, DomainError::InvalidInput(msg) if msg.contains("integer digits")));
        }
    }

    #[test]
    fn self_transfer_is_rejected() {
        let id = AccountId::new();
        let err = TransferRequest::new(id, id, dec!(1)).validate().unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(msg) if msg.contains("itself")));
    }

    #[test]
    fn lock_set_is_sorted_regardless_of_direction() {
        let a = AccountId::new();
        let b = AccountId::new();
        let forward = TransferRequest::new(a, b, dec!(1)).lock_set();
        let backward = TransferRequest::new(b, a, dec!(1)).lock_set();
        assert_eq!(forward, backward);
        assert!(forward[0] < forward[1]);
    }

    #[test]
    fn debit_and_credit_form_a_pair() {
        let req = request(dec!(30.00));
        let now = Utc::now();
        let debit = req.debit(now).into_recorded(1);
        let credit = req.credit(now).into_recorded(2);

        assert_eq!(debit.aggregate_id, req.from_account);
        assert_eq!(debit.amount, dec!(-30.00));
        assert_eq!(credit.aggregate_id, req.to_account);
        assert_eq!(credit.amount, dec!(30.00));
        assert_eq!(debit.occurred_at, credit.occurred_at);
        assert!(debit.pairs_with(&credit));
        assert!(credit.pairs_with(&debit));
        assert_eq!(debit.event_type(), "ledger.transfer.debited");
        assert_eq!(credit.event_type(), "ledger.transfer.credited");
    }

    #[test]
    fn halves_of_different_transfers_do_not_pair() {
        let now = Utc::now();
        let debit = request(dec!(30)).debit(now).into_recorded(1);
        let credit = request(dec!(30)).credit(now).into_recorded(2);
        assert!(!debit.pairs_with(&credit));
    }

    #[test]
    fn serializes_with_ledger_field_names() {
        let req = request(dec!(30.00));
        let event = req.debit(Utc::now()).into_recorded(7);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["aggregateId"], req.from_account.to_string());
        assert_eq!(json["fromAccount"], req.from_account.to_string());
        assert_eq!(json["toAccount"], req.to_account.to_string());
        assert_eq!(json["amount"], "-30.00");
        assert!(json.get("timestamp").is_some());
    }
}
