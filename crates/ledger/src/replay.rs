//! Balance replay.
//!
//! The current balance of an account is its opening snapshot plus the signed
//! amounts of every transfer event recorded against it, folded in insertion
//! order. Nothing here touches storage: callers hand in the timeline.
//!
//! Every fold is checked: a timeline whose sum leaves the decimal range yields
//! `None` instead of panicking, and callers treat that as a corrupt ledger.

use tally_core::{AccountId, Aggregate, Amount, DomainError, DomainResult, replay};

use crate::transfer::{NewTransferEvent, TransferEvent};

/// Aggregate: an account's balance, rebuilt from its transfer timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBalance {
    id: AccountId,
    balance: Option<Amount>,
    version: u64,
}

impl AccountBalance {
    /// Replay base case: the stored opening snapshot, no events applied.
    pub fn opening(id: AccountId, balance: Amount) -> Self {
        Self {
            id,
            balance: Some(balance),
            version: 0,
        }
    }

    /// Replayed balance; `None` once the timeline overflowed.
    pub fn balance(&self) -> Option<Amount> {
        self.balance
    }

    /// Fold `events` (this account's timeline, in insertion order) onto `self`.
    pub fn replay<'a>(self, events: impl IntoIterator<Item = &'a TransferEvent>) -> Self {
        replay(self, events)
    }
}

impl Aggregate for AccountBalance {
    type Id = AccountId;
    type Event = TransferEvent;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        debug_assert_eq!(event.aggregate_id, self.id, "event from another timeline");
        self.balance = self
            .balance
            .and_then(|balance| balance.checked_add(event.amount));
        self.version += 1;
    }
}

/// Sum of `opening` and every event amount, in order; `None` on overflow.
pub fn fold_balance<'a>(
    opening: Amount,
    events: impl IntoIterator<Item = &'a TransferEvent>,
) -> Option<Amount> {
    events
        .into_iter()
        .try_fold(opening, |balance, event| balance.checked_add(event.amount))
}

/// Check that recording `debit` on top of `current` keeps the balance non-negative.
///
/// Returns the balance the account would have after the debit.
pub fn check_debit(current: Amount, debit: &NewTransferEvent) -> DomainResult<Amount> {
    match current.checked_add(debit.amount) {
        Some(after) if after >= Amount::ZERO => Ok(after),
        _ => Err(DomainError::insufficient_funds(format!(
            "Account {} has insufficient funds to debit {}",
            debit.aggregate_id, -debit.amount
        ))),
    }
}
