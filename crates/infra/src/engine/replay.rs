use tracing::instrument;

use tally_core::{AccountId, Amount};
use tally_ledger::{Account, AccountBalance, TransferEvent, fold_balance};

use super::{EngineError, LedgerEngine};
use crate::ledger_store::{LedgerStore, LedgerTransaction, StoreError};

impl<S: LedgerStore> LedgerEngine<S> {
    /// Current balance of `account_id`: `opening_balance` plus every committed
    /// transfer event recorded against it, in insertion order.
    ///
    /// Read-only; zero events yields `opening_balance` unchanged.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn compute_balance(
        &self,
        account_id: AccountId,
        opening_balance: Amount,
    ) -> Result<Amount, EngineError> {
        let timeline = self.store.fetch_events(account_id).await?;
        validate_timeline(account_id, &timeline)?;
        fold_balance(opening_balance, &timeline)
            .ok_or_else(|| overflowed(account_id).into())
    }
}

/// Replay a locked account's timeline from inside its transaction.
///
/// The stored balance of the locked row is the replay seed.
pub(super) async fn replay_locked<T: LedgerTransaction>(
    tx: &mut T,
    account: &Account,
) -> Result<Amount, StoreError> {
    let timeline = tx.fetch_events(account.id).await?;
    validate_timeline(account.id, &timeline)?;
    AccountBalance::opening(account.id, account.balance)
        .replay(&timeline)
        .balance()
        .ok_or_else(|| overflowed(account.id))
}

fn overflowed(account_id: AccountId) -> StoreError {
    StoreError::Corrupt(format!(
        "balance of {account_id} overflows the decimal range"
    ))
}

/// Reject timelines a correct store can never return.
fn validate_timeline(account_id: AccountId, timeline: &[TransferEvent]) -> Result<(), StoreError> {
    let mut last = 0u64;
    for (idx, e) in timeline.iter().enumerate() {
        if e.aggregate_id != account_id {
            return Err(StoreError::Corrupt(format!(
                "timeline of {account_id} contains an event of {} at index {idx}",
                e.aggregate_id
            )));
        }
        if e.sequence <= last {
            return Err(StoreError::Corrupt(format!(
                "non-monotonic sequence in timeline of {account_id} (last={last}, found={})",
                e.sequence
            )));
        }
        last = e.sequence;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tally_ledger::TransferRequest;

    use super::*;
    use crate::ledger_store::InMemoryLedgerStore;

    #[tokio::test]
    async fn account_without_events_keeps_opening_balance() {
        let engine = LedgerEngine::new(InMemoryLedgerStore::new());
        let account = engine.create_account(dec!(42.5)).await.unwrap();

        let balance = engine.compute_balance(account.id, account.balance).await.unwrap();
        assert_eq!(balance, dec!(42.5));
    }

    #[tokio::test]
    async fn replay_is_repeatable() {
        let engine = LedgerEngine::new(InMemoryLedgerStore::new());
        let a = engine.create_account(dec!(100)).await.unwrap();
        let b = engine.create_account(dec!(0)).await.unwrap();
        engine
            .transfer(TransferRequest::new(a.id, b.id, dec!(12.34)))
            .await
            .unwrap();

        let first = engine.compute_balance(a.id, a.balance).await.unwrap();
        let second = engine.compute_balance(a.id, a.balance).await.unwrap();
        assert_eq!(first, dec!(87.66));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn overflowing_balance_is_corrupt_not_a_panic() {
        // Rows written around validation, as a legacy import could have.
        let store = InMemoryLedgerStore::new();
        let huge = store.insert_account(Amount::MAX).await.unwrap();
        let small = store.insert_account(dec!(10)).await.unwrap();
        let engine = LedgerEngine::new(store);

        engine
            .transfer(TransferRequest::new(small.id, huge.id, dec!(1)))
            .await
            .unwrap();

        let err = engine.get_account(huge.id).await.unwrap_err();
        assert!(matches!(
            &err,
            EngineError::Store(StoreError::Corrupt(msg)) if msg.contains("overflows")
        ));

        let err = engine
            .transfer(TransferRequest::new(huge.id, small.id, dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Store(StoreError::Corrupt(_))));

        // The healthy side of the pair is unaffected.
        assert_eq!(engine.get_account(small.id).await.unwrap().balance, dec!(9));
    }

    #[test]
    fn out_of_order_timeline_is_corrupt() {
        let a = AccountId::new();
        let req = TransferRequest::new(a, AccountId::new(), dec!(1));
        let timeline = vec![
            req.debit(Utc::now()).into_recorded(5),
            req.debit(Utc::now()).into_recorded(3),
        ];
        let err = validate_timeline(a, &timeline).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(msg) if msg.contains("non-monotonic")));
    }

    #[test]
    fn foreign_event_in_timeline_is_corrupt() {
        let a = AccountId::new();
        let req = TransferRequest::new(a, AccountId::new(), dec!(1));
        let timeline = vec![req.credit(Utc::now()).into_recorded(1)];
        assert!(validate_timeline(a, &timeline).is_err());
    }
}
