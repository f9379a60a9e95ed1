use chrono::Utc;
use tracing::{info, instrument, warn};

use tally_core::{AccountId, Event};
use tally_ledger::{TransferEvent, TransferRequest, check_debit};

use super::replay::replay_locked;
use super::{EngineError, LedgerEngine};
use crate::ledger_store::{LedgerStore, LedgerTransaction, StoreError};

impl<S: LedgerStore> LedgerEngine<S> {
    /// Move `request.amount` from `request.from_account` to `request.to_account`.
    ///
    /// Returns the debit event as the canonical record of the transfer. On any
    /// error after the locks are taken, the transaction is rolled back and no
    /// event of this transfer is ever visible.
    #[instrument(
        skip(self, request),
        fields(
            from_account = %request.from_account,
            to_account = %request.to_account,
            amount = %request.amount
        )
    )]
    pub async fn transfer(&self, request: TransferRequest) -> Result<TransferEvent, EngineError> {
        // 1) Validate
        if let Err(err) = request.validate() {
            warn!(error = %err, "transfer rejected");
            return Err(err.into());
        }

        // 2) Lock both accounts (one transaction)
        let mut tx = match self.store.lock_accounts(&request.lock_set()).await {
            Ok(tx) => tx,
            Err(err) => {
                let err = EngineError::from(err);
                log_failure(&err);
                return Err(err);
            }
        };

        // 3) + 4) Balance check and record, then commit or roll back
        match record_transfer(&mut tx, &request).await {
            Ok(debit) => {
                tx.commit().await?;
                info!(
                    sequence = debit.sequence,
                    event_type = debit.event_type(),
                    event_version = debit.version(),
                    "transfer committed"
                );
                Ok(debit)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback of rejected transfer failed");
                }
                log_failure(&err);
                Err(err)
            }
        }
    }

    /// Raw ledger view: every event recorded against `account_id`, in
    /// insertion order. Unknown accounts have an empty timeline.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn list_transfers(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<TransferEvent>, EngineError> {
        Ok(self.store.fetch_events(account_id).await?)
    }
}

async fn record_transfer<T: LedgerTransaction>(
    tx: &mut T,
    request: &TransferRequest,
) -> Result<TransferEvent, EngineError> {
    let source = tx.account(request.from_account).cloned().ok_or_else(|| {
        StoreError::Corrupt(format!(
            "locked set is missing source account {}",
            request.from_account
        ))
    })?;

    let current = replay_locked(tx, &source).await?;

    let occurred_at = Utc::now();
    let debit = request.debit(occurred_at);
    check_debit(current, &debit)?;

    let debit = tx.append_event(debit).await?;
    tx.append_event(request.credit(occurred_at)).await?;
    Ok(debit)
}

fn log_failure(err: &EngineError) {
    if err.is_rejection() {
        warn!(error = %err, "transfer rejected");
    } else {
        tracing::error!(error = %err, "transfer failed");
    }
}
