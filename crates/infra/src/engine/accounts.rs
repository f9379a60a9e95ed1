use tracing::{info, instrument, warn};

use tally_core::{AccountId, Amount};
use tally_ledger::{Account, validate_opening_balance};

use super::{EngineError, LedgerEngine};
use crate::ledger_store::LedgerStore;

impl<S: LedgerStore> LedgerEngine<S> {
    /// Open an account with a non-negative opening balance.
    ///
    /// No event is recorded for the opening balance: it is the replay base case.
    #[instrument(skip(self), fields(opening_balance = %opening_balance))]
    pub async fn create_account(&self, opening_balance: Amount) -> Result<Account, EngineError> {
        let balance = match validate_opening_balance(opening_balance) {
            Ok(balance) => balance,
            Err(err) => {
                warn!(error = %err, "account creation rejected");
                return Err(err.into());
            }
        };

        let account = self.store.insert_account(balance).await?;
        info!(account_id = %account.id, "account created");
        Ok(account)
    }

    /// Load an account with its balance replayed from the event log.
    #[instrument(skip(self), fields(account_id = %id))]
    pub async fn get_account(&self, id: AccountId) -> Result<Account, EngineError> {
        let account = self
            .store
            .fetch_account(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("account {id} does not exist")))?;

        let balance = self.compute_balance(account.id, account.balance).await?;
        Ok(account.with_balance(balance))
    }
}
