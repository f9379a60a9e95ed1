use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use tally_core::{AccountId, Amount};
use tally_ledger::{Account, NewTransferEvent, TransferEvent};

/// Ledger store operation error.
///
/// These are **infrastructure errors** as opposed to domain errors. The only
/// variant with business meaning is `MissingAccounts`, which the engine turns
/// into a not-found rejection; everything else is unexpected.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `lock_accounts` was asked for ids that have no account row.
    #[error("one of the accounts does not exist")]
    MissingAccounts { missing: Vec<AccountId> },

    /// Storage could not be reached (connection, pool, poisoned lock).
    #[error("ledger store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be decoded or breaks a storage invariant.
    #[error("corrupt ledger row: {0}")]
    Corrupt(String),

    /// A write was refused (constraint violation, unlocked account, ...).
    #[error("invalid ledger write: {0}")]
    InvalidWrite(String),
}

/// Account and transfer-event storage.
///
/// ## Read Semantics
///
/// - `fetch_events` returns the events whose `aggregate_id` is the account, in
///   ascending insertion `sequence`. Unknown accounts yield an empty timeline.
/// - Reads outside a transaction observe committed data only.
///
/// ## Locking
///
/// `lock_accounts` opens a transaction and blocks until it holds an exclusive
/// lock on every requested account row. Implementations lock in ascending id
/// order and fail with `StoreError::MissingAccounts` (releasing anything
/// already locked) if any id is absent.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    type Transaction: LedgerTransaction;

    /// Persist a new account with a freshly assigned id.
    async fn insert_account(&self, balance: Amount) -> Result<Account, StoreError>;

    /// Load the stored account row (opening snapshot balance).
    async fn fetch_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Load an account's committed event timeline.
    async fn fetch_events(&self, account_id: AccountId) -> Result<Vec<TransferEvent>, StoreError>;

    /// Begin a transaction holding exclusive locks on `ids`.
    async fn lock_accounts(&self, ids: &[AccountId]) -> Result<Self::Transaction, StoreError>;
}

/// A transaction holding exclusive locks on a set of account rows.
///
/// Dropping a transaction without calling `commit` discards its writes and
/// releases its locks, exactly like `rollback`.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// A locked account row, as stored.
    fn account(&self, id: AccountId) -> Option<&Account>;

    /// The account's timeline as seen from inside this transaction.
    async fn fetch_events(&mut self, account_id: AccountId)
    -> Result<Vec<TransferEvent>, StoreError>;

    /// Append one event; it becomes visible to others only on commit.
    async fn append_event(&mut self, event: NewTransferEvent) -> Result<TransferEvent, StoreError>;

    /// Make every appended event visible and release the locks.
    async fn commit(self) -> Result<(), StoreError>;

    /// Discard every appended event and release the locks.
    async fn rollback(self) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore,
{
    type Transaction = S::Transaction;

    async fn insert_account(&self, balance: Amount) -> Result<Account, StoreError> {
        (**self).insert_account(balance).await
    }

    async fn fetch_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        (**self).fetch_account(id).await
    }

    async fn fetch_events(&self, account_id: AccountId) -> Result<Vec<TransferEvent>, StoreError> {
        (**self).fetch_events(account_id).await
    }

    async fn lock_accounts(&self, ids: &[AccountId]) -> Result<Self::Transaction, StoreError> {
        (**self).lock_accounts(ids).await
    }
}
