use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use tally_core::{AccountId, Amount};
use tally_ledger::{Account, NewTransferEvent, TransferEvent};

use super::r#trait::{LedgerStore, LedgerTransaction, StoreError};

#[derive(Debug, Clone)]
struct AccountRow {
    account: Account,
    lock: Arc<Mutex<()>>,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: RwLock<HashMap<AccountId, AccountRow>>,
    events: RwLock<Vec<TransferEvent>>,
    next_sequence: AtomicU64,
}

impl Inner {
    fn committed_timeline(&self, account_id: AccountId) -> Result<Vec<TransferEvent>, StoreError> {
        let events = self.events.read().map_err(|_| poisoned())?;
        let mut timeline: Vec<TransferEvent> = events
            .iter()
            .filter(|e| e.aggregate_id == account_id)
            .cloned()
            .collect();
        // Commits of disjoint account sets may land out of sequence order.
        timeline.sort_by_key(|e| e.sequence);
        Ok(timeline)
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

/// In-memory ledger store with per-account row locks.
///
/// Intended for tests/dev. Each account row carries an async mutex that
/// [`LedgerStore::lock_accounts`] holds for the lifetime of the transaction.
/// Cloning the store shares the same underlying rows.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    inner: Arc<Inner>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of account rows.
    pub fn account_count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.accounts.read().map_err(|_| poisoned())?.len())
    }

    /// Number of committed events across every account.
    pub fn event_count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.events.read().map_err(|_| poisoned())?.len())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    type Transaction = InMemoryTransaction;

    async fn insert_account(&self, balance: Amount) -> Result<Account, StoreError> {
        let account = Account::new(AccountId::new(), balance);
        let row = AccountRow {
            account: account.clone(),
            lock: Arc::new(Mutex::new(())),
        };

        let mut accounts = self.inner.accounts.write().map_err(|_| poisoned())?;
        if accounts.insert(account.id, row).is_some() {
            return Err(StoreError::InvalidWrite(format!(
                "account {} already exists",
                account.id
            )));
        }
        Ok(account)
    }

    async fn fetch_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let accounts = self.inner.accounts.read().map_err(|_| poisoned())?;
        Ok(accounts.get(&id).map(|row| row.account.clone()))
    }

    async fn fetch_events(&self, account_id: AccountId) -> Result<Vec<TransferEvent>, StoreError> {
        self.inner.committed_timeline(account_id)
    }

    async fn lock_accounts(&self, ids: &[AccountId]) -> Result<Self::Transaction, StoreError> {
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();

        // Resolve rows first so a missing id fails before anything is locked.
        let rows = {
            let accounts = self.inner.accounts.read().map_err(|_| poisoned())?;
            let missing: Vec<AccountId> = ids
                .iter()
                .filter(|id| !accounts.contains_key(id))
                .copied()
                .collect();
            if !missing.is_empty() {
                return Err(StoreError::MissingAccounts { missing });
            }
            ids.iter()
                .filter_map(|id| accounts.get(id).cloned())
                .collect::<Vec<_>>()
        };

        // Ascending id order: two transactions over overlapping sets never wait
        // on each other in opposite directions.
        let mut guards = Vec::with_capacity(rows.len());
        let mut locked = HashMap::with_capacity(rows.len());
        for row in rows {
            guards.push(row.lock.lock_owned().await);
            locked.insert(row.account.id, row.account);
        }

        Ok(InMemoryTransaction {
            store: self.inner.clone(),
            locked,
            pending: Vec::new(),
            _guards: guards,
        })
    }
}

/// Transaction over [`InMemoryLedgerStore`].
///
/// Appended events are buffered and only published to the shared log on
/// `commit`; the row locks are released when the transaction is consumed or
/// dropped.
#[derive(Debug)]
pub struct InMemoryTransaction {
    store: Arc<Inner>,
    locked: HashMap<AccountId, Account>,
    pending: Vec<TransferEvent>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

#[async_trait]
impl LedgerTransaction for InMemoryTransaction {
    fn account(&self, id: AccountId) -> Option<&Account> {
        self.locked.get(&id)
    }

    async fn fetch_events(
        &mut self,
        account_id: AccountId,
    ) -> Result<Vec<TransferEvent>, StoreError> {
        let mut timeline = self.store.committed_timeline(account_id)?;
        timeline.extend(
            self.pending
                .iter()
                .filter(|e| e.aggregate_id == account_id)
                .cloned(),
        );
        Ok(timeline)
    }

    async fn append_event(&mut self, event: NewTransferEvent) -> Result<TransferEvent, StoreError> {
        for id in [event.aggregate_id, event.from_account, event.to_account] {
            if !self.locked.contains_key(&id) {
                return Err(StoreError::InvalidWrite(format!(
                    "account {id} is not locked by this transaction"
                )));
            }
        }

        let sequence = self.store.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let recorded = event.into_recorded(sequence);
        self.pending.push(recorded.clone());
        Ok(recorded)
    }

    async fn commit(self) -> Result<(), StoreError> {
        let mut events = self.store.events.write().map_err(|_| poisoned())?;
        events.extend(self.pending);
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
