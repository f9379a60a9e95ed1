//! Postgres-backed ledger store.
//!
//! Accounts and transfer events live in two tables. Row locking uses
//! `SELECT ... FOR UPDATE` inside a transaction, so concurrent transfers over
//! a shared account are serialized by Postgres itself.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique / foreign key / check violation / numeric overflow) | `23505` / `23503` / `23514` / `22003` | `InvalidWrite` |
//! | Database (other) | Any other | `Unavailable` |
//! | ColumnDecode / Decode / RowNotFound | N/A | `Corrupt` |
//! | PoolClosed / PoolTimedOut / Io / Tls / other | N/A | `Unavailable` |

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use tally_core::{AccountId, Amount, EventId};
use tally_ledger::{Account, NewTransferEvent, TransferEvent};

use super::r#trait::{LedgerStore, LedgerTransaction, StoreError};

/// Schema statements, applied in order by [`PostgresLedgerStore::migrate`].
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id UUID PRIMARY KEY,
        balance NUMERIC(19, 4) NOT NULL CHECK (balance >= 0),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transfers (
        sequence BIGSERIAL PRIMARY KEY,
        event_id UUID NOT NULL UNIQUE,
        aggregate_id UUID NOT NULL REFERENCES accounts (id),
        from_account UUID NOT NULL REFERENCES accounts (id),
        to_account UUID NOT NULL REFERENCES accounts (id),
        amount NUMERIC(19, 4) NOT NULL,
        occurred_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS transfers_aggregate_sequence_idx
        ON transfers (aggregate_id, sequence)
    "#,
];

const SELECT_TRANSFERS: &str = r#"
    SELECT
        sequence,
        event_id,
        aggregate_id,
        from_account,
        to_account,
        amount,
        occurred_at
    FROM transfers
    WHERE aggregate_id = $1
    ORDER BY sequence ASC
"#;

/// Postgres-backed ledger store.
///
/// ## Thread Safety
///
/// Uses the SQLx connection pool, which is `Send + Sync`; clones share it.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    /// Create a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a connection pool against `database_url`.
    #[instrument(skip(database_url), err)]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the ledger tables if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    type Transaction = PostgresTransaction;

    #[instrument(skip(self), fields(balance = %balance), err)]
    async fn insert_account(&self, balance: Amount) -> Result<Account, StoreError> {
        let account = Account::new(AccountId::new(), balance);

        sqlx::query("INSERT INTO accounts (id, balance) VALUES ($1, $2)")
            .bind(account.id.as_uuid())
            .bind(account.balance)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_account", e))?;

        Ok(account)
    }

    #[instrument(skip(self), fields(account_id = %id), err)]
    async fn fetch_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query("SELECT id, balance FROM accounts WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("fetch_account", e))?;

        row.map(|row| decode_account(&row)).transpose()
    }

    #[instrument(skip(self), fields(account_id = %account_id), err)]
    async fn fetch_events(&self, account_id: AccountId) -> Result<Vec<TransferEvent>, StoreError> {
        let rows = sqlx::query(SELECT_TRANSFERS)
            .bind(account_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("fetch_events", e))?;

        decode_transfers(rows)
    }

    #[instrument(skip(self), fields(account_count = ids.len()), err)]
    async fn lock_accounts(&self, ids: &[AccountId]) -> Result<Self::Transaction, StoreError> {
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // ORDER BY id: rows are locked in ascending id order.
        let result = sqlx::query(
            "SELECT id, balance FROM accounts WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(&uuids)
        .fetch_all(&mut *tx)
        .await;
        let rows = match result {
            Ok(rows) => rows,
            Err(e) => {
                rollback_quietly(tx).await;
                return Err(map_sqlx_error("lock_accounts", e));
            }
        };

        let mut locked = HashMap::with_capacity(rows.len());
        for row in &rows {
            match decode_account(row) {
                Ok(account) => {
                    locked.insert(account.id, account);
                }
                Err(e) => {
                    rollback_quietly(tx).await;
                    return Err(e);
                }
            }
        }

        if locked.len() != ids.len() {
            let missing = ids
                .into_iter()
                .filter(|id| !locked.contains_key(id))
                .collect();
            rollback_quietly(tx).await;
            return Err(StoreError::MissingAccounts { missing });
        }

        Ok(PostgresTransaction { tx, locked })
    }
}

/// Transaction over [`PostgresLedgerStore`] holding `FOR UPDATE` row locks.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
    locked: HashMap<AccountId, Account>,
}

impl std::fmt::Debug for PostgresTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresTransaction")
            .field("locked", &self.locked)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LedgerTransaction for PostgresTransaction {
    fn account(&self, id: AccountId) -> Option<&Account> {
        self.locked.get(&id)
    }

    #[instrument(skip(self), fields(account_id = %account_id), err)]
    async fn fetch_events(
        &mut self,
        account_id: AccountId,
    ) -> Result<Vec<TransferEvent>, StoreError> {
        let rows = sqlx::query(SELECT_TRANSFERS)
            .bind(account_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("fetch_events_locked", e))?;

        decode_transfers(rows)
    }

    #[instrument(
        skip(self, event),
        fields(aggregate_id = %event.aggregate_id, amount = %event.amount),
        err
    )]
    async fn append_event(&mut self, event: NewTransferEvent) -> Result<TransferEvent, StoreError> {
        if !self.locked.contains_key(&event.aggregate_id) {
            return Err(StoreError::InvalidWrite(format!(
                "account {} is not locked by this transaction",
                event.aggregate_id
            )));
        }

        let row = sqlx::query(
            r#"
            INSERT INTO transfers (
                event_id,
                aggregate_id,
                from_account,
                to_account,
                amount,
                occurred_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING sequence
            "#,
        )
        .bind(event.event_id.as_uuid())
        .bind(event.aggregate_id.as_uuid())
        .bind(event.from_account.as_uuid())
        .bind(event.to_account.as_uuid())
        .bind(event.amount)
        .bind(event.occurred_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("append_event", e))?;

        let sequence: i64 = row
            .try_get("sequence")
            .map_err(|e| StoreError::Corrupt(format!("failed to read sequence: {e}")))?;

        Ok(event.into_recorded(sequence as u64))
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

async fn rollback_quietly(tx: Transaction<'static, Postgres>) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(error = %e, "rollback after failed lock acquisition failed");
    }
}

fn decode_account(row: &PgRow) -> Result<Account, StoreError> {
    let id: Uuid = row
        .try_get("id")
        .map_err(|e| StoreError::Corrupt(format!("failed to read account id: {e}")))?;
    let balance: Decimal = row
        .try_get("balance")
        .map_err(|e| StoreError::Corrupt(format!("failed to read account balance: {e}")))?;
    Ok(Account::new(AccountId::from_uuid(id), balance))
}

fn decode_transfers(rows: Vec<PgRow>) -> Result<Vec<TransferEvent>, StoreError> {
    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        let stored = TransferRow::from_row(&row)
            .map_err(|e| StoreError::Corrupt(format!("failed to deserialize transfer row: {e}")))?;
        events.push(stored.into());
    }
    Ok(events)
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // unique, foreign key, check violations, numeric overflow
                Some("23505") | Some("23503") | Some("23514") | Some("22003") => {
                    StoreError::InvalidWrite(msg)
                }
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::RowNotFound => {
            StoreError::Corrupt(format!("unexpected row not found in {}", operation))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(format!("decode error in {}: {}", operation, err))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {}: {}", operation, err)),
    }
}

// SQLx row types

#[derive(Debug)]
struct TransferRow {
    sequence: i64,
    event_id: Uuid,
    aggregate_id: Uuid,
    from_account: Uuid,
    to_account: Uuid,
    amount: Decimal,
    occurred_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for TransferRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(TransferRow {
            sequence: row.try_get("sequence")?,
            event_id: row.try_get("event_id")?,
            aggregate_id: row.try_get("aggregate_id")?,
            from_account: row.try_get("from_account")?,
            to_account: row.try_get("to_account")?,
            amount: row.try_get("amount")?,
            occurred_at: row.try_get("occurred_at")?,
        })
    }
}

impl From<TransferRow> for TransferEvent {
    fn from(row: TransferRow) -> Self {
        TransferEvent {
            sequence: row.sequence as u64,
            event_id: EventId::from_uuid(row.event_id),
            aggregate_id: AccountId::from_uuid(row.aggregate_id),
            from_account: AccountId::from_uuid(row.from_account),
            to_account: AccountId::from_uuid(row.to_account),
            amount: row.amount,
            occurred_at: row.occurred_at,
        }
    }
}
