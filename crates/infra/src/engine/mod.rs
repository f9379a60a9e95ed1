//! Ledger engine (application-level orchestration).
//!
//! The engine composes a [`LedgerStore`](crate::ledger_store::LedgerStore) with the
//! pure ledger domain:
//!
//! - **Account lifecycle**: open accounts, read them with a replayed balance
//! - **Balance replay**: fold an account's transfer events onto its snapshot
//! - **Transfers**: lock both accounts, check the replayed source balance,
//!   record the debit/credit pair and commit
//!
//! ## Transfer Flow
//!
//! ```text
//! TransferRequest
//!   ↓
//! 1. Validate (amount > 0, money scale, distinct accounts)
//!   ↓
//! 2. Lock both account rows (one transaction, ascending id order)
//!   ↓
//! 3. Replay the source timeline inside the transaction, check no-overdraft
//!   ↓
//! 4. Append debit + credit events (same timestamp)
//!   ↓
//! 5. Commit (releases both locks) → debit event
//! ```
//!
//! Any failure after step 2 rolls the transaction back before the error is
//! returned, so a half-recorded transfer is never visible.
//!
//! The engine spawns nothing itself; concurrent callers are serialized by the
//! store's row locks.

mod accounts;
mod replay;
mod transfer;

use thiserror::Error;

use tally_core::DomainError;

use crate::ledger_store::StoreError;

/// Message used when a lock set names an account that does not exist.
pub const MISSING_ACCOUNT_MESSAGE: &str = "one of the accounts does not exist";

#[derive(Debug, Error)]
pub enum EngineError {
    /// Validation failure (negative opening balance, non-positive amount, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A referenced account does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The transfer would overdraw the source account.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
    /// Unexpected storage failure; never a business-rule rejection.
    #[error(transparent)]
    Store(StoreError),
}

impl EngineError {
    /// True for the expected, caller-recoverable rejections.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, EngineError::Store(_))
    }

    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidInput(_) => "invalid_input",
            EngineError::NotFound(_) => "not_found",
            EngineError::InsufficientFunds(_) => "insufficient_funds",
            EngineError::Store(_) => "store_error",
        }
    }
}

impl From<DomainError> for EngineError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::InvalidInput(msg) => EngineError::InvalidInput(msg),
            DomainError::NotFound(msg) => EngineError::NotFound(msg),
            DomainError::InsufficientFunds(msg) => EngineError::InsufficientFunds(msg),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::MissingAccounts { .. } => {
                EngineError::NotFound(MISSING_ACCOUNT_MESSAGE.to_string())
            }
            other => EngineError::Store(other),
        }
    }
}

/// Account lifecycle, balance replay and transfer engine over a ledger store.
///
/// Cheap to share: wrap it in an `Arc` and hand it to every request handler.
#[derive(Debug, Clone)]
pub struct LedgerEngine<S> {
    store: S,
}

impl<S> LedgerEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}
