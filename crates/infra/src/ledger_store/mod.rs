//! Transactional ledger storage boundary.
//!
//! The store keeps two kinds of rows: accounts (with their opening balance
//! snapshot) and transfer events (append-only, one per account timeline
//! entry). Writes to the event log only happen through a [`LedgerTransaction`]
//! that holds exclusive row locks on the accounts involved.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use r#trait::{LedgerStore, LedgerTransaction, StoreError};
