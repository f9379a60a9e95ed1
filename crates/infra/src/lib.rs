//! Infrastructure layer: ledger stores, the transfer engine, and config.

pub mod config;
pub mod engine;
pub mod ledger_store;

pub use config::{ConfigError, LedgerConfig, StoreBackend};
pub use engine::{EngineError, LedgerEngine};
pub use ledger_store::{
    InMemoryLedgerStore, LedgerStore, LedgerTransaction, PostgresLedgerStore, StoreError,
};
