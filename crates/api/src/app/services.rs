use std::sync::Arc;

use tally_core::{AccountId, Amount};
use tally_infra::{
    EngineError, InMemoryLedgerStore, LedgerConfig, LedgerEngine, PostgresLedgerStore,
    StoreBackend, StoreError,
};
use tally_ledger::{Account, TransferEvent, TransferRequest};

/// The ledger engine behind the router, over whichever store was configured.
#[derive(Debug, Clone)]
pub enum AppServices {
    InMemory(Arc<LedgerEngine<InMemoryLedgerStore>>),
    Postgres(Arc<LedgerEngine<PostgresLedgerStore>>),
}

impl AppServices {
    /// Fresh in-memory ledger (dev/test).
    pub fn in_memory() -> Self {
        AppServices::InMemory(Arc::new(LedgerEngine::new(InMemoryLedgerStore::new())))
    }

    pub fn backend(&self) -> &'static str {
        match self {
            AppServices::InMemory(_) => "memory",
            AppServices::Postgres(_) => "postgres",
        }
    }

    pub async fn create_account(&self, balance: Amount) -> Result<Account, EngineError> {
        match self {
            AppServices::InMemory(engine) => engine.create_account(balance).await,
            AppServices::Postgres(engine) => engine.create_account(balance).await,
        }
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account, EngineError> {
        match self {
            AppServices::InMemory(engine) => engine.get_account(id).await,
            AppServices::Postgres(engine) => engine.get_account(id).await,
        }
    }

    pub async fn list_transfers(&self, id: AccountId) -> Result<Vec<TransferEvent>, EngineError> {
        match self {
            AppServices::InMemory(engine) => engine.list_transfers(id).await,
            AppServices::Postgres(engine) => engine.list_transfers(id).await,
        }
    }

    pub async fn transfer(&self, request: TransferRequest) -> Result<TransferEvent, EngineError> {
        match self {
            AppServices::InMemory(engine) => engine.transfer(request).await,
            AppServices::Postgres(engine) => engine.transfer(request).await,
        }
    }
}

/// Wire the configured store into a ledger engine.
///
/// The Postgres backend connects and applies the schema before returning.
pub async fn build_services(config: &LedgerConfig) -> Result<AppServices, StoreError> {
    let services = match &config.store {
        StoreBackend::Memory => AppServices::in_memory(),
        StoreBackend::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PostgresLedgerStore::connect(database_url, *max_connections).await?;
            store.migrate().await?;
            AppServices::Postgres(Arc::new(LedgerEngine::new(store)))
        }
    };

    tracing::info!(backend = services.backend(), "ledger services ready");
    Ok(services)
}
