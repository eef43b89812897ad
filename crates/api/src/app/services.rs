use std::sync::Arc;

use stockledger_infra::{
    Config, InventoryService, StoreBackend,
    store::{InMemoryLedgerStore, LedgerStore, PageLimits, PostgresLedgerStore, StoreError},
};

/// Store handle shared by every request; the backend is picked at startup.
pub type SharedStore = Arc<dyn LedgerStore>;

/// Services available to HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub inventory: InventoryService<SharedStore>,
}

impl AppServices {
    pub fn new(store: SharedStore, page_limits: PageLimits) -> Arc<Self> {
        Arc::new(Self {
            inventory: InventoryService::with_page_limits(store, page_limits),
        })
    }

    /// Services over a fresh in-memory store.
    pub fn in_memory(page_limits: PageLimits) -> Arc<Self> {
        Self::new(Arc::new(InMemoryLedgerStore::new()), page_limits)
    }
}

/// Build services for the configured backend.
///
/// The Postgres backend connects and creates its schema before returning.
pub async fn build_services(config: &Config) -> Result<Arc<AppServices>, StoreError> {
    let store: SharedStore = match &config.backend {
        StoreBackend::Memory => {
            tracing::info!("using in-memory ledger store");
            Arc::new(InMemoryLedgerStore::new())
        }
        StoreBackend::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PostgresLedgerStore::connect(database_url, *max_connections).await?;
            store.init_schema().await?;
            tracing::info!(max_connections = *max_connections, "using postgres ledger store");
            Arc::new(store)
        }
    };

    Ok(AppServices::new(store, config.page_limits))
}
