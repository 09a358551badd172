pub mod assistant;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod memory_store;
pub mod models;
pub mod pg_store;
pub mod store;
pub mod summary;

pub use assistant::{ChatRequest, ChatResponse, Intent};
pub use config::{StoreBackend, TallyConfig};
pub use error::{TallyError, ValidationError};
pub use memory_store::MemoryDocumentStore;
pub use pg_store::PgDocumentStore;
pub use store::{DocumentId, DocumentStore, Filter, StoreError, StoredDocument};
pub use summary::{summarize, CategoryTotals, Summary};

use std::sync::Arc;

/// Build the store selected by `database.backend`.
pub async fn open_store(config: &config::DatabaseConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryDocumentStore::new())),
        StoreBackend::Postgres => Ok(Arc::new(PgDocumentStore::connect(config).await?)),
    }
}
