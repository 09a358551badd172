use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::{ensure_object, DocumentId, DocumentStore, Filter, StoreError, StoredDocument};

/// In-process document store. Documents are kept per collection in insertion order.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<BTreeMap<String, Vec<StoredDocument>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create_document(&self, collection: &str, document: Value) -> Result<DocumentId, StoreError> {
        ensure_object(&document)?;
        let stored = StoredDocument {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            body: document,
        };
        let id = stored.id;
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(stored);
        tracing::debug!(collection, %id, "Stored document in memory");
        Ok(id)
    }

    async fn get_documents(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<u32>,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let cap = limit.map_or(usize::MAX, |l| l as usize);
        let guard = self.collections.read().await;
        let docs = guard
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| filter.matches(&d.body))
                    .take(cap)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(docs)
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.collections.read().await.keys().cloned().collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
