//! Document store adapter
//!
//! A `DocumentStore` keeps JSON object documents in named collections and offers
//! two primitives: insert one document, and fetch the documents matching a
//! [`Filter`] with an optional cap. Every inserted document gets a
//! store-generated UUID.
//!
//! Implementations:
//! - [`MemoryDocumentStore`](crate::memory_store::MemoryDocumentStore): in-process, used by tests and local runs
//! - [`PgDocumentStore`](crate::pg_store::PgDocumentStore): PostgreSQL `JSONB` table
//!
//! Both return documents in insertion order.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub type DocumentId = Uuid;

// ============================================================================
// DocumentStore trait
// ============================================================================

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert one document and return its generated id.
    async fn create_document(&self, collection: &str, document: Value) -> Result<DocumentId, StoreError>;

    /// Fetch documents matching `filter`, oldest first, at most `limit` of them.
    async fn get_documents(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<u32>,
    ) -> Result<Vec<StoredDocument>, StoreError>;

    /// Names of collections that hold at least one document, sorted.
    async fn list_collections(&self) -> Result<Vec<String>, StoreError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Serialize a typed record and insert it.
pub async fn insert_record<T: Serialize + ?Sized>(
    store: &dyn DocumentStore,
    collection: &str,
    record: &T,
) -> Result<DocumentId, StoreError> {
    let document = serde_json::to_value(record).map_err(StoreError::Serialize)?;
    store.create_document(collection, document).await
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Failed to serialize document: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Stored document {id} in '{collection}' does not match its schema: {source}")]
    Decode {
        collection: String,
        id: DocumentId,
        #[source]
        source: serde_json::Error,
    },
}

// ============================================================================
// Stored documents
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub created_at: DateTime<Utc>,
    pub body: Value,
}

impl StoredDocument {
    /// Decode the body into a typed record. Extra fields in the body are ignored.
    pub fn decode<T: DeserializeOwned>(&self, collection: &str) -> Result<T, StoreError> {
        T::deserialize(&self.body).map_err(|source| StoreError::Decode {
            collection: collection.to_string(),
            id: self.id,
            source,
        })
    }
}

// ============================================================================
// Filter
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(Value),
    /// Inclusive lower bound.
    Gte(Value),
    /// Exclusive upper bound.
    Lt(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub field: String,
    pub predicate: Predicate,
}

/// Conjunction of per-field predicates. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Predicate::Eq(value.into()))
    }

    pub fn gte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Predicate::Gte(value.into()))
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Predicate::Lt(value.into()))
    }

    fn with(mut self, field: impl Into<String>, predicate: Predicate) -> Self {
        self.clauses.push(Clause {
            field: field.into(),
            predicate,
        });
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluate the filter against a document body.
    pub fn matches(&self, body: &Value) -> bool {
        self.clauses.iter().all(|clause| {
            let Some(actual) = body.get(&clause.field) else {
                return false;
            };
            match &clause.predicate {
                Predicate::Eq(expected) => compare_values(actual, expected) == Some(Ordering::Equal),
                Predicate::Gte(bound) => matches!(
                    compare_values(actual, bound),
                    Some(Ordering::Greater | Ordering::Equal)
                ),
                Predicate::Lt(bound) => compare_values(actual, bound) == Some(Ordering::Less),
            }
        })
    }
}

/// Strings compare lexicographically (bytewise), numbers numerically; anything else
/// only by equality.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (x, y) if x == y => Some(Ordering::Equal),
        _ => None,
    }
}

pub(crate) fn ensure_object(document: &Value) -> Result<(), StoreError> {
    if document.is_object() {
        Ok(())
    } else {
        Err(StoreError::InvalidDocument(format!(
            "expected a JSON object, got {}",
            json_kind(document)
        )))
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
