//! PostgreSQL-backed document store
//!
//! All collections share one `documents` table with a `JSONB` body. `seq` gives
//! a total insertion order, which is the order documents are returned in.
//!
//! Filter translation:
//! - `Eq` clauses are folded into one containment test: `body @> $json`
//! - string bounds compare `body ->> field` bytewise (`COLLATE "C"`), matching
//!   how normalized timestamps sort
//! - numeric bounds compare `(body ->> field)::float8`, only for number-typed values
//!
//! Field names are always bound as parameters, never spliced into SQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::db;
use crate::store::{
    ensure_object, DocumentId, DocumentStore, Filter, Predicate, StoreError, StoredDocument,
};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    seq         BIGSERIAL PRIMARY KEY,
    id          UUID NOT NULL UNIQUE,
    collection  TEXT NOT NULL,
    body        JSONB NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS documents_collection_seq_idx ON documents (collection, seq)";

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with the configured pool settings and make sure the table exists.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = db::create_pool(config).await?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        tracing::info!(max_connections = config.max_connections, "Connected to PostgreSQL document store");
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_INDEX).execute(&self.pool).await?;
        Ok(())
    }
}

/// Append the `WHERE` conditions for `filter` to a query already filtered by collection.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    let mut containment = Map::new();

    for clause in filter.clauses() {
        let field = clause.field.clone();
        match &clause.predicate {
            Predicate::Eq(value) => {
                containment.insert(field, value.clone());
            }
            Predicate::Gte(bound) => push_bound(qb, field, ">=", bound),
            Predicate::Lt(bound) => push_bound(qb, field, "<", bound),
        }
    }

    if !containment.is_empty() {
        qb.push(" AND body @> ");
        qb.push_bind(Value::Object(containment));
    }
}

fn push_bound(qb: &mut QueryBuilder<'_, Postgres>, field: String, op: &str, bound: &Value) {
    match bound {
        Value::String(s) => {
            qb.push(" AND (body ->> ");
            qb.push_bind(field);
            qb.push(format!(") COLLATE \"C\" {op} "));
            qb.push_bind(s.clone());
        }
        Value::Number(n) => {
            qb.push(" AND CASE WHEN jsonb_typeof(body -> ");
            qb.push_bind(field.clone());
            qb.push(") = 'number' THEN (body ->> ");
            qb.push_bind(field);
            qb.push(format!(")::float8 {op} "));
            qb.push_bind(n.as_f64().unwrap_or(f64::NAN));
            qb.push(" ELSE FALSE END");
        }
        // Other JSON types only compare by equality: equal satisfies `>=`, nothing satisfies `<`.
        other if op == ">=" => {
            qb.push(" AND body -> ");
            qb.push_bind(field);
            qb.push(" = ");
            qb.push_bind(other.clone());
        }
        _ => {
            qb.push(" AND FALSE");
        }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create_document(&self, collection: &str, document: Value) -> Result<DocumentId, StoreError> {
        ensure_object(&document)?;
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO documents (id, collection, body) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(collection)
            .bind(&document)
            .execute(&self.pool)
            .await?;
        tracing::debug!(collection, %id, "Inserted document");
        Ok(id)
    }

    async fn get_documents(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<u32>,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT id, created_at, body FROM documents WHERE collection = ");
        qb.push_bind(collection.to_string());
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY seq ASC");
        if let Some(limit) = limit {
            qb.push(" LIMIT ");
            qb.push_bind(i64::from(limit));
        }

        let rows: Vec<(Uuid, DateTime<Utc>, Value)> =
            qb.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|(id, created_at, body)| StoredDocument { id, created_at, body })
            .collect())
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT collection FROM documents ORDER BY collection")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(c,)| c).collect())
    }

    fn name(&self) -> &str {
        "postgres"
    }
}

// ============================================================================
// TESTS
// ============================================================================
