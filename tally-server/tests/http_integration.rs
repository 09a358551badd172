//! HTTP integration tests for the Tally REST API
//!
//! Full router dispatch through `oneshot`, backed by the in-memory store.
//! The Postgres variant runs only when TALLY_TEST_DATABASE_URL is set.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tally_core::config::StoreBackend;
use tally_core::{
    DocumentId, DocumentStore, Filter, MemoryDocumentStore, StoreError, StoredDocument, TallyConfig,
};
use tally_server::http::{build_router, HttpState};
use tower::ServiceExt;

fn memory_app() -> (Router, Arc<MemoryDocumentStore>) {
    let store = Arc::new(MemoryDocumentStore::new());
    let state = Arc::new(HttpState {
        store: store.clone(),
        config: TallyConfig::in_memory(),
    });
    (build_router(state), store)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn send_raw(app: &Router, uri: &str, raw: &str) -> StatusCode {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(raw.to_string()))
        .unwrap();
    app.clone().oneshot(req).await.unwrap().status()
}

fn groceries_expense() -> Value {
    json!({"amount": 50, "type": "expense", "category": "groceries", "date": "2025-01-05"})
}

/// Store whose every operation fails, to exercise the 500 path.
struct BrokenStore {
    calls: AtomicUsize,
}

#[async_trait]
impl DocumentStore for BrokenStore {
    async fn create_document(&self, _collection: &str, _document: Value) -> Result<DocumentId, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::InvalidDocument("disk on fire".to_string()))
    }

    async fn get_documents(
        &self,
        _collection: &str,
        _filter: &Filter,
        _limit: Option<u32>,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::InvalidDocument("disk on fire".to_string()))
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        Err(StoreError::InvalidDocument("disk on fire".to_string()))
    }

    fn name(&self) -> &str {
        "broken"
    }
}

// ===========================================================================
// TEST 1: GET /: liveness message
// ===========================================================================
#[tokio::test]
async fn test_root_endpoint() {
    let (app, _) = memory_app();
    let (status, body) = send(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Personal Finance Assistant API is running"}));
}

// ===========================================================================
// TEST 2: record an expense, then summarize its month
// ===========================================================================
#[tokio::test]
async fn test_transaction_then_summary() {
    let (app, _) = memory_app();

    let (status, body) = send(&app, "POST", "/api/transactions", Some(groceries_expense())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(!body["id"].as_str().unwrap().is_empty());

    let (status, body) = send(&app, "GET", "/api/summary?month=2025-01", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "income": 0.0,
            "expense": 50.0,
            "net": -50.0,
            "categories": {"groceries": 50.0},
            "budgets": {}
        })
    );

    // Another month sees nothing
    let (_, feb) = send(&app, "GET", "/api/summary?month=2025-02", None).await;
    assert_eq!(feb["expense"], 0.0);
    assert_eq!(feb["categories"], json!({}));
}

// ===========================================================================
// TEST 3: budget chat reports over-limit categories
// ===========================================================================
#[tokio::test]
async fn test_budget_chat_over_limit() {
    let (app, store) = memory_app();
    send(&app, "POST", "/api/transactions", Some(groceries_expense())).await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/budgets",
        Some(json!({"month": "2025-01", "category": "groceries", "limit": 40})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        "/api/chat",
        Some(json!({"message": "How is my budget?", "month": "2025-01"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reply = body["reply"].as_str().unwrap();
    assert!(reply.starts_with("Budgets:"), "reply: {}", reply);
    assert!(reply.contains("groceries: 50.00/40.00 (over)"), "reply: {}", reply);
    assert_eq!(body["summary"]["budgets"], json!({"groceries": 40.0}));

    // Both sides of the exchange were logged
    let log = store.get_documents("chatmessage", &Filter::all(), None).await.unwrap();
    assert_eq!(log.len(), 2);
}

// ===========================================================================
// TEST 4: unrecognised chat falls back to help text
// ===========================================================================
#[tokio::test]
async fn test_chat_fallback() {
    let (app, _) = memory_app();
    let (status, body) = send(&app, "POST", "/api/chat", Some(json!({"message": "hello"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], tally_core::assistant::HELP_TEXT);
    assert_eq!(body["summary"]["net"], 0.0);
}

// ===========================================================================
// TEST 5: schema violations are rejected and write nothing
// ===========================================================================
#[tokio::test]
async fn test_invalid_payloads_write_nothing() {
    let (app, store) = memory_app();

    let bad = [
        json!({"amount": 0, "type": "expense", "category": "x", "date": "2025-01-05"}),
        json!({"amount": -3, "type": "expense", "category": "x", "date": "2025-01-05"}),
        json!({"amount": 3, "type": "refund", "category": "x", "date": "2025-01-05"}),
        json!({"amount": 3, "type": "income", "category": "x", "date": "2025-02-30"}),
        json!({"amount": 3, "type": "income", "category": "x"}),
        json!({"amount": 3, "type": "income", "category": "x", "date": "2025-01-05", "extra": 1}),
    ];
    for payload in bad {
        let (status, body) = send(&app, "POST", "/api/transactions", Some(payload.clone())).await;
        assert!(status.is_client_error(), "{} accepted with {}", payload, status);
        assert_eq!(body["status"], "error", "payload: {}", payload);
    }

    let (status, _) = send(
        &app,
        "POST",
        "/api/budgets",
        Some(json!({"month": "2025-1", "category": "rent", "limit": 10})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        "POST",
        "/api/budgets",
        Some(json!({"month": "2025-01", "category": "rent", "limit": -1})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    assert!(store.list_collections().await.unwrap().is_empty());
}

// ===========================================================================
// TEST 6: malformed JSON and query strings are 400s
// ===========================================================================
#[tokio::test]
async fn test_malformed_requests() {
    let (app, _) = memory_app();
    assert_eq!(send_raw(&app, "/api/transactions", "{not json").await, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", "/api/transactions?limit=lots", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let (status, _) = send(&app, "GET", "/api/summary?month=January", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ===========================================================================
// TEST 7: listing renders stored dates as YYYY-MM-DD and honours limit
// ===========================================================================
#[tokio::test]
async fn test_list_transactions() {
    let (app, _) = memory_app();
    for day in ["2025-01-05", "2025-01-06", "2025-01-07"] {
        let mut tx = groceries_expense();
        tx["date"] = json!(day);
        send(&app, "POST", "/api/transactions", Some(tx)).await;
    }

    let (status, body) = send(&app, "GET", "/api/transactions", None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["date"], "2025-01-05");
    assert_eq!(items[0]["amount"], 50.0);
    assert_eq!(items[0]["category"], "groceries");

    let (_, body) = send(&app, "GET", "/api/transactions?limit=2", None).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
}

// ===========================================================================
// TEST 8: summary is stable across repeated reads
// ===========================================================================
#[tokio::test]
async fn test_summary_idempotent() {
    let (app, _) = memory_app();
    send(&app, "POST", "/api/transactions", Some(groceries_expense())).await;
    send(
        &app,
        "POST",
        "/api/transactions",
        Some(json!({"amount": 1200, "type": "income", "category": "salary", "date": "2025-01-31"})),
    )
    .await;

    let (_, first) = send(&app, "GET", "/api/summary", None).await;
    let (_, second) = send(&app, "GET", "/api/summary", None).await;
    assert_eq!(first, second);
    assert_eq!(first["net"], 1150.0);
    assert_eq!(first["categories"], json!({"groceries": 50.0}));
}

// ===========================================================================
// TEST 9: budgets listing filters by month
// ===========================================================================
#[tokio::test]
async fn test_list_budgets_by_month() {
    let (app, _) = memory_app();
    for (month, limit) in [("2025-01", 40), ("2025-02", 60)] {
        send(
            &app,
            "POST",
            "/api/budgets",
            Some(json!({"month": month, "category": "groceries", "limit": limit})),
        )
        .await;
    }

    let (status, body) = send(&app, "GET", "/api/budgets?month=2025-02", None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["limit"], 60.0);

    let (_, body) = send(&app, "GET", "/api/budgets", None).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
}

// ===========================================================================
// TEST 10: /test diagnostic with a working and a failing store
// ===========================================================================
#[tokio::test]
async fn test_diagnostics_endpoint() {
    let (app, _) = memory_app();
    send(&app, "POST", "/api/transactions", Some(groceries_expense())).await;
    let (status, body) = send(&app, "GET", "/test", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connection_status"], "Connected");
    assert_eq!(body["collections"], json!(["transaction"]));

    let broken = Arc::new(HttpState {
        store: Arc::new(BrokenStore { calls: AtomicUsize::new(0) }),
        config: TallyConfig::in_memory(),
    });
    let (status, body) = send(&build_router(broken), "GET", "/test", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connection_status"], "Not Connected");
    assert!(body["database"].as_str().unwrap().starts_with("⚠️ Connected but Error:"));
}

// ===========================================================================
// TEST 11: store failures surface as 500 with the error shape
// ===========================================================================
#[tokio::test]
async fn test_store_failure_is_server_error() {
    let store = Arc::new(BrokenStore { calls: AtomicUsize::new(0) });
    let state = Arc::new(HttpState {
        store: store.clone(),
        config: TallyConfig::in_memory(),
    });
    let app = build_router(state);

    let (status, body) = send(&app, "POST", "/api/transactions", Some(groceries_expense())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert!(body["error"].as_str().unwrap().contains("disk on fire"));

    let (status, _) = send(&app, "GET", "/api/summary", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    // Validation happens before the store is touched
    let before = store.calls.load(Ordering::SeqCst);
    let (status, _) = send(&app, "GET", "/api/summary?month=2025-13", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(store.calls.load(Ordering::SeqCst), before);
}

// ===========================================================================
// TEST 12: totals that overflow f64 are server errors, never `null`
// ===========================================================================
#[tokio::test]
async fn test_overflowing_summary_is_server_error() {
    let (app, _) = memory_app();
    for _ in 0..2 {
        let mut tx = groceries_expense();
        tx["amount"] = json!(1.7e308);
        let (status, _) = send(&app, "POST", "/api/transactions", Some(tx)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, "GET", "/api/summary?month=2025-01", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert!(body["error"].as_str().unwrap().contains("expense"));

    let (status, _) = send(&app, "POST", "/api/chat", Some(json!({"message": "what did I spend?"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

// ===========================================================================
// TEST 13: the last four-digit month still sees its own transactions
// ===========================================================================
#[tokio::test]
async fn test_last_representable_month_summary() {
    let (app, _) = memory_app();
    let mut tx = groceries_expense();
    tx["date"] = json!("9999-12-15");
    send(&app, "POST", "/api/transactions", Some(tx)).await;

    let (status, body) = send(&app, "GET", "/api/summary?month=9999-12", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expense"], 50.0);
    assert_eq!(body["categories"], json!({"groceries": 50.0}));
}

// ===========================================================================
// TEST 14: end-to-end against PostgreSQL (skipped without a database)
// ===========================================================================
#[tokio::test]
async fn test_postgres_round_trip() {
    let url = match std::env::var("TALLY_TEST_DATABASE_URL") {
        Ok(u) => u,
        Err(_) => {
            eprintln!("Skipping test_postgres_round_trip: TALLY_TEST_DATABASE_URL not set");
            return;
        }
    };

    let mut config = TallyConfig::in_memory();
    config.database.backend = StoreBackend::Postgres;
    config.database.url = url;

    let store = match tally_core::open_store(&config.database).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Skipping test_postgres_round_trip: {}", e);
            return;
        }
    };
    let app = build_router(Arc::new(HttpState { store, config }));

    // A far-future month keeps this isolated from rows left by other runs
    let mut tx = groceries_expense();
    tx["date"] = json!("2999-07-14");
    let (status, _) = send(&app, "POST", "/api/transactions", Some(tx)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/api/summary?month=2999-07", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["expense"].as_f64().unwrap() >= 50.0);

    let (_, diag) = send(&app, "GET", "/test", None).await;
    assert_eq!(diag["store_backend"], "postgres");
    assert_eq!(diag["database_url"], "✅ Set");
}
