//! Tally HTTP REST API
//!
//! Axum router exposing the ledger, the period summary and the finance chat.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to an
//! inner function taking plain arguments and returning `(StatusCode, Value)`.
//! The inner functions are directly testable without axum dispatch machinery.
//!
//! Endpoints:
//! - GET  /                 : liveness message
//! - GET  /test             : store connectivity diagnostic
//! - POST /api/transactions : record a transaction
//! - GET  /api/transactions : list transactions (`limit`, default 100)
//! - GET  /api/summary      : income/expense/net and breakdowns (`month`)
//! - POST /api/budgets      : add a monthly budget
//! - GET  /api/budgets      : list budgets (`month`)
//! - POST /api/chat         : rule-based finance assistant

use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tally_core::config::DatabaseConfig;
use tally_core::models::{parse_optional_month, BudgetInput, TransactionInput};
use tally_core::{assistant, ledger, ChatRequest, DocumentStore, TallyConfig, TallyError};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub const ROOT_MESSAGE: &str = "Personal Finance Assistant API is running";

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub store: Arc<dyn DocumentStore>,
    pub config: TallyConfig,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/test", get(diagnostics_handler))
        .route(
            "/api/transactions",
            get(list_transactions_handler).post(create_transaction_handler),
        )
        .route("/api/summary", get(summary_handler))
        .route("/api/budgets", get(list_budgets_handler).post(create_budget_handler))
        .route("/api/chat", post(chat_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    store: Arc<dyn DocumentStore>,
    config: TallyConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", config.http.host, config.http.port);
    let state = Arc::new(HttpState { store, config });

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Tally HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
pub struct MonthQuery {
    pub month: Option<String>,
}

/// Standard HTTP error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: "error".to_string(),
        }
    }

    fn into_value(self) -> Value {
        json!({ "error": self.error, "status": self.status })
    }
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner root: liveness message (pure, no IO).
pub fn root_inner() -> Value {
    json!({ "message": ROOT_MESSAGE })
}

/// Inner diagnostic: reports configuration and whether the store answers.
pub async fn diagnostics_inner(store: &dyn DocumentStore, database: &DatabaseConfig) -> Value {
    let set = |configured: bool| if configured { "✅ Set" } else { "❌ Not Set" };

    let mut body = json!({
        "backend": "✅ Running",
        "database": "✅ Available",
        "database_url": set(database.url_is_set()),
        "database_name": set(database.name_is_set()),
        "store_backend": store.name(),
        "connection_status": "Not Connected",
        "collections": [],
    });

    match store.list_collections().await {
        Ok(mut names) => {
            names.truncate(10);
            body["collections"] = json!(names);
            body["database"] = json!("✅ Connected & Working");
            body["connection_status"] = json!("Connected");
        }
        Err(e) => {
            let detail: String = e.to_string().chars().take(80).collect();
            body["database"] = json!(format!("⚠️ Connected but Error: {}", detail));
        }
    }

    body
}

pub async fn create_transaction_inner(
    store: &dyn DocumentStore,
    input: TransactionInput,
) -> (StatusCode, Value) {
    match ledger::record_transaction(store, input).await {
        Ok(id) => (StatusCode::OK, json!({ "id": id.to_string(), "status": "ok" })),
        Err(e) => error_response(&e),
    }
}

pub async fn list_transactions_inner(store: &dyn DocumentStore, query: ListQuery) -> (StatusCode, Value) {
    match ledger::list_transactions(store, query.limit).await {
        Ok(items) => (StatusCode::OK, json!({ "items": items })),
        Err(e) => error_response(&e),
    }
}

pub async fn summary_inner(store: &dyn DocumentStore, query: MonthQuery) -> (StatusCode, Value) {
    let result = async {
        let month = parse_optional_month(query.month.as_deref())?;
        ledger::summary(store, month).await
    }
    .await;

    match result {
        Ok(summary) => (StatusCode::OK, json!(summary)),
        Err(e) => error_response(&e),
    }
}

pub async fn create_budget_inner(store: &dyn DocumentStore, input: BudgetInput) -> (StatusCode, Value) {
    match ledger::set_budget(store, input).await {
        Ok(id) => (StatusCode::OK, json!({ "id": id.to_string(), "status": "ok" })),
        Err(e) => error_response(&e),
    }
}

pub async fn list_budgets_inner(store: &dyn DocumentStore, query: MonthQuery) -> (StatusCode, Value) {
    let result = async {
        let month = parse_optional_month(query.month.as_deref())?;
        ledger::list_budgets(store, month).await
    }
    .await;

    match result {
        Ok(items) => (StatusCode::OK, json!({ "items": items })),
        Err(e) => error_response(&e),
    }
}

pub async fn chat_inner(store: &dyn DocumentStore, req: ChatRequest) -> (StatusCode, Value) {
    match assistant::respond(store, req).await {
        Ok(resp) => (StatusCode::OK, json!(resp)),
        Err(e) => error_response(&e),
    }
}

// ============================================================================
// Axum handler wrappers (thin: delegate to inner functions)
// ============================================================================

pub async fn root_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(root_inner()))
}

pub async fn diagnostics_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let body = diagnostics_inner(state.store.as_ref(), &state.config.database).await;
    (StatusCode::OK, Json(body))
}

pub async fn create_transaction_handler(
    State(state): State<Arc<HttpState>>,
    payload: std::result::Result<Json<TransactionInput>, JsonRejection>,
) -> impl IntoResponse {
    let (status, body) = match payload {
        Ok(Json(input)) => create_transaction_inner(state.store.as_ref(), input).await,
        Err(rejection) => rejection_response(rejection.status(), rejection.body_text()),
    };
    (status, Json(body))
}

pub async fn list_transactions_handler(
    State(state): State<Arc<HttpState>>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> impl IntoResponse {
    let (status, body) = match query {
        Ok(Query(q)) => list_transactions_inner(state.store.as_ref(), q).await,
        Err(rejection) => rejection_response(rejection.status(), rejection.body_text()),
    };
    (status, Json(body))
}

pub async fn summary_handler(
    State(state): State<Arc<HttpState>>,
    query: std::result::Result<Query<MonthQuery>, QueryRejection>,
) -> impl IntoResponse {
    let (status, body) = match query {
        Ok(Query(q)) => summary_inner(state.store.as_ref(), q).await,
        Err(rejection) => rejection_response(rejection.status(), rejection.body_text()),
    };
    (status, Json(body))
}

pub async fn create_budget_handler(
    State(state): State<Arc<HttpState>>,
    payload: std::result::Result<Json<BudgetInput>, JsonRejection>,
) -> impl IntoResponse {
    let (status, body) = match payload {
        Ok(Json(input)) => create_budget_inner(state.store.as_ref(), input).await,
        Err(rejection) => rejection_response(rejection.status(), rejection.body_text()),
    };
    (status, Json(body))
}

pub async fn list_budgets_handler(
    State(state): State<Arc<HttpState>>,
    query: std::result::Result<Query<MonthQuery>, QueryRejection>,
) -> impl IntoResponse {
    let (status, body) = match query {
        Ok(Query(q)) => list_budgets_inner(state.store.as_ref(), q).await,
        Err(rejection) => rejection_response(rejection.status(), rejection.body_text()),
    };
    (status, Json(body))
}

pub async fn chat_handler(
    State(state): State<Arc<HttpState>>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> impl IntoResponse {
    let (status, body) = match payload {
        Ok(Json(req)) => chat_inner(state.store.as_ref(), req).await,
        Err(rejection) => rejection_response(rejection.status(), rejection.body_text()),
    };
    (status, Json(body))
}

// ============================================================================
// Helpers
// ============================================================================

/// Map a ledger error to a transport status: schema violations are the
/// caller's fault, everything else is a generic server error.
pub fn error_response(err: &TallyError) -> (StatusCode, Value) {
    if err.is_client_error() {
        tracing::debug!(error = %err, "Rejected request");
        (StatusCode::UNPROCESSABLE_ENTITY, ErrorResponse::new(err.to_string()).into_value())
    } else {
        tracing::error!(error = %err, "Request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new(err.to_string()).into_value())
    }
}

/// Body/query extraction failures keep axum's status (400/415/422) with our error shape.
fn rejection_response(status: StatusCode, text: String) -> (StatusCode, Value) {
    (status, ErrorResponse::new(text).into_value())
}

// ============================================================================
// Unit Tests: call inner functions directly
// ============================================================================
