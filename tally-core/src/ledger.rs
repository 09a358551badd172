//! Typed operations over the document store: the write and read paths behind
//! each endpoint. Inputs are validated before the store is touched.

use crate::error::TallyError;
use crate::models::{
    collections, Budget, BudgetInput, BudgetRecord, Transaction, TransactionDocument,
    TransactionInput, TransactionRecord, YearMonth,
};
use crate::store::{insert_record, DocumentId, DocumentStore, Filter, StoreError};
use crate::summary::{summarize, Summary};

/// Default cap for transaction listings.
pub const DEFAULT_LIST_LIMIT: u32 = 100;

pub async fn record_transaction(
    store: &dyn DocumentStore,
    input: TransactionInput,
) -> Result<DocumentId, TallyError> {
    let transaction = input.validate()?;
    let id = insert_record(
        store,
        collections::TRANSACTION,
        &TransactionDocument::from(&transaction),
    )
    .await?;
    tracing::info!(%id, kind = ?transaction.kind, category = %transaction.category, "Recorded transaction");
    Ok(id)
}

pub async fn list_transactions(
    store: &dyn DocumentStore,
    limit: Option<u32>,
) -> Result<Vec<TransactionRecord>, TallyError> {
    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let docs = store
        .get_documents(collections::TRANSACTION, &Filter::all(), Some(limit))
        .await?;
    let records = docs
        .iter()
        .map(|doc| {
            let stored: TransactionDocument = doc.decode(collections::TRANSACTION)?;
            Ok(TransactionRecord::new(doc.id.to_string(), stored.into()))
        })
        .collect::<Result<Vec<_>, StoreError>>()?;
    Ok(records)
}

/// Transactions dated within `month`, or all of them.
pub async fn fetch_transactions(
    store: &dyn DocumentStore,
    month: Option<YearMonth>,
) -> Result<Vec<Transaction>, TallyError> {
    let filter = match month {
        Some(m) => {
            let (start, end) = m.bounds();
            let filter = Filter::all().gte("date", serde_json::to_value(start).map_err(StoreError::Serialize)?);
            match end {
                Some(end) => filter.lt("date", serde_json::to_value(end).map_err(StoreError::Serialize)?),
                None => filter,
            }
        }
        None => Filter::all(),
    };
    let docs = store
        .get_documents(collections::TRANSACTION, &filter, None)
        .await?;
    let transactions = docs
        .iter()
        .map(|doc| doc.decode::<TransactionDocument>(collections::TRANSACTION).map(Transaction::from))
        .collect::<Result<Vec<_>, StoreError>>()?;
    Ok(transactions)
}

pub async fn set_budget(store: &dyn DocumentStore, input: BudgetInput) -> Result<DocumentId, TallyError> {
    let budget = input.validate()?;
    let id = insert_record(store, collections::BUDGET, &budget).await?;
    tracing::info!(%id, month = %budget.month, category = %budget.category, "Stored budget");
    Ok(id)
}

pub async fn list_budgets(
    store: &dyn DocumentStore,
    month: Option<YearMonth>,
) -> Result<Vec<BudgetRecord>, TallyError> {
    let docs = store
        .get_documents(collections::BUDGET, &budget_filter(month), None)
        .await?;
    let records = docs
        .iter()
        .map(|doc| {
            let budget: Budget = doc.decode(collections::BUDGET)?;
            Ok(BudgetRecord::new(doc.id.to_string(), budget))
        })
        .collect::<Result<Vec<_>, StoreError>>()?;
    Ok(records)
}

fn budget_filter(month: Option<YearMonth>) -> Filter {
    match month {
        Some(m) => Filter::all().eq("month", m.to_string()),
        None => Filter::all(),
    }
}

/// Fetch the period's records and aggregate them.
pub async fn summary(store: &dyn DocumentStore, month: Option<YearMonth>) -> Result<Summary, TallyError> {
    let transactions = fetch_transactions(store, month).await?;
    let docs = store
        .get_documents(collections::BUDGET, &budget_filter(month), None)
        .await?;
    let budgets = docs
        .iter()
        .map(|doc| doc.decode::<Budget>(collections::BUDGET))
        .collect::<Result<Vec<_>, StoreError>>()?;
    let summary = summarize(&transactions, &budgets, month);
    if let Some(field) = summary.non_finite_field() {
        tracing::error!(field = %field, period = ?month.map(|m| m.to_string()), "Summary total overflowed");
        return Err(TallyError::NonFiniteTotal(field));
    }
    Ok(summary)
}
