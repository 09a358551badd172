//! Rule-based finance assistant
//!
//! Routes a free-text message to one of four intents by keyword, grounds the
//! reply in the period summary, and appends the exchange to the chat log.
//!
//! Routing (lower-cased message, first match wins):
//! - "spend" / "expense" → spending total and top category
//! - "income"            → income and net
//! - "budget"            → spent vs. limit per budgeted category
//! - anything else       → help text

use serde::{Deserialize, Serialize};

use crate::error::TallyError;
use crate::ledger;
use crate::models::{collections, parse_optional_month, ChatMessage, YearMonth};
use crate::store::{insert_record, DocumentStore};
use crate::summary::Summary;

pub const HELP_TEXT: &str = "I can help with your personal finance. Ask things like 'show expenses this month', \
'what's my income', or 'how am I doing against my budget?'.";

pub const NO_BUDGETS_TEXT: &str = "No budgets set yet.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Spending,
    Income,
    Budget,
    Help,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub summary: Summary,
}

pub fn classify(message: &str) -> Intent {
    let text = message.to_lowercase();
    if text.contains("spend") || text.contains("expense") {
        Intent::Spending
    } else if text.contains("income") {
        Intent::Income
    } else if text.contains("budget") {
        Intent::Budget
    } else {
        Intent::Help
    }
}

fn period_label(month: Option<YearMonth>) -> String {
    month.map_or_else(|| "all time".to_string(), |m| m.to_string())
}

pub fn compose_reply(intent: Intent, summary: &Summary, month: Option<YearMonth>) -> String {
    match intent {
        Intent::Spending => {
            let mut reply = format!(
                "For {}, you spent ${:.2}. ",
                period_label(month),
                summary.expense
            );
            if let Some((category, amount)) = summary.categories.top() {
                reply.push_str(&format!(
                    "Your top spending category is {} at ${:.2}. ",
                    category, amount
                ));
            }
            reply
        }
        Intent::Income => format!(
            "For {}, your income totals ${:.2}. Net is ${:.2}.",
            period_label(month),
            summary.income,
            summary.net
        ),
        Intent::Budget => {
            if summary.budgets.is_empty() {
                return NO_BUDGETS_TEXT.to_string();
            }
            let mut lines = vec!["Budgets:".to_string()];
            for (category, limit) in summary.budgets.iter() {
                let spent = summary.categories.get(category).unwrap_or(0.0);
                let status = if spent > limit { "over" } else { "under" };
                lines.push(format!("- {}: {:.2}/{:.2} ({})", category, spent, limit, status));
            }
            lines.join("\n")
        }
        Intent::Help => HELP_TEXT.to_string(),
    }
}

/// Answer a chat message. The month is validated before anything is read.
pub async fn respond(store: &dyn DocumentStore, request: ChatRequest) -> Result<ChatResponse, TallyError> {
    let month = parse_optional_month(request.month.as_deref())?;
    let summary = ledger::summary(store, month).await?;
    let intent = classify(&request.message);
    let reply = compose_reply(intent, &summary, month);
    tracing::debug!(?intent, period = %period_label(month), "Composed chat reply");

    record_exchange(store, &request.message, &reply, request.session_id).await;

    Ok(ChatResponse { reply, summary })
}

/// Best-effort append of both sides of the exchange; failures are logged and dropped.
async fn record_exchange(store: &dyn DocumentStore, message: &str, reply: &str, session_id: Option<String>) {
    let entries = [
        ChatMessage::user(message, session_id.clone()),
        ChatMessage::assistant(reply, session_id),
    ];
    for entry in &entries {
        if let Err(e) = insert_record(store, collections::CHAT_MESSAGE, entry).await {
            tracing::warn!(error = %e, role = ?entry.role, "Failed to store chat message; continuing");
            return;
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
