use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::month::midnight_utc;
use super::{require_finite, StoredId};
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Expense,
    Income,
}

/// Transaction body as accepted by `POST /api/transactions`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionInput {
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: String,
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A validated transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub amount: f64,
    pub kind: TransactionKind,
    pub category: String,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

impl TransactionInput {
    pub fn validate(self) -> Result<Transaction, ValidationError> {
        require_finite("amount", self.amount)?;
        if self.amount <= 0.0 {
            return Err(ValidationError::NotPositive {
                field: "amount",
                value: self.amount,
            });
        }
        let date = parse_iso_date(&self.date)?;
        Ok(Transaction {
            amount: self.amount,
            kind: self.kind,
            category: self.category,
            date,
            notes: self.notes,
        })
    }
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static date pattern"))
}

/// Strict `YYYY-MM-DD`: four-digit year and a real calendar day.
pub fn parse_iso_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    if !date_pattern().is_match(raw) {
        return Err(ValidationError::InvalidDate(raw.to_string()));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}

/// Shape written to the `transaction` collection: `date` normalized to a UTC midnight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDocument {
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<&Transaction> for TransactionDocument {
    fn from(t: &Transaction) -> Self {
        Self {
            amount: t.amount,
            kind: t.kind,
            category: t.category.clone(),
            date: midnight_utc(t.date),
            notes: t.notes.clone(),
        }
    }
}

impl From<TransactionDocument> for Transaction {
    fn from(d: TransactionDocument) -> Self {
        Self {
            amount: d.amount,
            kind: d.kind,
            category: d.category,
            date: d.date.date_naive(),
            notes: d.notes,
        }
    }
}

/// Transaction as returned to clients: store id as a string, date as `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    pub id: StoredId,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: String,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

impl TransactionRecord {
    pub fn new(id: StoredId, t: Transaction) -> Self {
        Self {
            id,
            amount: t.amount,
            kind: t.kind,
            category: t.category,
            date: t.date,
            notes: t.notes,
        }
    }
}
