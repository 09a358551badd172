//! Typed records for the four document shapes and their validation rules.

pub mod budget;
pub mod chat;
pub mod month;
pub mod transaction;
pub mod user;

pub use budget::{Budget, BudgetInput, BudgetRecord};
pub use chat::{ChatMessage, ChatRole};
pub use month::{parse_optional_month, YearMonth};
pub use transaction::{
    Transaction, TransactionDocument, TransactionInput, TransactionKind, TransactionRecord,
};
pub use user::User;

use crate::error::ValidationError;

/// Store-generated identifier as surfaced to clients.
pub type StoredId = String;

/// Collection names: the lower-cased shape name.
pub mod collections {
    pub const USER: &str = "user";
    pub const TRANSACTION: &str = "transaction";
    pub const BUDGET: &str = "budget";
    pub const CHAT_MESSAGE: &str = "chatmessage";
}

pub(crate) fn require_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NotFinite { field })
    }
}
