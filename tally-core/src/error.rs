use thiserror::Error;

use crate::store::StoreError;

/// Schema constraint violations. Raised before any store interaction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be greater than 0, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must be greater than or equal to 0, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    #[error("date must be a calendar date in YYYY-MM-DD form, got '{0}'")]
    InvalidDate(String),

    #[error("month must be in YYYY-MM form, got '{0}'")]
    InvalidMonth(String),

    #[error("{0} must not be blank")]
    Blank(&'static str),

    #[error("email must look like an address, got '{0}'")]
    InvalidEmail(String),
}

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Total overflow: {0} is not a finite number")]
    NonFiniteTotal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TallyError {
    /// True when the caller sent something the schemas reject.
    pub fn is_client_error(&self) -> bool {
        matches!(self, TallyError::Validation(_))
    }
}
