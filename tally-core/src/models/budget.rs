use serde::{Deserialize, Serialize};

use super::month::YearMonth;
use super::{require_finite, StoredId};
use crate::error::ValidationError;

/// Budget body as accepted by `POST /api/budgets`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BudgetInput {
    /// `YYYY-MM`
    pub month: String,
    pub category: String,
    pub limit: f64,
}

/// A monthly spending ceiling for one category. Also the stored document shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub month: YearMonth,
    pub category: String,
    pub limit: f64,
}

impl BudgetInput {
    pub fn validate(self) -> Result<Budget, ValidationError> {
        let month = self.month.parse()?;
        require_finite("limit", self.limit)?;
        if self.limit < 0.0 {
            return Err(ValidationError::Negative {
                field: "limit",
                value: self.limit,
            });
        }
        Ok(Budget {
            month,
            category: self.category,
            limit: self.limit,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRecord {
    pub id: StoredId,
    pub month: YearMonth,
    pub category: String,
    pub limit: f64,
}

impl BudgetRecord {
    pub fn new(id: StoredId, b: Budget) -> Self {
        Self {
            id,
            month: b.month,
            category: b.category,
            limit: b.limit,
        }
    }
}
