//! Aggregation engine: reduces transactions and budgets into period totals.
//!
//! `summarize` is pure: the ledger fetches records from the store (already
//! narrowed to the month), and this module applies the same month rule again so
//! the result never depends on how well a backend filters.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::models::{Budget, Transaction, TransactionKind, YearMonth};

/// Category → amount, kept in first-encounter order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTotals {
    entries: Vec<(String, f64)>,
}

impl CategoryTotals {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, category: &str) -> Option<usize> {
        self.entries.iter().position(|(c, _)| c == category)
    }

    /// Add `amount` to the category's running total.
    pub fn add(&mut self, category: &str, amount: f64) {
        match self.position(category) {
            Some(i) => self.entries[i].1 += amount,
            None => self.entries.push((category.to_string(), amount)),
        }
    }

    /// Replace the category's value. A known category keeps its position.
    pub fn set(&mut self, category: &str, value: f64) {
        match self.position(category) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((category.to_string(), value)),
        }
    }

    pub fn get(&self, category: &str) -> Option<f64> {
        self.position(category).map(|i| self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v).sum()
    }

    /// Largest entry; on ties the first one encountered wins.
    pub fn top(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (category, value) in self.iter() {
            match best {
                Some((_, current)) if value <= current => {}
                _ => best = Some((category, value)),
            }
        }
        best
    }
}

impl Serialize for CategoryTotals {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (category, value) in &self.entries {
            map.serialize_entry(category, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub income: f64,
    pub expense: f64,
    pub net: f64,
    /// Expense totals per category.
    pub categories: CategoryTotals,
    /// Effective limit per budgeted category.
    pub budgets: CategoryTotals,
}

impl Summary {
    /// Name of the first total that overflowed to a non-finite value, if any.
    pub fn non_finite_field(&self) -> Option<String> {
        let scalars = [("income", self.income), ("expense", self.expense), ("net", self.net)];
        if let Some((name, _)) = scalars.iter().find(|(_, v)| !v.is_finite()) {
            return Some(name.to_string());
        }
        self.categories
            .iter()
            .find(|(_, v)| !v.is_finite())
            .map(|(category, _)| format!("categories.{}", category))
    }
}

/// Compute income/expense/net, per-category spend and budget limits.
///
/// With `month`, only transactions dated in `[first of month, first of next month)`
/// and budgets for exactly that month count. Budgets are applied in order, so a
/// later record for the same category replaces an earlier one.
pub fn summarize(transactions: &[Transaction], budgets: &[Budget], month: Option<YearMonth>) -> Summary {
    let mut summary = Summary::default();

    for t in transactions
        .iter()
        .filter(|t| month.map_or(true, |m| m.contains(t.date)))
    {
        match t.kind {
            TransactionKind::Income => summary.income += t.amount,
            TransactionKind::Expense => {
                summary.expense += t.amount;
                summary.categories.add(&t.category, t.amount);
            }
        }
    }
    summary.net = summary.income - summary.expense;

    for b in budgets.iter().filter(|b| month.map_or(true, |m| b.month == m)) {
        summary.budgets.set(&b.category, b.limit);
    }

    summary
}
