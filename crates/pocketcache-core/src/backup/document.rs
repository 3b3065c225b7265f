use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Category, Expense};

/// Document format version written by this crate
pub const BACKUP_VERSION: &str = "1.0";

/// On-disk backup layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub total_expenses: usize,
    #[serde(default)]
    pub app_name: String,
    pub expenses: Vec<BackupExpense>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupExpense {
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub category: Category,
    pub date: DateTime<Utc>,
}

impl From<&Expense> for BackupExpense {
    fn from(expense: &Expense) -> Self {
        Self {
            id: expense.id.clone(),
            name: expense.name.clone(),
            amount: expense.amount,
            category: expense.category,
            date: expense.date,
        }
    }
}

impl From<BackupExpense> for Expense {
    fn from(expense: BackupExpense) -> Self {
        Self {
            id: expense.id,
            name: expense.name,
            amount: expense.amount,
            category: expense.category,
            date: expense.date,
            created_at: None,
        }
    }
}

impl BackupDocument {
    pub fn new(expenses: &[Expense], app_name: &str) -> Self {
        Self {
            version: BACKUP_VERSION.to_string(),
            timestamp: Utc::now(),
            total_expenses: expenses.len(),
            app_name: app_name.to_string(),
            expenses: expenses.iter().map(BackupExpense::from).collect(),
        }
    }
}

/// Top-level shape check: non-empty `version` and `timestamp` strings and an
/// `expenses` array. Records themselves are not inspected.
pub fn has_required_shape(value: &Value) -> bool {
    let non_empty_str = |field: &str| {
        value
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty())
    };
    non_empty_str("version")
        && non_empty_str("timestamp")
        && value.get("expenses").is_some_and(Value::is_array)
}
