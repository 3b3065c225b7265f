use std::collections::BTreeMap;

use thiserror::Error;
use tracing::info;

use super::{ExpenseStore, StoreError};
use crate::backup::{BackupError, BackupManager, BackupReceipt, RestoredBackup};
use crate::models::{sample_expenses, Category, Expense, NewExpense};
use crate::utils::round_cents;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Backup(#[from] BackupError),
}

/// One slice of the spending breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category: Category,
    pub amount: f64,
    /// Share of the overall total, 0-100
    pub percentage: f64,
}

/// Expense store plus its backup file, owned together by whoever drives them.
pub struct ExpenseTracker {
    store: ExpenseStore,
    backups: BackupManager,
}

impl ExpenseTracker {
    pub fn new(store: ExpenseStore, backups: BackupManager) -> Self {
        Self { store, backups }
    }

    pub fn store(&self) -> &ExpenseStore {
        &self.store
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub async fn add(&self, draft: NewExpense) -> Result<Expense, StoreError> {
        let expense = draft.into_expense();
        self.store.insert(&expense).await?;
        Ok(expense)
    }

    /// Populate an empty store with sample data. Returns how many were added.
    pub async fn seed_if_empty(&self) -> Result<usize, StoreError> {
        if self.store.count().await? > 0 {
            return Ok(0);
        }
        let samples = sample_expenses();
        self.store.bulk_insert(&samples).await?;
        info!(count = samples.len(), "Seeded sample expenses");
        Ok(samples.len())
    }

    pub async fn backup_all(&self) -> Result<BackupReceipt, TrackerError> {
        let expenses = self.store.get_all().await?;
        Ok(self.backups.backup(&expenses)?)
    }

    /// Replace the live store contents with the backup. When the backup
    /// cannot be read the store is left as it was.
    pub async fn restore_into_store(&self) -> Result<RestoredBackup, TrackerError> {
        let restored = self.backups.restore()?;
        self.store.clear_all().await?;
        self.store.bulk_insert(&restored.expenses).await?;
        info!(count = restored.expenses.len(), "Applied backup to store");
        Ok(restored)
    }

    /// Totals per category, largest first.
    pub async fn category_breakdown(&self) -> Result<Vec<CategoryTotal>, StoreError> {
        let expenses = self.store.get_all().await?;
        Ok(category_breakdown(&expenses))
    }
}

pub fn category_breakdown(expenses: &[Expense]) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<Category, f64> = BTreeMap::new();
    for expense in expenses {
        *totals.entry(expense.category).or_default() += expense.amount;
    }

    let overall: f64 = totals.values().sum();
    let mut breakdown: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, amount)| CategoryTotal {
            category,
            amount: round_cents(amount),
            percentage: if overall > 0.0 {
                (amount / overall * 1000.0).round() / 10.0
            } else {
                0.0
            },
        })
        .collect();

    breakdown.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    breakdown
}
