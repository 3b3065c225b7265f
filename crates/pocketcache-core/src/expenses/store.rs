//! SQLite-backed expense store.
//!
//! The store is an owned value with an explicit lifecycle: construct it with a
//! database path, `init` it before use and `close` it when done. Every
//! operation outside the `Ready` state fails with `StoreError::NotInitialized`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::StoreError;
use crate::models::{Category, Expense};
use crate::utils::round_cents;

/// Database file name inside the data directory
pub const DATABASE_FILE: &str = "expenses.db";

/// Format SQLite uses for `CURRENT_TIMESTAMP`
const SQLITE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS expenses (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        amount REAL NOT NULL,
        category TEXT NOT NULL,
        date TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )
"#;

const INSERT_EXPENSE: &str = r#"
    INSERT INTO expenses (id, name, amount, category, date)
    VALUES (?1, ?2, ?3, ?4, ?5)
"#;

// Ties on the second-resolution timestamp fall back to insertion order
const SELECT_ALL: &str = r#"
    SELECT id, name, amount, category, date, CAST(created_at AS TEXT) AS created_at
    FROM expenses
    ORDER BY created_at DESC, rowid DESC
"#;

const SELECT_BY_CATEGORY: &str = r#"
    SELECT id, name, amount, category, date, CAST(created_at AS TEXT) AS created_at
    FROM expenses
    WHERE category = ?1
    ORDER BY created_at DESC, rowid DESC
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

enum StoreState {
    Uninitialized,
    Initializing,
    Ready(SqlitePool),
    Closed,
}

impl StoreState {
    fn status(&self) -> StoreStatus {
        match self {
            StoreState::Uninitialized => StoreStatus::Uninitialized,
            StoreState::Initializing => StoreStatus::Initializing,
            StoreState::Ready(_) => StoreStatus::Ready,
            StoreState::Closed => StoreStatus::Closed,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ExpenseRow {
    id: String,
    name: String,
    amount: f64,
    category: String,
    date: String,
    created_at: Option<String>,
}

impl ExpenseRow {
    fn into_expense(self) -> Result<Expense, StoreError> {
        let invalid = |reason: String| StoreError::InvalidRow {
            id: self.id.clone(),
            reason,
        };

        let category: Category = self
            .category
            .parse()
            .map_err(|e: crate::models::ValidationError| invalid(e.to_string()))?;

        let date = DateTime::parse_from_rfc3339(&self.date)
            .map_err(|e| invalid(format!("bad date {:?}: {}", self.date, e)))?
            .with_timezone(&Utc);

        let created_at = match self.created_at.as_deref() {
            Some(raw) => Some(parse_created_at(raw).ok_or_else(|| {
                invalid(format!("bad created_at {:?}", raw))
            })?),
            None => None,
        };

        Ok(Expense {
            id: self.id,
            name: self.name,
            amount: self.amount,
            category,
            date,
            created_at,
        })
    }
}

fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, SQLITE_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub struct ExpenseStore {
    database_path: PathBuf,
    state: RwLock<StoreState>,
}

impl ExpenseStore {
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            database_path,
            state: RwLock::new(StoreState::Uninitialized),
        }
    }

    /// Store at `<data_dir>/expenses.db`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(DATABASE_FILE))
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub async fn status(&self) -> StoreStatus {
        self.state.read().await.status()
    }

    /// Open the database and create the schema if absent. Valid from
    /// `Uninitialized` or `Closed`; a no-op when already `Ready`.
    pub async fn init(&self) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if matches!(*state, StoreState::Ready(_)) {
            return Ok(());
        }

        let previous = std::mem::replace(&mut *state, StoreState::Initializing);
        match Self::open(&self.database_path).await {
            Ok(pool) => {
                info!(path = %self.database_path.display(), "Expense database ready");
                *state = StoreState::Ready(pool);
                Ok(())
            }
            Err(e) => {
                warn!(path = %self.database_path.display(), error = %e, "Database initialization failed");
                *state = previous;
                Err(e)
            }
        }
    }

    async fn open(path: &Path) -> Result<SqlitePool, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        // One connection: every caller goes through the same handle
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        Ok(pool)
    }

    /// Release the database handle. Operations fail until `init` is called again.
    pub async fn close(&self) {
        let mut state = self.state.write().await;
        let StoreState::Ready(pool) = &*state else {
            return;
        };
        pool.close().await;
        *state = StoreState::Closed;
        info!(path = %self.database_path.display(), "Expense database closed");
    }

    async fn pool(&self) -> Result<SqlitePool, StoreError> {
        match &*self.state.read().await {
            StoreState::Ready(pool) => Ok(pool.clone()),
            _ => Err(StoreError::NotInitialized),
        }
    }

    pub async fn insert(&self, expense: &Expense) -> Result<(), StoreError> {
        let pool = self.pool().await?;
        Self::insert_with(&pool, expense).await?;
        debug!(id = %expense.id, "Inserted expense");
        Ok(())
    }

    async fn insert_with(pool: &SqlitePool, expense: &Expense) -> Result<(), StoreError> {
        sqlx::query(INSERT_EXPENSE)
            .bind(&expense.id)
            .bind(&expense.name)
            .bind(expense.amount)
            .bind(expense.category.as_str())
            .bind(format_date(&expense.date))
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Insert rows one at a time. The first failure stops the sequence and
    /// rows inserted before it stay in place; there is no transaction.
    pub async fn bulk_insert(&self, expenses: &[Expense]) -> Result<(), StoreError> {
        let pool = self.pool().await?;
        for (index, expense) in expenses.iter().enumerate() {
            if let Err(e) = Self::insert_with(&pool, expense).await {
                warn!(id = %expense.id, inserted = index, error = %e, "Bulk insert stopped");
                return Err(e);
            }
        }
        debug!(count = expenses.len(), "Bulk inserted expenses");
        Ok(())
    }

    /// All expenses, newest first
    pub async fn get_all(&self) -> Result<Vec<Expense>, StoreError> {
        let pool = self.pool().await?;
        let rows: Vec<ExpenseRow> = sqlx::query_as(SELECT_ALL).fetch_all(&pool).await?;
        rows.into_iter().map(ExpenseRow::into_expense).collect()
    }

    pub async fn get_by_category(&self, category: Category) -> Result<Vec<Expense>, StoreError> {
        let pool = self.pool().await?;
        let rows: Vec<ExpenseRow> = sqlx::query_as(SELECT_BY_CATEGORY)
            .bind(category.as_str())
            .fetch_all(&pool)
            .await?;
        rows.into_iter().map(ExpenseRow::into_expense).collect()
    }

    /// Delete by id. Succeeds whether or not the id exists.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let pool = self.pool().await?;
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?1")
            .bind(id)
            .execute(&pool)
            .await?;
        debug!(id = id, removed = result.rows_affected(), "Deleted expense");
        Ok(())
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        let pool = self.pool().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM expenses")
            .fetch_one(&pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    /// Sum of all amounts, rounded to cents
    pub async fn total_amount(&self) -> Result<f64, StoreError> {
        let pool = self.pool().await?;
        let total: f64 = sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0.0) FROM expenses")
            .fetch_one(&pool)
            .await?;
        Ok(round_cents(total))
    }

    pub async fn clear_all(&self) -> Result<(), StoreError> {
        let pool = self.pool().await?;
        let result = sqlx::query("DELETE FROM expenses").execute(&pool).await?;
        info!(removed = result.rows_affected(), "Cleared all expenses");
        Ok(())
    }
}
