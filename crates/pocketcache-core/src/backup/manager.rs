use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::document::{has_required_shape, BackupDocument};
use crate::config::APP_NAME;
use crate::models::Expense;

/// Backup file name in the data directory
pub const BACKUP_FILE: &str = "expenses_backup.json";

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("No expenses to back up")]
    NoData,

    #[error("No backup file found. Create a backup first")]
    NotFound,

    #[error("The backup file is corrupted or in an invalid format: {0}")]
    Corrupt(String),

    #[error("Could not access the backup file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not serialize backup: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct BackupReceipt {
    pub count: usize,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RestoredBackup {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub expenses: Vec<Expense>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackupInfo {
    pub exists: bool,
    pub size_bytes: Option<u64>,
    pub modified: Option<DateTime<Utc>>,
    pub total_expenses: Option<usize>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    NotFound,
    Cancelled,
    Deleted,
}

/// JSON export/import of the full expense set, independent of the live store.
pub struct BackupManager {
    path: PathBuf,
}

impl BackupManager {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Manager for `<data_dir>/expenses_backup.json`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(BACKUP_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(BACKUP_FILE)
    }

    pub fn has_backup(&self) -> bool {
        self.path.exists()
    }

    /// Write `expenses` to the backup file, replacing any previous backup.
    /// An empty set is refused and leaves an existing file untouched.
    pub fn backup(&self, expenses: &[Expense]) -> Result<BackupReceipt, BackupError> {
        if expenses.is_empty() {
            return Err(BackupError::NoData);
        }

        let document = BackupDocument::new(expenses, APP_NAME);
        let contents = serde_json::to_string_pretty(&document)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, contents)?;

        let size_bytes = std::fs::metadata(&self.path)?.len();
        info!(count = expenses.len(), path = %self.path.display(), size_bytes, "Backup written");

        Ok(BackupReceipt {
            count: expenses.len(),
            path: self.path.clone(),
            size_bytes,
            created_at: document.timestamp,
        })
    }

    /// Read the backup file back into records. Never touches the live store;
    /// applying the result is up to the caller.
    pub fn restore(&self) -> Result<RestoredBackup, BackupError> {
        if !self.path.exists() {
            return Err(BackupError::NotFound);
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let value: Value = serde_json::from_str(&contents)
            .map_err(|e| BackupError::Corrupt(format!("not valid JSON ({})", e)))?;

        if !has_required_shape(&value) {
            return Err(BackupError::Corrupt(
                "missing version, timestamp or expenses list".to_string(),
            ));
        }

        let document: BackupDocument = serde_json::from_value(value)
            .map_err(|e| BackupError::Corrupt(e.to_string()))?;

        if document.total_expenses != document.expenses.len() {
            warn!(
                declared = document.total_expenses,
                actual = document.expenses.len(),
                "Backup record count does not match its header"
            );
        }

        info!(count = document.expenses.len(), version = %document.version, "Backup read");

        Ok(RestoredBackup {
            version: document.version,
            timestamp: document.timestamp,
            expenses: document.expenses.into_iter().map(Expense::from).collect(),
        })
    }

    /// Whether a backup exists with the required top-level fields.
    pub fn validate(&self) -> bool {
        if !self.path.exists() {
            return false;
        }
        let parsed = std::fs::read_to_string(&self.path)
            .map_err(|e| e.to_string())
            .and_then(|contents| {
                serde_json::from_str::<Value>(&contents).map_err(|e| e.to_string())
            });
        match parsed {
            Ok(value) => has_required_shape(&value),
            Err(e) => {
                debug!(error = %e, "Backup file failed validation");
                false
            }
        }
    }

    /// File stats plus, when the document parses, its record count and version.
    pub fn info(&self) -> Result<BackupInfo, BackupError> {
        if !self.path.exists() {
            return Ok(BackupInfo::default());
        }

        let metadata = std::fs::metadata(&self.path)?;
        let mut info = BackupInfo {
            exists: true,
            size_bytes: Some(metadata.len()),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            ..BackupInfo::default()
        };

        let header = std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|contents| serde_json::from_str::<Value>(&contents).ok());
        if let Some(header) = header {
            info.total_expenses = header
                .get("totalExpenses")
                .and_then(Value::as_u64)
                .map(|n| n as usize);
            info.version = header
                .get("version")
                .and_then(Value::as_str)
                .map(str::to_string);
        }

        Ok(info)
    }

    /// Delete the backup once `confirm` approves it. `confirm` sees the
    /// current file info and is not called when there is no backup.
    pub fn delete<F>(&self, confirm: F) -> Result<DeleteOutcome, BackupError>
    where
        F: FnOnce(&BackupInfo) -> bool,
    {
        let info = self.info()?;
        if !info.exists {
            return Ok(DeleteOutcome::NotFound);
        }
        if !confirm(&info) {
            return Ok(DeleteOutcome::Cancelled);
        }

        std::fs::remove_file(&self.path)?;
        info!(path = %self.path.display(), "Backup deleted");
        Ok(DeleteOutcome::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    use crate::models::sample_expenses;

    fn manager() -> (BackupManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        (BackupManager::in_dir(temp_dir.path()), temp_dir)
    }

    #[test]
    fn test_backup_then_restore() {
        let (manager, _temp_dir) = manager();
        let expenses = sample_expenses();

        let receipt = manager.backup(&expenses).unwrap();
        assert_eq!(receipt.count, expenses.len());
        assert!(receipt.size_bytes > 0);
        assert_eq!(manager.file_name(), BACKUP_FILE);

        let restored = manager.restore().unwrap();
        assert_eq!(restored.version, "1.0");
        assert_eq!(restored.expenses.len(), expenses.len());
        for (original, back) in expenses.iter().zip(&restored.expenses) {
            assert!(original.same_record(back));
        }
    }

    #[test]
    fn test_empty_backup_is_refused_and_keeps_previous_file() {
        let (manager, _temp_dir) = manager();
        manager.backup(&sample_expenses()).unwrap();
        let before = std::fs::read_to_string(manager.path()).unwrap();

        assert!(matches!(manager.backup(&[]), Err(BackupError::NoData)));
        assert_eq!(std::fs::read_to_string(manager.path()).unwrap(), before);
    }

    #[test]
    fn test_empty_backup_writes_nothing() {
        let (manager, _temp_dir) = manager();
        assert!(matches!(manager.backup(&[]), Err(BackupError::NoData)));
        assert!(!manager.has_backup());
    }

    #[test]
    fn test_restore_without_file() {
        let (manager, _temp_dir) = manager();
        assert!(matches!(manager.restore(), Err(BackupError::NotFound)));
        assert!(!manager.validate());
    }

    #[test]
    fn test_restore_rejects_bad_documents() {
        let (manager, _temp_dir) = manager();

        std::fs::write(manager.path(), "{ not json").unwrap();
        assert!(matches!(manager.restore(), Err(BackupError::Corrupt(_))));

        std::fs::write(manager.path(), r#"{"version": "1.0", "expenses": []}"#).unwrap();
        assert!(matches!(manager.restore(), Err(BackupError::Corrupt(_))));
        assert!(!manager.validate());

        // Passes the shape check but a record is malformed
        std::fs::write(
            manager.path(),
            r#"{"version": "1.0", "timestamp": "2024-09-18T08:15:00.000Z",
                "expenses": [{"id": "1", "name": "x", "amount": "lots", "category": "Food", "date": "2024-09-10T00:00:00Z"}]}"#,
        )
        .unwrap();
        assert!(manager.validate());
        assert!(matches!(manager.restore(), Err(BackupError::Corrupt(_))));
    }

    #[test]
    fn test_restore_parses_dates() {
        let (manager, _temp_dir) = manager();
        std::fs::write(
            manager.path(),
            r#"{"version": "1.0", "timestamp": "2024-09-18T08:15:00.000Z", "totalExpenses": 1,
                "appName": "Expense Tracker",
                "expenses": [{"id": "1", "name": "Bus Ticket", "amount": 3.5, "category": "Transport", "date": "2024-09-11T00:00:00.000Z"}]}"#,
        )
        .unwrap();

        let restored = manager.restore().unwrap();
        assert_eq!(
            restored.expenses[0].date,
            Utc.with_ymd_and_hms(2024, 9, 11, 0, 0, 0).unwrap()
        );
        assert_eq!(
            restored.timestamp,
            Utc.with_ymd_and_hms(2024, 9, 18, 8, 15, 0).unwrap()
        );
    }

    #[test]
    fn test_info() {
        let (manager, _temp_dir) = manager();
        assert_eq!(manager.info().unwrap(), BackupInfo::default());

        manager.backup(&sample_expenses()).unwrap();
        let info = manager.info().unwrap();
        assert!(info.exists);
        assert!(info.size_bytes.unwrap() > 0);
        assert!(info.modified.is_some());
        assert_eq!(info.total_expenses, Some(8));
        assert_eq!(info.version.as_deref(), Some("1.0"));

        // Unparseable content still reports file stats
        std::fs::write(manager.path(), "garbage").unwrap();
        let info = manager.info().unwrap();
        assert!(info.exists);
        assert_eq!(info.size_bytes, Some(7));
        assert_eq!(info.total_expenses, None);
    }

    #[test]
    fn test_delete_flow() {
        let (manager, _temp_dir) = manager();
        assert_eq!(
            manager.delete(|_| panic!("not asked without a backup")).unwrap(),
            DeleteOutcome::NotFound
        );

        manager.backup(&sample_expenses()).unwrap();
        assert_eq!(manager.delete(|_| false).unwrap(), DeleteOutcome::Cancelled);
        assert!(manager.has_backup());

        let outcome = manager
            .delete(|info| info.total_expenses == Some(8))
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert!(!manager.has_backup());
    }
}
