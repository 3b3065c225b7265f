//! File-based JSON backup and restore of expense records.
//!
//! A backup is a single pretty-printed document holding every record plus
//! format version, timestamp, record count and application name. Restoring
//! returns the records and leaves applying them to the caller.

pub mod document;
pub mod manager;

pub use document::{BackupDocument, BackupExpense, BACKUP_VERSION};
pub use manager::{
    BackupError, BackupInfo, BackupManager, BackupReceipt, DeleteOutcome, RestoredBackup,
    BACKUP_FILE,
};
