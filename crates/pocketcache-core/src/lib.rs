//! pocketcache core library.
//!
//! Two independent pieces live here:
//!
//! - [`fetch`]: cache-first JSON fetching over HTTP, backed by the
//!   namespaced key-value stores in [`cache`]
//! - [`expenses`] and [`backup`]: a SQLite expense store and JSON file
//!   backups of its contents

pub mod api;
pub mod backup;
pub mod cache;
pub mod config;
pub mod expenses;
pub mod fetch;
pub mod models;
pub mod utils;

pub use api::{FetchError, HttpClient};
pub use backup::{BackupError, BackupManager};
pub use cache::{CacheNamespace, FileStore, KeyValueStore, MemoryStore};
pub use config::Config;
pub use expenses::{ExpenseStore, ExpenseTracker, StoreError};
pub use fetch::{CachedFetcher, FetchRequest, FetchState, UseFetch};
pub use models::{Category, Expense, NewExpense};
