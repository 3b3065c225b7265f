//! Local expense persistence.
//!
//! This module provides:
//! - `ExpenseStore`: SQLite-backed CRUD with an explicit init/close lifecycle
//! - `ExpenseTracker`: the store and its backup file driven together

pub mod error;
pub mod store;
pub mod tracker;

pub use error::StoreError;
pub use store::{ExpenseStore, StoreStatus, DATABASE_FILE};
pub use tracker::{category_breakdown, CategoryTotal, ExpenseTracker, TrackerError};
