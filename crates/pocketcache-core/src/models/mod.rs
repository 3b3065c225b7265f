//! Data models for expense tracking.
//!
//! - `Expense`: a stored record
//! - `NewExpense`: validated input for a record that has no id yet
//! - `Category`: the fixed set of spending categories

pub mod expense;
pub mod sample;

pub use expense::{Category, Expense, NewExpense, ValidationError};
pub use sample::sample_expenses;
