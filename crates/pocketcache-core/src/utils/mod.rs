//! Utility functions for display formatting.

pub mod format;

pub use format::{format_age, format_kb, round_cents, truncate_string};
