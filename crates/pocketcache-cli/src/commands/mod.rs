pub mod backup;
pub mod expense;
pub mod fetch;
