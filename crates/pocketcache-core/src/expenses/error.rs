use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database not initialized")]
    NotInitialized,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid expense row {id}: {reason}")]
    InvalidRow { id: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True when a write was rejected because the id already exists.
    pub fn is_duplicate(&self) -> bool {
        match self {
            StoreError::Database(sqlx::Error::Database(e)) => e.is_unique_violation(),
            _ => false,
        }
    }
}
