use thiserror::Error;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record failed validation before write (missing fields, non-hour-aligned
    /// timestamp, non-positive price).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Duplicate primary key without the backfill-overwrite flag set.
    #[error("duplicate snapshot for ({exchange}, {symbol}, {timestamp})")]
    Duplicate {
        exchange: String,
        symbol: String,
        timestamp: String,
    },

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
