use thiserror::Error;

/// SQLSTATE raised when a serializable transaction loses a race.
const SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE raised when the server breaks a lock cycle.
const DEADLOCK_DETECTED: &str = "40P01";
/// SQLSTATE raised when arithmetic leaves a column's range.
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A concurrent transaction changed a row this one depends on.
    ///
    /// Safe to retry with a fresh transaction.
    #[error("Concurrency conflict on {entity}: {detail}")]
    ConcurrencyConflict { entity: &'static str, detail: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value is outside the range the domain allows.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// A write would push a quantity or amount past what the store can hold.
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// The backing store could not complete the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn conflict(entity: &'static str, detail: impl Into<String>) -> Self {
        StoreError::ConcurrencyConflict {
            entity,
            detail: detail.into(),
        }
    }

    /// Returns true if retrying in a new transaction may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrencyConflict { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = error {
            match db_err.code().as_deref() {
                Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED) => {
                    return StoreError::conflict("transaction", db_err.message().to_string());
                }
                Some(NUMERIC_VALUE_OUT_OF_RANGE) => {
                    return StoreError::OutOfRange(db_err.message().to_string());
                }
                _ => {}
            }
        }
        StoreError::Database(error)
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
