//! Error types for Suimail.

use thiserror::Error;

/// Common error type for Suimail.
#[derive(Error, Debug)]
pub enum SuimailError {
    /// Database error.
    ///
    /// Wraps any sqlx failure other than a uniqueness violation.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for client input (bad shape, attachment limits, malformed address).
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found, or not visible to the requesting account.
    #[error("{0} not found")]
    NotFound(String),

    /// The external blob store failed or could not be reached.
    #[error("storage error: {0}")]
    Storage(String),

    /// A uniqueness conflict, or the address allocator ran out of attempts.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SuimailError {
    /// Whether the error was caused by the client rather than by the server or a dependency.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SuimailError::Validation(_) | SuimailError::NotFound(_) | SuimailError::Auth(_)
        )
    }
}

// Unique violations become conflicts so callers can retry on them.
impl From<sqlx::Error> for SuimailError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return SuimailError::Conflict(db_err.message().to_string());
            }
        }
        SuimailError::Database(e.to_string())
    }
}

/// Result type alias for Suimail operations.
pub type Result<T> = std::result::Result<T, SuimailError>;
