//! Common error types for DigiPath

use thiserror::Error;

/// Common result type for DigiPath operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across DigiPath crates
///
/// The first four variants form the domain taxonomy surfaced to API
/// callers. The remaining variants are infrastructure failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid field, or a rule gate that the input fails
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Operation conflicts with current state (tag in use, duplicate recording, ...)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing, invalid or expired credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Machine-readable error code returned to API callers
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Conflict(_) => "CONFLICT",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Unauthorized(_) => "AUTH_ERROR",
            Error::Database(_) | Error::Io(_) | Error::Config(_) | Error::Internal(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// True for errors caused by the caller rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::Conflict(_) | Error::NotFound(_) | Error::Unauthorized(_)
        )
    }
}
