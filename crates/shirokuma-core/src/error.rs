//! Typed service errors.
//!
//! Every public operation returns [`Result`]. The error kinds map 1:1 onto
//! the wire-level error payloads of the MCP layer.

/// Service error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Schema/enum/regex violation, out-of-range numbers, malformed dates
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Item, status, or related endpoint does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    /// Unique-constraint race or write against a deleted row
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Database busy; retried internally, surfaces only when retries are exhausted
    #[error("Transient database error: {0}")]
    Transient(String),
    /// Unexpected failure (corrupt row, migration failure, poisoned lock)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Service result type
pub type Result<T> = std::result::Result<T, ServiceError>;

impl ServiceError {
    /// Stable kind name used in wire payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::InvalidInput(_) => "InvalidInput",
            ServiceError::NotFound(_) => "NotFound",
            ServiceError::Conflict(_) => "Conflict",
            ServiceError::Transient(_) => "Transient",
            ServiceError::Internal(_) => "Internal",
        }
    }

    /// True for the busy/locked class of errors that the transaction
    /// helper retries with backoff.
    pub(crate) fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Transient(_))
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;
        match &err {
            rusqlite::Error::SqliteFailure(f, _) => match f.code {
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                    ServiceError::Transient(err.to_string())
                }
                ErrorCode::ConstraintViolation => ServiceError::Conflict(err.to_string()),
                _ => ServiceError::Internal(err.to_string()),
            },
            rusqlite::Error::QueryReturnedNoRows => {
                ServiceError::NotFound("row not found".to_string())
            }
            _ => ServiceError::Internal(err.to_string()),
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Internal(format!("IO error: {err}"))
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Internal(format!("JSON error: {err}"))
    }
}
