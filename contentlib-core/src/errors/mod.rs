//! Error types for library authoring
//!
//! Every gateway operation returns [`LibraryResult`]. The variants mirror the
//! error taxonomy shared by the typed API and the REST surface, so transports
//! only need [`LibraryError::http_status_code`] and [`LibraryError::error_code`]
//! to render a failure.
//!
//! # Examples
//!
//! ```rust
//! use contentlib::errors::LibraryError;
//!
//! let err = LibraryError::not_found("component", "lb:Axim:Demo:problem:q1");
//! assert!(err.is_not_found());
//! assert_eq!(err.http_status_code(), 404);
//! assert_eq!(err.error_code(), "NOT_FOUND");
//! ```

use sea_orm::DbErr;
use thiserror::Error;

use crate::common::db_errors::{describe, DbFailure};
use crate::keys::KeyError;

/// Library authoring errors
#[derive(Error, Debug)]
pub enum LibraryError {
    /// Malformed opaque key
    #[error(transparent)]
    InvalidKey(#[from] KeyError),

    /// Entity does not exist, or is hidden from a caller without read access
    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    /// Caller is authenticated but not authorized for the action
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Uniqueness conflict
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Reference that crosses a library boundary
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// Wrong child type in container composition, or block type not allowed by the library
    #[error("Incompatible types: {0}")]
    IncompatibleTypes(String),

    /// Asset path normalization rejected the input
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Size or count limit exceeded
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Lost update or stale version
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Request is well formed but violates a business rule
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LibraryError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        LibraryError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Classify a database failure raised while running `operation`.
    /// Unique constraint violations become [`LibraryError::AlreadyExists`].
    pub fn from_db(operation: &str, err: DbErr) -> Self {
        match DbFailure::classify(&err) {
            DbFailure::UniqueViolation => {
                LibraryError::AlreadyExists(describe(operation, DbFailure::UniqueViolation, &err))
            }
            _ => LibraryError::Database(err),
        }
    }

    /// Check if this is a client error (400-series)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, LibraryError::Database(_) | LibraryError::Internal(_))
    }

    /// Check if this is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LibraryError::NotFound { .. } | LibraryError::InvalidKey(_)
        )
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            LibraryError::InvalidKey(_) => "INVALID_KEY",
            LibraryError::NotFound { .. } => "NOT_FOUND",
            LibraryError::PermissionDenied(_) => "PERMISSION_DENIED",
            LibraryError::AlreadyExists(_) => "ALREADY_EXISTS",
            LibraryError::InvalidScope(_) => "INVALID_SCOPE",
            LibraryError::IncompatibleTypes(_) => "INCOMPATIBLE_TYPES",
            LibraryError::InvalidPath(_) => "INVALID_PATH",
            LibraryError::QuotaExceeded(_) => "QUOTA_EXCEEDED",
            LibraryError::Conflict(_) => "CONFLICT",
            LibraryError::Validation(_) => "VALIDATION_FAILED",
            LibraryError::Database(_) => "DATABASE_ERROR",
            LibraryError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Map to an HTTP status. Key parse failures are reported as 404.
    pub fn http_status_code(&self) -> u16 {
        match self {
            LibraryError::InvalidKey(_) | LibraryError::NotFound { .. } => 404,
            LibraryError::PermissionDenied(_) => 403,
            LibraryError::AlreadyExists(_) | LibraryError::Conflict(_) => 409,
            LibraryError::QuotaExceeded(_) => 413,
            LibraryError::InvalidScope(_)
            | LibraryError::IncompatibleTypes(_)
            | LibraryError::InvalidPath(_)
            | LibraryError::Validation(_) => 400,
            LibraryError::Database(_) | LibraryError::Internal(_) => 500,
        }
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(err: serde_json::Error) -> Self {
        LibraryError::Internal(format!("JSON error: {}", err))
    }
}

/// Result type alias for library operations
pub type LibraryResult<T> = Result<T, LibraryError>;
