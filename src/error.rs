// =============================================================================
// ERROR MODULE
// =============================================================================
// Custom error types and their HTTP responses.
//
// ERROR HANDLING PHILOSOPHY:
// - "Not found" on a lookup is an absent value (Option), not an error
// - Writes fail with typed errors that map to specific status codes
// - Database errors are classified so callers can tell a constraint
//   violation (never retried) from an unreachable database (retryable)
// =============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// PostgreSQL SQLSTATE codes we classify explicitly
const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";
const PG_NOT_NULL_VIOLATION: &str = "23502";
const PG_CHECK_VIOLATION: &str = "23514";

// =============================================================================
// CUSTOM ERROR TYPE
// =============================================================================
#[derive(Debug, Error)]
pub enum AppError {
    // -------------------------------------------------------------------------
    // INFRASTRUCTURE ERRORS
    // -------------------------------------------------------------------------
    /// Database query failed for a reason we don't classify further
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Database or downstream service unreachable (transient, retryable)
    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// Operation exceeded its time budget
    #[error("Operation timed out after {0} ms")]
    Timeout(u64),

    // -------------------------------------------------------------------------
    // CLIENT ERRORS
    // -------------------------------------------------------------------------
    /// Resource not found (used by writes that require an existing row)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Identifier could not be parsed into a storage key
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// A write violated a uniqueness, required-field or reference constraint
    #[error("Validation failed: {0}")]
    ValidationFailure(String),

    /// Property bag does not conform to the component version schema.
    /// Carries every offending key, not just the first.
    #[error("Schema violation on keys: {}", .keys.join(", "))]
    SchemaViolation { keys: Vec<String>, reasons: Vec<String> },

    /// Component has no version a section could reference
    #[error("Component {0} has no available version")]
    NoVersionAvailable(String),

    /// Not enough stock for an outbound movement
    #[error("Insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i32, requested: i32 },

    /// Stale write rejected by the optimistic concurrency check
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing or invalid session
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // -------------------------------------------------------------------------
    // INTERNAL ERRORS
    // -------------------------------------------------------------------------
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether retrying the same operation might succeed.
    ///
    /// Only transient dependency failures qualify; validation, schema and
    /// conflict errors are deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::DependencyUnavailable(_))
    }

    /// HTTP status code and machine-readable error code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::InvalidIdentifier(_) => (StatusCode::BAD_REQUEST, "INVALID_IDENTIFIER"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::ValidationFailure(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_FAILURE")
            }
            AppError::SchemaViolation { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "SCHEMA_VIOLATION")
            }
            AppError::NoVersionAvailable(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "NO_VERSION_AVAILABLE")
            }
            AppError::InsufficientStock { .. } => (StatusCode::CONFLICT, "INSUFFICIENT_STOCK"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::DependencyUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "DEPENDENCY_UNAVAILABLE")
            }
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

// =============================================================================
// DATABASE ERROR CLASSIFICATION
// =============================================================================
// Constraint violations come back from PostgreSQL as sqlx::Error::Database
// with a SQLSTATE code. Pool exhaustion and socket failures mean the database
// is unreachable right now.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();
                match code.as_str() {
                    PG_UNIQUE_VIOLATION => AppError::ValidationFailure(format!(
                        "duplicate value violates {}",
                        db_err.constraint().unwrap_or("a unique constraint")
                    )),
                    PG_FOREIGN_KEY_VIOLATION => AppError::ValidationFailure(format!(
                        "referenced or dependent record blocks this write ({})",
                        db_err.constraint().unwrap_or("foreign key")
                    )),
                    PG_NOT_NULL_VIOLATION => {
                        AppError::ValidationFailure("a required field is missing".to_string())
                    }
                    PG_CHECK_VIOLATION => AppError::ValidationFailure(format!(
                        "value violates {}",
                        db_err.constraint().unwrap_or("a check constraint")
                    )),
                    _ => AppError::Database(err),
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::DependencyUnavailable(err.to_string())
            }
            _ => AppError::Database(err),
        }
    }
}

// =============================================================================
// HTTP RESPONSE CONVERSION
// =============================================================================
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        // Don't expose internal details to clients
        let message = match &self {
            AppError::Database(_) => "A database error occurred".to_string(),
            AppError::SchemaViolation { keys, .. } => {
                format!("Properties do not match the component schema: {}", keys.join(", "))
            }
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error_code = error_code, error = %self, "Request failed");
        } else {
            tracing::warn!(error_code = error_code, message = %message, "Request rejected");
        }

        let body = match &self {
            AppError::SchemaViolation { reasons, .. } => {
                ErrorResponse::with_details(error_code, message, reasons.join("; "))
            }
            _ => ErrorResponse::new(error_code, message),
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::InvalidIdentifier("abc".into()).status_and_code().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::SchemaViolation { keys: vec!["title".into()], reasons: vec![] }
                .status_and_code()
                .0,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(AppError::Timeout(5000).status_and_code().0, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            AppError::DependencyUnavailable("db".into()).status_and_code().0,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(AppError::Conflict("stale".into()).status_and_code().0, StatusCode::CONFLICT);
        assert_eq!(
            AppError::Internal("bad status".into()).status_and_code(),
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        );
    }

    #[test]
    fn test_only_dependency_failures_are_retryable() {
        assert!(AppError::DependencyUnavailable("down".into()).is_retryable());
        assert!(!AppError::ValidationFailure("dup".into()).is_retryable());
        assert!(!AppError::SchemaViolation { keys: vec![], reasons: vec![] }.is_retryable());
        assert!(!AppError::Timeout(10).is_retryable());
        assert!(!AppError::Conflict("stale".into()).is_retryable());
    }

    #[test]
    fn test_pool_timeout_is_dependency_unavailable() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, AppError::DependencyUnavailable(_)));

        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn test_schema_violation_lists_every_key() {
        let err = AppError::SchemaViolation {
            keys: vec!["color".into(), "count".into()],
            reasons: vec![],
        };
        assert_eq!(err.to_string(), "Schema violation on keys: color, count");
    }
}
