//! # Ledger Error Type
//!
//! Unified error type for every `LedgerService` operation.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ValidationError ──► CoreError ──► DbError::Domain ──┐                  │
//! │                          │                           │                  │
//! │                          └───────────────────────────┼──► LedgerError   │
//! │  sqlx::Error ──► DbError (QueryFailed, ...) ─────────┘    code+message  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ledger failures keep their message verbatim, numbers included. Storage
//! failures are logged and reported with a generic message.

use serde::Serialize;

use loom_core::{CoreError, ErrorKind, ValidationError};
use loom_db::DbError;

/// Error returned by ledger operations.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INVALID_STOCK",
///   "message": "Not enough stock. Available: 6, Requested: 7"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for ledger responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product, variant or sale not found
    NotFound,

    /// Stock bound violated
    InvalidStock,

    /// Input validation failed
    ValidationError,

    /// Database operation failed
    DatabaseError,

    /// Internal error
    Internal,
}

impl ErrorCode {
    /// The ledger failure family, for codes that have one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ErrorCode::NotFound => Some(ErrorKind::NotFound),
            ErrorCode::InvalidStock => Some(ErrorKind::InvalidStock),
            ErrorCode::ValidationError => Some(ErrorKind::Validation),
            ErrorCode::DatabaseError | ErrorCode::Internal => None,
        }
    }
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotFound => ErrorCode::NotFound,
            ErrorKind::InvalidStock => ErrorCode::InvalidStock,
            ErrorKind::Validation => ErrorCode::ValidationError,
        }
    }
}

impl LedgerError {
    /// Creates a new ledger error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        LedgerError {
            code,
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        LedgerError::new(ErrorCode::Internal, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NotFound
    }

    pub fn is_invalid_stock(&self) -> bool {
        self.code == ErrorCode::InvalidStock
    }
}

/// Converts ledger rule violations; the message is kept as is.
impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        let code = ErrorCode::from(err.kind());
        match err {
            // "Validation error: " prefix is noise for callers
            CoreError::Validation(e) => LedgerError::from(e),
            other => LedgerError::new(code, other.to_string()),
        }
    }
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::validation(err.to_string())
    }
}

/// Converts database errors to ledger errors.
impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(e) => LedgerError::from(e),
            DbError::NotFound { entity, id } => {
                LedgerError::new(ErrorCode::NotFound, format!("{} not found: {}", entity, id))
            }
            DbError::UniqueViolation { field, value } => LedgerError::validation(format!(
                "{} '{}' already exists",
                field, value
            )),
            DbError::CheckViolation { message } => {
                tracing::error!("Check constraint violated: {}", message);
                LedgerError::new(ErrorCode::InvalidStock, "Stock bounds violated")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                LedgerError::validation("Invalid reference")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                LedgerError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                LedgerError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                LedgerError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                LedgerError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => {
                LedgerError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                LedgerError::internal("Database operation failed")
            }
        }
    }
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for LedgerError {}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_error_keeps_numbers() {
        let err = LedgerError::from(DbError::Domain(CoreError::InsufficientStock {
            available: 6,
            requested: 7,
        }));
        assert_eq!(err.code, ErrorCode::InvalidStock);
        assert_eq!(err.message, "Not enough stock. Available: 6, Requested: 7");
    }

    #[test]
    fn test_validation_drops_prefix() {
        let err = LedgerError::from(CoreError::Validation(ValidationError::Required {
            field: "name".to_string(),
        }));
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(!err.message.starts_with("Validation error"));
    }

    #[test]
    fn test_storage_errors_are_generic() {
        let err = LedgerError::from(DbError::QueryFailed("near \"SELEC\": syntax error".into()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database operation failed");
        assert_eq!(err.code.kind(), None);
    }

    #[test]
    fn test_serialized_shape() {
        let err = LedgerError::from(CoreError::variant_not_found("M", "Black"));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Variant Black M not found in this product");
    }
}
