//! # Engine Error Type
//!
//! Unified error returned by every controller operation.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in GST Ledger                             │
//! │                                                                         │
//! │  ValidationError ──► CoreError ──┬─────────────────► Rejected           │
//! │                                  │                   (fix the request)  │
//! │                                  ▼                                      │
//! │  sqlx::Error ──────────────► DbError                                    │
//! │                                  │                                      │
//! │                                  ├── Domain(CoreError) ─► Rejected      │
//! │                                  ├── Conflict / PoolExhausted           │
//! │                                  │                 ──► Conflict         │
//! │                                  │                   (retry the save)   │
//! │                                  └── everything else ─► Persistence     │
//! │                                                      (do not retry)     │
//! │                                                                         │
//! │  Rejected    → logged at debug, never as a fault                       │
//! │  Conflict    → logged at warn                                          │
//! │  Persistence → logged at error                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed save leaves nothing behind: the transaction is dropped, which
//! rolls back lines, header and any number taken inside it.

use gst_core::{CoreError, ValidationError};
use gst_db::DbError;
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;

/// Every failure an engine operation can report.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request breaks a business rule. Caller-correctable.
    #[error(transparent)]
    Rejected(#[from] CoreError),

    /// Lost a race with another writer. Retry the whole operation.
    #[error("Concurrent update, please retry: {0}")]
    Conflict(String),

    /// The store failed. Not retryable by the engine.
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Machine-readable error codes for the presentation layer.
///
/// ## Serialization
/// ```json
/// { "code": "QUANTITY_EXCEEDED", "message": "Quantity exceeded on invoice line …" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Referenced issuer, customer, invoice, line or credit note is missing
    NotFound,

    /// A request field failed validation
    ValidationError,

    /// Credit quantity is more than what is left on the invoice line
    QuantityExceeded,

    /// Business rule violation (cancelled invoice, locked lines, bad transition)
    BusinessLogic,

    /// Concurrent writer won; retry
    Conflict,

    /// Store failure
    DatabaseError,

    /// Bad configuration
    ConfigError,
}

impl EngineError {
    /// Classifies the error for callers.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Rejected(err) => match err {
                CoreError::IssuerNotFound(_)
                | CoreError::CustomerNotFound(_)
                | CoreError::InvoiceNotFound(_)
                | CoreError::CreditNoteNotFound(_)
                | CoreError::InvoiceLineNotFound(_) => ErrorCode::NotFound,
                CoreError::QuantityExceeded { .. } => ErrorCode::QuantityExceeded,
                CoreError::Validation(_)
                | CoreError::EmptyDocument
                | CoreError::MissingFinancialYear
                | CoreError::DocumentAlreadyExists { .. } => ErrorCode::ValidationError,
                _ => ErrorCode::BusinessLogic,
            },
            EngineError::Conflict(_) => ErrorCode::Conflict,
            EngineError::Persistence(_) => ErrorCode::DatabaseError,
            EngineError::Config(_) => ErrorCode::ConfigError,
        }
    }

    /// True when retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Conflict(_))
    }

    /// The business rule that was violated, if any.
    pub fn as_rejection(&self) -> Option<&CoreError> {
        match self {
            EngineError::Rejected(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Rejected(CoreError::Validation(err))
    }
}

/// Converts database errors to engine errors.
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => EngineError::Rejected(core),
            DbError::Conflict(message) => {
                tracing::warn!(error = %message, "Database busy, save not applied");
                EngineError::Conflict(message)
            }
            DbError::PoolExhausted => {
                tracing::warn!("Connection pool exhausted, save not applied");
                EngineError::Conflict("connection pool exhausted".to_string())
            }
            other => {
                tracing::error!(error = %other, "Persistence failure");
                EngineError::Persistence(other.to_string())
            }
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use gst_core::DocumentType;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quantity_exceeded_code() {
        let err = EngineError::from(CoreError::QuantityExceeded {
            invoice_item_id: "line-1".to_string(),
            available: dec!(3),
            requested: dec!(4),
        });

        assert_eq!(err.code(), ErrorCode::QuantityExceeded);
        assert!(!err.is_retryable());
        assert!(err.as_rejection().is_some());
    }

    #[test]
    fn test_db_error_mapping() {
        let busy = EngineError::from(DbError::Conflict("database is locked".to_string()));
        assert!(busy.is_retryable());
        assert_eq!(busy.code(), ErrorCode::Conflict);

        let domain = EngineError::from(DbError::Domain(CoreError::EmptyDocument));
        assert_eq!(domain.code(), ErrorCode::ValidationError);

        let fault = EngineError::from(DbError::QueryFailed("disk I/O error".to_string()));
        assert!(!fault.is_retryable());
        assert_eq!(fault.code(), ErrorCode::DatabaseError);

        // A duplicate key is a store fault, never a lost race
        let duplicate = EngineError::from(DbError::UniqueViolation {
            field: "invoices.id".to_string(),
            value: "unknown".to_string(),
        });
        assert!(!duplicate.is_retryable());
        assert_eq!(duplicate.code(), ErrorCode::DatabaseError);
    }

    #[test]
    fn test_existing_document_is_a_caller_error() {
        let err = EngineError::from(CoreError::DocumentAlreadyExists {
            document: DocumentType::Invoice,
            id: "inv-1".to_string(),
        });
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::QuantityExceeded).unwrap();
        assert_eq!(json, "\"QUANTITY_EXCEEDED\"");
    }
}
