//! # Error Types
//!
//! Domain-specific error types for gst-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  gst-core errors (this file)                                           │
//! │  ├── CoreError        - Caller-correctable rule violations             │
//! │  └── ValidationError  - Input field failures                           │
//! │                                                                         │
//! │  gst-db errors (separate crate)                                        │
//! │  └── DbError          - Database failures (wraps CoreError)            │
//! │                                                                         │
//! │  gst-engine errors                                                     │
//! │  └── EngineError      - Rejected / Conflict / Persistence              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → EngineError → caller    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant here is something the caller can fix by changing the
//! request. None of them are logged as system faults.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{DocumentType, InvoiceStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised while validating or saving a document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// The issuing company profile does not exist.
    #[error("Issuer not found: {0}")]
    IssuerNotFound(String),

    /// Customer does not exist or belongs to another issuer.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Invoice does not exist or belongs to another issuer.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Credit note does not exist or belongs to another issuer.
    #[error("Credit note not found: {0}")]
    CreditNoteNotFound(String),

    /// Invoice line referenced by a credit note line does not exist.
    #[error("Invoice line not found: {0}")]
    InvoiceLineNotFound(String),

    /// The referenced invoice cannot receive new credit notes.
    ///
    /// ## When This Occurs
    /// - Invoice is cancelled
    #[error("Invoice {invoice_id} is {status} and cannot be credited")]
    InvoiceNotCreditable {
        invoice_id: String,
        status: InvoiceStatus,
    },

    /// A document must carry at least one line.
    #[error("Document must have at least one line item")]
    EmptyDocument,

    /// No financial year could be resolved for the document.
    #[error("Financial year is required")]
    MissingFinancialYear,

    /// Requested credit quantity is more than what is left on the invoice line.
    ///
    /// ## User Workflow
    /// ```text
    /// Invoice line qty=10, issued credit notes hold 7
    ///      │
    ///      ▼
    /// New credit note requests 4
    ///      │
    ///      ▼
    /// QuantityExceeded { available: 3, requested: 4 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 left to credit on this line"
    /// ```
    #[error("Quantity exceeded on invoice line {invoice_item_id}: available {available}, requested {requested}")]
    QuantityExceeded {
        invoice_item_id: String,
        available: Decimal,
        requested: Decimal,
    },

    /// A credit note line points at a line of a different invoice.
    #[error("Invoice line {invoice_item_id} does not belong to invoice {invoice_id}")]
    LineNotOnInvoice {
        invoice_item_id: String,
        invoice_id: String,
    },

    /// The requested status change is not an edge of the lifecycle.
    #[error("Cannot move {document} from {from} to {to}")]
    InvalidStatusTransition {
        document: DocumentType,
        from: String,
        to: String,
    },

    /// Invoice lines are referenced by credit notes and cannot be rewritten.
    #[error("Invoice {invoice_id} has credited lines and cannot be edited")]
    InvoiceLinesLocked { invoice_id: String },

    /// A saved credit note cannot be moved to a different invoice.
    #[error("Credit note {credit_note_id} cannot be re-pointed to another invoice")]
    InvoiceReferenceImmutable { credit_note_id: String },

    /// A new document was submitted with the id of one already saved.
    ///
    /// ## When This Occurs
    /// - The caller re-sends a create instead of an edit
    #[error("{document} {id} already exists")]
    DocumentAlreadyExists { document: DocumentType, id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when request fields don't meet requirements.
/// Used for early validation before any lookup runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Collection has more entries than allowed.
    #[error("{field} cannot have more than {max} entries")]
    TooMany { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: String,
        min: Decimal,
        max: Decimal,
    },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., financial year, decimal string).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quantity_exceeded_message() {
        let err = CoreError::QuantityExceeded {
            invoice_item_id: "line-1".to_string(),
            available: dec!(3),
            requested: dec!(4),
        };
        assert_eq!(
            err.to_string(),
            "Quantity exceeded on invoice line line-1: available 3, requested 4"
        );
    }

    #[test]
    fn test_not_creditable_message_uses_status_name() {
        let err = CoreError::InvoiceNotCreditable {
            invoice_id: "inv-1".to_string(),
            status: InvoiceStatus::Cancelled,
        };
        assert_eq!(
            err.to_string(),
            "Invoice inv-1 is cancelled and cannot be credited"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "description".to_string(),
        };
        assert_eq!(err.to_string(), "description is required");

        let err = ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: dec!(0),
            max: dec!(100),
        };
        assert_eq!(err.to_string(), "tax_rate must be between 0 and 100");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
