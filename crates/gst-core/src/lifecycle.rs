//! # Document Lifecycles
//!
//! Status state machines for invoices and credit notes.
//!
//! ## Credit Note
//! ```text
//!            issue
//!   Draft ─────────► Issued
//!     │                │
//!     │ cancel         │ cancel
//!     ▼                ▼
//!   ┌──────────────────────┐
//!   │      Cancelled       │  terminal, frees credited quantity
//!   └──────────────────────┘
//! ```
//!
//! ## Invoice
//! ```text
//!   Draft ◄──► Pending ◄──► Paid ◄──► Overdue     (any order)
//!     │          │           │          │
//!     └──────────┴─────┬─────┴──────────┘
//!                      ▼
//!                  Cancelled                      terminal, not creditable
//! ```
//!
//! Invoice status is not derived from its credit notes.

use crate::error::{CoreError, CoreResult};
use crate::types::{CreditNoteStatus, DocumentType, InvoiceStatus};

// =============================================================================
// Credit Note Status
// =============================================================================

impl CreditNoteStatus {
    /// True if `next` is a lifecycle edge from `self`.
    pub fn can_transition_to(self, next: CreditNoteStatus) -> bool {
        use CreditNoteStatus::*;
        matches!(
            (self, next),
            (Draft, Issued) | (Draft, Cancelled) | (Issued, Cancelled)
        )
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(self) -> bool {
        self == CreditNoteStatus::Cancelled
    }

    /// Whether lines of a credit note in this status reduce availability.
    pub fn holds_quantity(self) -> bool {
        self != CreditNoteStatus::Cancelled
    }

    /// Statuses a brand-new credit note may be saved in.
    pub fn is_initial(self) -> bool {
        matches!(self, CreditNoteStatus::Draft | CreditNoteStatus::Issued)
    }
}

/// Fails unless `from → to` is an edge. Staying put is allowed for
/// non-terminal statuses, so an edit that keeps the status passes.
pub fn ensure_credit_note_transition(from: CreditNoteStatus, to: CreditNoteStatus) -> CoreResult<()> {
    if (from == to && !from.is_terminal()) || from.can_transition_to(to) {
        return Ok(());
    }
    Err(CoreError::InvalidStatusTransition {
        document: DocumentType::CreditNote,
        from: from.to_string(),
        to: to.to_string(),
    })
}

// =============================================================================
// Invoice Status
// =============================================================================

impl InvoiceStatus {
    /// Any open status may move to any other status. Cancelled is terminal.
    pub fn can_transition_to(self, next: InvoiceStatus) -> bool {
        self != InvoiceStatus::Cancelled && self != next
    }

    pub fn is_terminal(self) -> bool {
        self == InvoiceStatus::Cancelled
    }

    /// Only non-cancelled invoices may receive new credit notes.
    pub fn is_creditable(self) -> bool {
        self != InvoiceStatus::Cancelled
    }
}

/// Same shape as [`ensure_credit_note_transition`] for invoices.
pub fn ensure_invoice_transition(from: InvoiceStatus, to: InvoiceStatus) -> CoreResult<()> {
    if (from == to && !from.is_terminal()) || from.can_transition_to(to) {
        return Ok(());
    }
    Err(CoreError::InvalidStatusTransition {
        document: DocumentType::Invoice,
        from: from.to_string(),
        to: to.to_string(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use CreditNoteStatus as Cn;
    use InvoiceStatus as Inv;

    #[test]
    fn test_credit_note_edges() {
        assert!(Cn::Draft.can_transition_to(Cn::Issued));
        assert!(Cn::Draft.can_transition_to(Cn::Cancelled));
        assert!(Cn::Issued.can_transition_to(Cn::Cancelled));

        assert!(!Cn::Issued.can_transition_to(Cn::Draft));
        assert!(!Cn::Cancelled.can_transition_to(Cn::Draft));
        assert!(!Cn::Cancelled.can_transition_to(Cn::Issued));
    }

    #[test]
    fn test_cancelled_is_terminal_even_for_self() {
        assert!(ensure_credit_note_transition(Cn::Issued, Cn::Issued).is_ok());
        let err = ensure_credit_note_transition(Cn::Cancelled, Cn::Cancelled).unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidStatusTransition {
                document: DocumentType::CreditNote,
                from: "cancelled".to_string(),
                to: "cancelled".to_string(),
            }
        );
    }

    #[test]
    fn test_only_cancelled_frees_quantity() {
        assert!(Cn::Draft.holds_quantity());
        assert!(Cn::Issued.holds_quantity());
        assert!(!Cn::Cancelled.holds_quantity());
        assert!(!Cn::Cancelled.is_initial());
    }

    #[test]
    fn test_invoice_transitions() {
        assert!(ensure_invoice_transition(Inv::Draft, Inv::Pending).is_ok());
        assert!(ensure_invoice_transition(Inv::Paid, Inv::Overdue).is_ok());
        assert!(ensure_invoice_transition(Inv::Overdue, Inv::Cancelled).is_ok());
        assert!(ensure_invoice_transition(Inv::Cancelled, Inv::Paid).is_err());
        assert!(ensure_invoice_transition(Inv::Cancelled, Inv::Cancelled).is_err());
    }

    #[test]
    fn test_cancelled_invoice_not_creditable() {
        assert!(Inv::Paid.is_creditable());
        assert!(Inv::Draft.is_creditable());
        assert!(!Inv::Cancelled.is_creditable());
    }
}
