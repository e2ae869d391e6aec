//! # gst-core: Pure Business Logic for GST Documents
//!
//! Tax split, totals, reconciliation arithmetic, numbering format and status
//! machines, as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        GST Ledger Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Presentation Layer                           │   │
//! │  │    Invoice form ──► Credit note form ──► Totals preview         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               gst-engine (DocumentLifecycleController)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ gst-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌──────────────┐ ┌───────────┐ │   │
//! │  │   │   tax     │  │  totals   │  │reconciliation│ │ numbering │ │   │
//! │  │   │ TaxSplit  │  │  Totals   │  │  available   │ │ FY, format│ │   │
//! │  │   └───────────┘  └───────────┘  └──────────────┘ └───────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    gst-db (Database Layer)                      │   │
//! │  │        SQLite, ledger queries, sequence counters                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Exact rupee amounts and the two rounding steps
//! - [`types`] - Company, Customer, statuses, TaxRate
//! - [`document`] - Invoices, credit notes, save requests
//! - [`tax`] - CGST/SGST/IGST split for one line
//! - [`totals`] - Document totals and round-off
//! - [`reconciliation`] - Available-to-credit arithmetic
//! - [`numbering`] - Financial year, sequence keys, number format
//! - [`lifecycle`] - Status transitions
//! - [`validation`] - Request field checks
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Exact Money**: Decimal everywhere, rounding only where totals say so
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod document;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod numbering;
pub mod reconciliation;
pub mod tax;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use document::*;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use numbering::{DocumentNumber, FinancialYear, NumberFormat, PrefixedNumberFormat, SequenceKey};
pub use tax::TaxSplit;
pub use totals::{LineInput, Totals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a line description.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Maximum length of a credit note reason.
pub const MAX_REASON_LEN: usize = 1000;

/// Maximum lines on one document.
///
/// Keeps a single save transaction bounded.
pub const MAX_DOCUMENT_LINES: usize = 500;

/// Largest quantity accepted on one line.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000_000;

/// Largest unit price accepted on one line, in rupees.
///
/// With [`MAX_LINE_QUANTITY`] and [`MAX_DOCUMENT_LINES`] this keeps every
/// line amount, tax and document total far inside `Decimal`'s range.
pub const MAX_UNIT_PRICE: i64 = 1_000_000_000_000;
