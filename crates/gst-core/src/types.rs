//! # Domain Types
//!
//! Parties, statuses and rates shared by every GST document.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Company      │   │    Customer     │   │    TaxRate      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  percent        │       │
//! │  │  state          │   │  billing_state  │   │  0 ..= 100      │       │
//! │  │  prefixes       │   │  shipping_state │   │  18 = 18%       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  InvoiceStatus  │   │CreditNoteStatus │   │  DocumentType   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Draft          │   │  Draft          │   │  Invoice        │       │
//! │  │  Pending / Paid │   │  Issued         │   │  CreditNote     │       │
//! │  │  Overdue        │   │  Cancelled      │   └─────────────────┘       │
//! │  │  Cancelled      │   └─────────────────┘                              │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status transitions live in [`crate::lifecycle`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Tax Rate
// =============================================================================

/// GST rate as a percentage (18 = 18%).
///
/// Always within `0..=100`; construct through [`TaxRate::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct TaxRate(Decimal);

impl TaxRate {
    /// Validates and wraps a percentage.
    pub fn new(percent: Decimal) -> Result<Self, ValidationError> {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(ValidationError::OutOfRange {
                field: "tax_rate".to_string(),
                min: Decimal::ZERO,
                max: Decimal::ONE_HUNDRED,
            });
        }
        Ok(TaxRate(percent))
    }

    /// Zero-rated / exempt supply.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(Decimal::ZERO)
    }

    /// Returns the rate as a percentage.
    #[inline]
    pub const fn percent(&self) -> Decimal {
        self.0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

impl TryFrom<Decimal> for TaxRate {
    type Error = ValidationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        TaxRate::new(value)
    }
}

impl From<TaxRate> for Decimal {
    fn from(rate: TaxRate) -> Self {
        rate.0
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

// =============================================================================
// Company (Issuer)
// =============================================================================

/// The issuing business. Owns documents and numbering sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Company {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Legal name printed on documents.
    pub name: String,

    /// Home state for GST (e.g. "Karnataka"). `None` if not captured yet.
    pub state: Option<String>,

    /// GST identification number.
    pub gstin: Option<String>,

    /// Prefix for invoice numbers (e.g. "INV").
    pub invoice_prefix: String,

    /// Prefix for credit note numbers (e.g. "CN").
    pub credit_note_prefix: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Customer
// =============================================================================

/// The buyer on an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Issuer this customer belongs to.
    pub company_id: String,

    /// Display name.
    pub name: String,

    /// State of the billing address.
    pub billing_state: Option<String>,

    /// State of the shipping address (place of supply when present).
    pub shipping_state: Option<String>,

    /// Customer GSTIN for B2B supplies.
    pub gstin: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// The state used as place of supply.
    ///
    /// Shipping state wins; billing state is the fallback. Blank strings
    /// count as unknown.
    pub fn effective_state(&self) -> Option<&str> {
        non_blank(self.shipping_state.as_deref()).or_else(|| non_blank(self.billing_state.as_deref()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

// =============================================================================
// Document Type
// =============================================================================

/// Which numbering sequence a document draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Invoice,
    CreditNote,
}

impl DocumentType {
    /// Storage / wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "invoice",
            DocumentType::CreditNote => "credit_note",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentType::Invoice => write!(f, "invoice"),
            DocumentType::CreditNote => write!(f, "credit note"),
        }
    }
}

// =============================================================================
// Invoice Status
// =============================================================================

/// Payment-facing lifecycle of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Being prepared, not yet sent.
    Draft,
    /// Sent, awaiting payment.
    Pending,
    /// Settled.
    Paid,
    /// Past due date without payment.
    Overdue,
    /// Voided. Terminal.
    Cancelled,
}

impl InvoiceStatus {
    /// Storage / wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Credit Note Status
// =============================================================================

/// Lifecycle of a credit note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CreditNoteStatus {
    /// Saved but not yet issued to the customer.
    Draft,
    /// Issued. Counts against invoice quantities.
    Issued,
    /// Withdrawn. Terminal; frees its quantities.
    Cancelled,
}

impl CreditNoteStatus {
    /// Storage / wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CreditNoteStatus::Draft => "draft",
            CreditNoteStatus::Issued => "issued",
            CreditNoteStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CreditNoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
