//! # Documents
//!
//! Invoices, credit notes, their lines, and the save requests that produce
//! them.
//!
//! ## Snapshot Pattern
//! A credit-note line copies unit price, tax rate, product reference and
//! description from the invoice line when it is saved. Later price changes
//! never touch a credit note that was already written.
//!
//! ```text
//! InvoiceItem { qty 10, price 100, rate 18 }
//!      ▲
//!      │ invoice_item_id
//!      │
//! CreditNoteItem { qty 3, price 100 (copied), rate 18 (copied) }
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::numbering::FinancialYear;
use crate::tax::TaxSplit;
use crate::totals::{LineInput, Totals};
use crate::types::{CreditNoteStatus, InvoiceStatus, TaxRate};

// =============================================================================
// Invoice
// =============================================================================

/// A saved invoice with its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub company_id: String,
    pub customer_id: String,
    pub financial_year: FinancialYear,
    /// Formatted number, unique per (company, financial year).
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub status: InvoiceStatus,
    /// Whether the supply was taxed as IGST.
    pub is_inter_state: bool,
    pub totals: Totals,
    pub notes: Option<String>,
    pub items: Vec<InvoiceItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    /// Zero-based display order.
    pub position: i64,
    pub product_ref: Option<String>,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Money,
    pub tax_rate: TaxRate,
    /// `quantity × unit_price`, exact.
    pub line_amount: Money,
    /// Exact tax on this line.
    pub tax: TaxSplit,
}

impl InvoiceItem {
    pub fn line_input(&self) -> LineInput {
        LineInput::new(self.quantity, self.unit_price, self.tax_rate)
    }
}

// =============================================================================
// Credit Note
// =============================================================================

/// A saved credit note with its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditNote {
    pub id: String,
    pub company_id: String,
    /// Every credit note references exactly one invoice.
    pub invoice_id: String,
    /// Inherited from the invoice, never edited.
    pub financial_year: FinancialYear,
    /// Assigned once on first save, never changed.
    pub credit_note_number: String,
    pub issue_date: NaiveDate,
    pub reason: Option<String>,
    pub status: CreditNoteStatus,
    pub is_inter_state: bool,
    pub totals: Totals,
    pub items: Vec<CreditNoteItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One credit-note line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditNoteItem {
    pub id: String,
    pub credit_note_id: String,
    /// The invoice line this credits.
    pub invoice_item_id: String,
    pub position: i64,
    pub product_ref: Option<String>,
    pub description: String,
    pub quantity: Decimal,
    /// Copied from the invoice line.
    pub unit_price: Money,
    /// Copied from the invoice line.
    pub tax_rate: TaxRate,
    pub line_amount: Money,
    pub tax: TaxSplit,
}

impl CreditNoteItem {
    pub fn line_input(&self) -> LineInput {
        LineInput::new(self.quantity, self.unit_price, self.tax_rate)
    }
}

// =============================================================================
// Creditable Lines
// =============================================================================

/// An invoice line with its credit position, for line selection screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreditableLine {
    pub invoice_item_id: String,
    pub description: String,
    pub product_ref: Option<String>,
    #[ts(type = "string")]
    pub invoiced_quantity: Decimal,
    #[ts(type = "string")]
    pub credited_quantity: Decimal,
    #[ts(type = "string")]
    pub available_quantity: Decimal,
    #[ts(type = "string")]
    pub unit_price: Money,
    #[ts(type = "string")]
    pub tax_rate: TaxRate,
}

// =============================================================================
// Save Requests
// =============================================================================

/// Presentation-layer input for creating or editing an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveInvoiceRequest {
    /// Required when editing; ignored when creating.
    pub invoice_id: Option<String>,
    pub company_id: String,
    pub customer_id: String,
    /// Derived from `issue_date` when absent.
    pub financial_year: Option<String>,
    pub issue_date: NaiveDate,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub lines: Vec<InvoiceLineRequest>,
}

/// One requested invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLineRequest {
    pub product_ref: Option<String>,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
}

/// Presentation-layer input for creating or editing a credit note.
///
/// Price, rate and financial year are not part of the request: they are
/// taken from the referenced invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveCreditNoteRequest {
    /// Required when editing; ignored when creating.
    pub credit_note_id: Option<String>,
    pub company_id: String,
    pub invoice_id: String,
    pub issue_date: NaiveDate,
    pub reason: Option<String>,
    pub status: CreditNoteStatus,
    pub lines: Vec<CreditNoteLineRequest>,
}

/// One requested credit-note line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditNoteLineRequest {
    pub invoice_item_id: String,
    pub quantity: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_credit_note_request_from_json() {
        let json = r#"{
            "credit_note_id": null,
            "company_id": "co-1",
            "invoice_id": "inv-1",
            "issue_date": "2024-07-15",
            "reason": "Damaged in transit",
            "status": "issued",
            "lines": [{ "invoice_item_id": "line-1", "quantity": "3" }]
        }"#;

        let req: SaveCreditNoteRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.status, CreditNoteStatus::Issued);
        assert_eq!(req.lines[0].quantity, dec!(3));
        assert_eq!(req.issue_date, NaiveDate::from_ymd_opt(2024, 7, 15).unwrap());
    }
}
