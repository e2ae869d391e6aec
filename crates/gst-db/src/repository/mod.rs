//! # Repository Module
//!
//! Database repository implementations for GST Ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Pool Methods vs Transaction Methods                  │
//! │                                                                         │
//! │  Read paths (pool)                 Save paths (one transaction)        │
//! │  ─────────────────                 ─────────────────────────────        │
//! │  db.invoices().get_by_id(id)       let mut tx = db.begin().await?;     │
//! │  db.ledger().creditable_lines(id)  companies.tx_claim(&mut tx, id)     │
//! │  db.sequences().preview(key, fmt)  ledger.tx_validate_allocation(..)   │
//! │                                    sequences.tx_commit(&mut tx, ..)    │
//! │                                    credit_notes.tx_insert(&mut tx, ..) │
//! │                                    tx.commit().await?                  │
//! │                                                                         │
//! │  `tx_*` methods take `&mut SqliteConnection` so they compose inside    │
//! │  whatever transaction the caller opened.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Decimal Columns
//! Amounts, quantities and rates live in TEXT columns and are parsed back
//! through the helpers below. A value that fails to parse is reported as
//! [`DbError::Decode`] naming the column.
//!
//! ## Available Repositories
//!
//! - [`CompanyRepository`] - Issuers and the per-issuer write claim
//! - [`CustomerRepository`] - Buyers and their places of supply
//! - [`InvoiceRepository`] - Invoice headers and lines
//! - [`CreditNoteRepository`] - Credit note headers and lines
//! - [`SequenceAllocator`] - Gap-tolerant document numbering
//! - [`QuantityLedger`] - Creditable quantity per invoice line

pub mod company;
pub mod credit_note;
pub mod customer;
pub mod invoice;
pub mod ledger;
pub mod sequence;

pub use company::CompanyRepository;
pub use credit_note::CreditNoteRepository;
pub use customer::CustomerRepository;
pub use invoice::InvoiceRepository;
pub use ledger::QuantityLedger;
pub use sequence::SequenceAllocator;

use gst_core::{FinancialYear, Money, TaxRate, TaxSplit, Totals};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Fresh UUID v4 primary key.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn parse_decimal(column: &str, value: &str) -> DbResult<Decimal> {
    Decimal::from_str(value).map_err(|e| DbError::decode(column, e))
}

pub(crate) fn parse_money(column: &str, value: &str) -> DbResult<Money> {
    parse_decimal(column, value).map(Money::new)
}

pub(crate) fn parse_rate(column: &str, value: &str) -> DbResult<TaxRate> {
    let percent = parse_decimal(column, value)?;
    TaxRate::new(percent).map_err(|e| DbError::decode(column, e))
}

pub(crate) fn parse_financial_year(value: &str) -> DbResult<FinancialYear> {
    FinancialYear::parse(value).map_err(|e| DbError::decode("financial_year", e))
}

/// Canonical TEXT form of a quantity or rate.
pub(crate) fn decimal_text(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Per-line tax columns shared by invoice and credit note lines.
pub(crate) fn parse_line_tax(cgst: &str, sgst: &str, igst: &str) -> DbResult<TaxSplit> {
    Ok(TaxSplit {
        cgst: parse_money("cgst", cgst)?,
        sgst: parse_money("sgst", sgst)?,
        igst: parse_money("igst", igst)?,
    })
}

/// Header total columns shared by invoices and credit notes.
pub(crate) struct TotalsColumns<'a> {
    pub subtotal: &'a str,
    pub cgst_total: &'a str,
    pub sgst_total: &'a str,
    pub igst_total: &'a str,
    pub round_off: &'a str,
    pub total: &'a str,
}

impl TotalsColumns<'_> {
    pub(crate) fn parse(&self) -> DbResult<Totals> {
        Ok(Totals {
            subtotal: parse_money("subtotal", self.subtotal)?,
            cgst: parse_money("cgst_total", self.cgst_total)?,
            sgst: parse_money("sgst_total", self.sgst_total)?,
            igst: parse_money("igst_total", self.igst_total)?,
            rounded_total: parse_money("total", self.total)?,
            round_off: parse_money("round_off", self.round_off)?,
        })
    }
}
