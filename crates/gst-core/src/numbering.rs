//! # Document Numbering
//!
//! Financial years, sequence keys and the formatting seam used by the
//! sequence allocator.
//!
//! ## Sequence Scope
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SequenceKey = (company, financial year, document type)                │
//! │                                                                         │
//! │  (acme, 2024-25, invoice)      ──► 1, 2, 3, ...  INV/2024-25/0003      │
//! │  (acme, 2024-25, credit_note)  ──► 1, 2, ...     CN/2024-25/0002       │
//! │  (acme, 2025-26, invoice)      ──► 1, ...        INV/2025-26/0001      │
//! │                                                                         │
//! │  The allocator owns the integer. NumberFormat owns the string.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::types::{Company, DocumentType};

// =============================================================================
// Financial Year
// =============================================================================

/// An Indian financial year (April to March), written `2024-25`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FinancialYear(String);

impl FinancialYear {
    /// Parses and validates `YYYY-YY`, where `YY` is the following year.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let value = value.trim();
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "financial_year".to_string(),
            reason: reason.to_string(),
        };

        let (start, end) = value
            .split_once('-')
            .ok_or_else(|| invalid("expected YYYY-YY"))?;

        if start.len() != 4 || end.len() != 2 {
            return Err(invalid("expected YYYY-YY"));
        }

        let start: i32 = start.parse().map_err(|_| invalid("year is not a number"))?;
        let end: i32 = end.parse().map_err(|_| invalid("year is not a number"))?;

        if (start + 1) % 100 != end {
            return Err(invalid("second year must follow the first"));
        }

        Ok(FinancialYear(value.to_string()))
    }

    /// The financial year a date falls in.
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use gst_core::numbering::FinancialYear;
    ///
    /// let d = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
    /// assert_eq!(FinancialYear::from_date(d).as_str(), "2024-25");
    /// let d = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
    /// assert_eq!(FinancialYear::from_date(d).as_str(), "2025-26");
    /// ```
    pub fn from_date(date: NaiveDate) -> Self {
        let start = if date.month() >= 4 {
            date.year()
        } else {
            date.year() - 1
        };
        FinancialYear(format!("{}-{:02}", start, (start + 1) % 100))
    }

    /// First calendar year of the span.
    pub fn start_year(&self) -> i32 {
        self.0[..4].parse().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FinancialYear {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FinancialYear::parse(s)
    }
}

impl TryFrom<String> for FinancialYear {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FinancialYear::parse(&value)
    }
}

impl From<FinancialYear> for String {
    fn from(fy: FinancialYear) -> Self {
        fy.0
    }
}

// =============================================================================
// Sequence Key & Allocated Number
// =============================================================================

/// Scope of one numbering counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SequenceKey {
    pub company_id: String,
    pub financial_year: FinancialYear,
    pub document_type: DocumentType,
}

impl SequenceKey {
    pub fn new(
        company_id: impl Into<String>,
        financial_year: FinancialYear,
        document_type: DocumentType,
    ) -> Self {
        SequenceKey {
            company_id: company_id.into(),
            financial_year,
            document_type,
        }
    }
}

/// A sequence value together with its formatted document number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentNumber {
    pub sequence: i64,
    pub formatted: String,
}

impl fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted)
    }
}

// =============================================================================
// Number Format
// =============================================================================

/// Turns a sequence value into the printed document number.
///
/// The allocator calls this for both preview and commit, so the two always
/// agree on the string for the same integer.
pub trait NumberFormat: Send + Sync {
    fn format(&self, key: &SequenceKey, sequence: i64) -> String;
}

/// `{prefix}{sep}{financial_year}{sep}{sequence:0width}`.
///
/// ```rust
/// use gst_core::numbering::{FinancialYear, NumberFormat, PrefixedNumberFormat, SequenceKey};
/// use gst_core::types::DocumentType;
///
/// let format = PrefixedNumberFormat::new("INV", "CN");
/// let key = SequenceKey::new(
///     "co-1",
///     FinancialYear::parse("2024-25").unwrap(),
///     DocumentType::Invoice,
/// );
/// assert_eq!(format.format(&key, 7), "INV/2024-25/0007");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixedNumberFormat {
    pub invoice_prefix: String,
    pub credit_note_prefix: String,
    pub separator: String,
    pub width: usize,
}

impl PrefixedNumberFormat {
    /// Default separator `/` and width 4.
    pub fn new(invoice_prefix: impl Into<String>, credit_note_prefix: impl Into<String>) -> Self {
        PrefixedNumberFormat {
            invoice_prefix: invoice_prefix.into(),
            credit_note_prefix: credit_note_prefix.into(),
            separator: "/".to_string(),
            width: 4,
        }
    }

    /// Uses the issuer's configured prefixes.
    pub fn for_company(company: &Company) -> Self {
        PrefixedNumberFormat::new(&company.invoice_prefix, &company.credit_note_prefix)
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    fn prefix(&self, document_type: DocumentType) -> &str {
        match document_type {
            DocumentType::Invoice => &self.invoice_prefix,
            DocumentType::CreditNote => &self.credit_note_prefix,
        }
    }
}

impl NumberFormat for PrefixedNumberFormat {
    fn format(&self, key: &SequenceKey, sequence: i64) -> String {
        let mut parts = Vec::with_capacity(3);
        let prefix = self.prefix(key.document_type);
        if !prefix.is_empty() {
            parts.push(prefix.to_string());
        }
        parts.push(key.financial_year.to_string());
        parts.push(format!("{:0width$}", sequence, width = self.width));
        parts.join(&self.separator)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
