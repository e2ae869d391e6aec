//! # Validation Module
//!
//! Field-level checks on save requests, run before any lookup.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Presentation                                                 │
//! │  └── Immediate feedback on forms                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── quantity > 0, price ≥ 0, 0 ≤ rate ≤ 100                           │
//! │  └── text lengths, ids present                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Controller (inside the save transaction)                     │
//! │  └── issuer, invoice eligibility, available quantity                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  ├── UNIQUE (company, financial year, number)                          │
//! │  └── Foreign key and CHECK constraints                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;

use crate::document::{CreditNoteLineRequest, InvoiceLineRequest};
use crate::error::ValidationError;
use crate::money::Money;
use crate::totals::LineInput;
use crate::types::TaxRate;
use crate::{MAX_DESCRIPTION_LEN, MAX_DOCUMENT_LINES, MAX_LINE_QUANTITY, MAX_REASON_LEN, MAX_UNIT_PRICE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Quantity must be strictly positive and at most [`MAX_LINE_QUANTITY`].
pub fn validate_quantity(field: &str, quantity: Decimal) -> ValidationResult<()> {
    if quantity <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    let max = Decimal::from(MAX_LINE_QUANTITY);
    if quantity > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: Decimal::ZERO,
            max,
        });
    }
    Ok(())
}

/// Unit price may be zero (free items) but never negative, and at most
/// [`MAX_UNIT_PRICE`].
pub fn validate_unit_price(field: &str, price: Decimal) -> ValidationResult<Money> {
    if price < Decimal::ZERO {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    let max = Decimal::from(MAX_UNIT_PRICE);
    if price > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: Decimal::ZERO,
            max,
        });
    }
    Ok(Money::new(price))
}

// =============================================================================
// String Validators
// =============================================================================

/// Non-empty after trimming.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Optional free text with an upper bound.
pub fn validate_max_len(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Credit note reason.
pub fn validate_reason(reason: Option<&str>) -> ValidationResult<()> {
    validate_max_len("reason", reason, MAX_REASON_LEN)
}

// =============================================================================
// Line Validators
// =============================================================================

/// Upper bound on lines per document. Emptiness is checked by the controller.
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count > MAX_DOCUMENT_LINES {
        return Err(ValidationError::TooMany {
            field: "lines".to_string(),
            max: MAX_DOCUMENT_LINES,
        });
    }
    Ok(())
}

/// Validates one invoice line and returns its tax inputs.
///
/// ## Example
/// ```rust
/// use gst_core::document::InvoiceLineRequest;
/// use gst_core::validation::validate_invoice_line;
/// use rust_decimal::Decimal;
///
/// let line = InvoiceLineRequest {
///     product_ref: None,
///     description: "Consulting".to_string(),
///     quantity: Decimal::from(2),
///     unit_price: Decimal::from(100),
///     tax_rate: Decimal::from(18),
/// };
/// assert!(validate_invoice_line(0, &line).is_ok());
/// ```
pub fn validate_invoice_line(index: usize, line: &InvoiceLineRequest) -> ValidationResult<LineInput> {
    validate_required(&format!("lines[{}].description", index), &line.description)?;
    validate_max_len(
        &format!("lines[{}].description", index),
        Some(&line.description),
        MAX_DESCRIPTION_LEN,
    )?;
    validate_quantity(&format!("lines[{}].quantity", index), line.quantity)?;
    let unit_price = validate_unit_price(&format!("lines[{}].unit_price", index), line.unit_price)?;
    let tax_rate = TaxRate::new(line.tax_rate).map_err(|_| ValidationError::OutOfRange {
        field: format!("lines[{}].tax_rate", index),
        min: Decimal::ZERO,
        max: Decimal::ONE_HUNDRED,
    })?;

    Ok(LineInput::new(line.quantity, unit_price, tax_rate))
}

/// Validates one credit-note line request.
pub fn validate_credit_note_line(index: usize, line: &CreditNoteLineRequest) -> ValidationResult<()> {
    validate_required(&format!("lines[{}].invoice_item_id", index), &line.invoice_item_id)?;
    validate_quantity(&format!("lines[{}].quantity", index), line.quantity)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(qty: Decimal, price: Decimal, rate: Decimal) -> InvoiceLineRequest {
        InvoiceLineRequest {
            product_ref: Some("SKU-1".to_string()),
            description: "Steel rod".to_string(),
            quantity: qty,
            unit_price: price,
            tax_rate: rate,
        }
    }

    #[test]
    fn test_valid_line() {
        let input = validate_invoice_line(0, &line(dec!(2), dec!(100), dec!(18))).unwrap();
        assert_eq!(input.amount().amount(), dec!(200));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let err = validate_invoice_line(1, &line(dec!(0), dec!(100), dec!(18))).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MustBePositive {
                field: "lines[1].quantity".to_string()
            }
        );
    }

    #[test]
    fn test_negative_price_rejected_zero_allowed() {
        assert!(validate_invoice_line(0, &line(dec!(1), dec!(-1), dec!(18))).is_err());
        assert!(validate_invoice_line(0, &line(dec!(1), dec!(0), dec!(18))).is_ok());
    }

    #[test]
    fn test_oversized_line_rejected_not_overflowed() {
        let huge = dec!(1000000000000000);
        let err = validate_invoice_line(0, &line(huge, huge, dec!(18))).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { ref field, .. } if field == "lines[0].quantity"));

        let err = validate_invoice_line(0, &line(dec!(1), huge, dec!(18))).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { ref field, .. } if field == "lines[0].unit_price"));

        let over = CreditNoteLineRequest {
            invoice_item_id: "line-1".to_string(),
            quantity: huge,
        };
        assert!(validate_credit_note_line(0, &over).is_err());
    }

    #[test]
    fn test_largest_line_totals_without_overflow() {
        let max = line(
            Decimal::from(MAX_LINE_QUANTITY),
            Decimal::from(MAX_UNIT_PRICE),
            dec!(100),
        );
        let input = validate_invoice_line(0, &max).unwrap();
        let inputs = vec![input; MAX_DOCUMENT_LINES];

        let totals = crate::totals::aggregate(&inputs, false);
        assert_eq!(
            totals.subtotal.amount(),
            Decimal::from(MAX_LINE_QUANTITY) * Decimal::from(MAX_UNIT_PRICE) * Decimal::from(MAX_DOCUMENT_LINES as i64)
        );
        assert_eq!(totals.rounded_total.amount(), totals.subtotal.amount() * dec!(2));
    }

    #[test]
    fn test_rate_out_of_range_names_the_line() {
        let err = validate_invoice_line(2, &line(dec!(1), dec!(1), dec!(101))).unwrap_err();
        assert!(err.to_string().starts_with("lines[2].tax_rate"));
    }

    #[test]
    fn test_blank_description_rejected() {
        let mut l = line(dec!(1), dec!(1), dec!(5));
        l.description = "   ".to_string();
        assert!(validate_invoice_line(0, &l).is_err());
    }

    #[test]
    fn test_credit_note_line() {
        let ok = CreditNoteLineRequest {
            invoice_item_id: "line-1".to_string(),
            quantity: dec!(0.5),
        };
        assert!(validate_credit_note_line(0, &ok).is_ok());

        let negative = CreditNoteLineRequest {
            invoice_item_id: "line-1".to_string(),
            quantity: dec!(-1),
        };
        assert!(validate_credit_note_line(0, &negative).is_err());
    }

    #[test]
    fn test_line_count_limit() {
        assert!(validate_line_count(0).is_ok());
        assert!(validate_line_count(MAX_DOCUMENT_LINES).is_ok());
        assert!(validate_line_count(MAX_DOCUMENT_LINES + 1).is_err());
    }

    #[test]
    fn test_reason_length() {
        assert!(validate_reason(None).is_ok());
        assert!(validate_reason(Some("Returned goods")).is_ok());
        assert!(validate_reason(Some(&"x".repeat(MAX_REASON_LEN + 1))).is_err());
    }
}
