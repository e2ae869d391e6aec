//! # Document Totals
//!
//! Folds document lines into subtotal, tax heads, payable total and the
//! signed round-off that reconciles them.
//!
//! ## Rounding Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  per line (exact)        amount = qty × unit_price                      │
//! │                          split  = compute_line_tax(amount, rate)        │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  per document (exact)    Σ amount, Σ cgst, Σ sgst, Σ igst               │
//! │        │                                                                │
//! │        ▼  round to paise (half up)                                      │
//! │  subtotal, cgst, sgst, igst                                             │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  raw_total     = subtotal + cgst + sgst + igst                          │
//! │  rounded_total = round_to_rupee(raw_total)                              │
//! │  round_off     = rounded_total - raw_total          (signed)            │
//! │                                                                         │
//! │  subtotal + cgst + sgst + igst + round_off == rounded_total  (exact)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use gst_core::money::Money;
//! use gst_core::totals::{aggregate, LineInput};
//! use gst_core::types::TaxRate;
//! use rust_decimal::Decimal;
//!
//! let line = LineInput::new(
//!     Decimal::ONE,
//!     Money::new(Decimal::new(33333, 2)),
//!     TaxRate::new(Decimal::from(18)).unwrap(),
//! );
//! let totals = aggregate(&[line], true);
//! assert_eq!(totals.igst.amount(), Decimal::new(6000, 2));
//! assert_eq!(totals.rounded_total.amount(), Decimal::from(393));
//! assert_eq!(totals.round_off.amount(), Decimal::new(-33, 2));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::tax::{compute_line_tax, TaxSplit};
use crate::types::TaxRate;

// =============================================================================
// Inputs
// =============================================================================

/// The three numbers that drive a line's tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    pub quantity: Decimal,
    pub unit_price: Money,
    pub tax_rate: TaxRate,
}

impl LineInput {
    pub fn new(quantity: Decimal, unit_price: Money, tax_rate: TaxRate) -> Self {
        LineInput {
            quantity,
            unit_price,
            tax_rate,
        }
    }

    /// `quantity × unit_price`, exact.
    pub fn amount(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// Exact amount and tax for one line, as persisted on the line row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTotals {
    pub line_amount: Money,
    pub tax: TaxSplit,
}

/// Computes one line.
pub fn compute_line(line: &LineInput, cross_jurisdiction: bool) -> LineTotals {
    let line_amount = line.amount();
    LineTotals {
        line_amount,
        tax: compute_line_tax(line_amount, line.tax_rate, cross_jurisdiction),
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Document-level totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Totals {
    /// Σ line amounts, rounded to paise.
    #[ts(type = "string")]
    pub subtotal: Money,
    #[ts(type = "string")]
    pub cgst: Money,
    #[ts(type = "string")]
    pub sgst: Money,
    #[ts(type = "string")]
    pub igst: Money,
    /// Payable amount in whole rupees.
    #[ts(type = "string")]
    pub rounded_total: Money,
    /// `rounded_total - raw_total`; may be negative.
    #[ts(type = "string")]
    pub round_off: Money,
}

impl Totals {
    /// All-zero totals.
    pub fn zero() -> Self {
        Totals::default()
    }

    /// Total before rupee rounding.
    pub fn raw_total(&self) -> Money {
        self.subtotal + self.tax().total()
    }

    /// Tax heads as a split.
    pub fn tax(&self) -> TaxSplit {
        TaxSplit {
            cgst: self.cgst,
            sgst: self.sgst,
            igst: self.igst,
        }
    }

    /// True when the persisted fields reconcile to the payable total.
    pub fn is_balanced(&self) -> bool {
        self.raw_total() + self.round_off == self.rounded_total
    }
}

/// Aggregates lines into document totals.
///
/// An empty slice yields all-zero totals; whether an empty document is
/// acceptable is the caller's decision.
pub fn aggregate(lines: &[LineInput], cross_jurisdiction: bool) -> Totals {
    let (subtotal, tax) = lines
        .iter()
        .map(|line| compute_line(line, cross_jurisdiction))
        .fold((Money::ZERO, TaxSplit::zero()), |(amount, tax), line| {
            (amount + line.line_amount, tax + line.tax)
        });

    let subtotal = subtotal.round_to_paise();
    let cgst = tax.cgst.round_to_paise();
    let sgst = tax.sgst.round_to_paise();
    let igst = tax.igst.round_to_paise();

    let raw_total = subtotal + cgst + sgst + igst;
    let rounded_total = raw_total.round_to_rupee();

    Totals {
        subtotal,
        cgst,
        sgst,
        igst,
        rounded_total,
        round_off: rounded_total - raw_total,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn line(qty: Decimal, price: Decimal, pct: Decimal) -> LineInput {
        LineInput::new(qty, Money::new(price), TaxRate::new(pct).unwrap())
    }

    #[test]
    fn test_intra_state_scenario() {
        let totals = aggregate(&[line(dec!(2), dec!(100), dec!(18))], false);

        assert_eq!(totals.subtotal.amount(), dec!(200));
        assert_eq!(totals.cgst.amount(), dec!(18));
        assert_eq!(totals.sgst.amount(), dec!(18));
        assert!(totals.igst.is_zero());
        assert_eq!(totals.raw_total().amount(), dec!(236));
        assert_eq!(totals.rounded_total.amount(), dec!(236));
        assert!(totals.round_off.is_zero());
    }

    #[test]
    fn test_inter_state_scenario() {
        let totals = aggregate(&[line(dec!(1), dec!(333.33), dec!(18))], true);

        assert_eq!(totals.subtotal.amount(), dec!(333.33));
        assert_eq!(totals.igst.amount(), dec!(60.00));
        assert!(totals.cgst.is_zero());
        assert!(totals.sgst.is_zero());
        assert_eq!(totals.raw_total().amount(), dec!(393.33));
        assert_eq!(totals.rounded_total.amount(), dec!(393));
        assert_eq!(totals.round_off.amount(), dec!(-0.33));
    }

    #[test]
    fn test_round_off_can_be_positive() {
        // 1 × 84.75 at 0% → 84.75 → 85, round_off +0.25
        let totals = aggregate(&[line(dec!(1), dec!(84.75), dec!(0))], false);
        assert_eq!(totals.rounded_total.amount(), dec!(85));
        assert_eq!(totals.round_off.amount(), dec!(0.25));
    }

    #[test]
    fn test_empty_lines_are_all_zero() {
        let totals = aggregate(&[], false);
        assert_eq!(totals, Totals::zero());
        assert!(totals.is_balanced());
    }

    #[test]
    fn test_buckets_sum_exact_lines_before_rounding() {
        // Each line carries 0.0025 of tax, which would round to 0.00 alone.
        let lines = vec![
            line(dec!(1), dec!(0.05), dec!(5)),
            line(dec!(1), dec!(0.05), dec!(5)),
            line(dec!(1), dec!(0.05), dec!(5)),
        ];
        let totals = aggregate(&lines, true);
        // Σ igst = 3 × 0.0025 = 0.0075 → 0.01
        assert_eq!(totals.igst.amount(), dec!(0.01));
    }

    fn arb_line() -> impl Strategy<Value = LineInput> {
        (1i64..10_000i64, 0i64..10_000_000i64, 0i64..=2_800i64).prop_map(|(qty, paise, bps)| {
            LineInput::new(
                Decimal::new(qty, 2),
                Money::new(Decimal::new(paise, 2)),
                TaxRate::new(Decimal::new(bps, 2)).unwrap(),
            )
        })
    }

    proptest! {
        /// The persisted fields always reconcile to the payable total.
        #[test]
        fn prop_totals_reconcile(
            lines in prop::collection::vec(arb_line(), 0..20),
            cross in any::<bool>(),
        ) {
            let totals = aggregate(&lines, cross);

            prop_assert_eq!(
                totals.subtotal + totals.cgst + totals.sgst + totals.igst + totals.round_off,
                totals.rounded_total
            );
            prop_assert_eq!(totals.rounded_total.amount().fract(), Decimal::ZERO);
            prop_assert!(totals.round_off.amount().abs() <= dec!(0.5));
            if cross {
                prop_assert!(totals.cgst.is_zero() && totals.sgst.is_zero());
            } else {
                prop_assert!(totals.igst.is_zero());
                prop_assert_eq!(totals.cgst, totals.sgst);
            }
        }
    }
}
