//! # Tax Split
//!
//! Decides whether a supply carries IGST or CGST + SGST, and computes the
//! amounts for one line.
//!
//! ## Place of Supply
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Cross-Jurisdiction Decision                            │
//! │                                                                         │
//! │  issuer.state ──────────────┐                                          │
//! │                             ├──► same state?  ──► CGST + SGST (½ + ½)  │
//! │  customer.shipping_state ───┤                                          │
//! │      (else billing_state)   └──► different?  ──► IGST (whole)          │
//! │                                                                         │
//! │  Either side unknown ──► intra-state (CGST + SGST)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The unknown-state default is a stated policy: a document with no
//! captured place of supply is taxed as intra-state.
//!
//! Amounts returned here are exact. Rounding belongs to
//! [`crate::totals::aggregate`].

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Company, Customer, TaxRate};

// =============================================================================
// Tax Split
// =============================================================================

/// Tax on a line (or a whole document), broken into GST heads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxSplit {
    #[ts(type = "string")]
    pub cgst: Money,
    #[ts(type = "string")]
    pub sgst: Money,
    #[ts(type = "string")]
    pub igst: Money,
}

impl TaxSplit {
    /// All heads zero.
    pub const fn zero() -> Self {
        TaxSplit {
            cgst: Money::ZERO,
            sgst: Money::ZERO,
            igst: Money::ZERO,
        }
    }

    /// Sum of all heads.
    pub fn total(&self) -> Money {
        self.cgst + self.sgst + self.igst
    }
}

impl Add for TaxSplit {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        TaxSplit {
            cgst: self.cgst + other.cgst,
            sgst: self.sgst + other.sgst,
            igst: self.igst + other.igst,
        }
    }
}

impl AddAssign for TaxSplit {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

// =============================================================================
// Calculator
// =============================================================================

/// Computes GST on one line amount.
///
/// - cross-jurisdiction: `igst = amount × rate / 100`
/// - otherwise: `cgst = sgst = (amount × rate / 100) / 2`
///
/// ## Example
/// ```rust
/// use gst_core::money::Money;
/// use gst_core::tax::compute_line_tax;
/// use gst_core::types::TaxRate;
/// use rust_decimal::Decimal;
///
/// let rate = TaxRate::new(Decimal::from(18)).unwrap();
/// let split = compute_line_tax(Money::from_rupees(200), rate, false);
/// assert_eq!(split.cgst, Money::from_rupees(18));
/// assert_eq!(split.sgst, Money::from_rupees(18));
/// assert!(split.igst.is_zero());
/// ```
///
/// Negative amounts are a caller error and must be rejected before this
/// is reached (see [`crate::validation`]).
pub fn compute_line_tax(line_amount: Money, rate: TaxRate, cross_jurisdiction: bool) -> TaxSplit {
    let total_tax = line_amount.percent(rate.percent());

    if cross_jurisdiction {
        TaxSplit {
            cgst: Money::ZERO,
            sgst: Money::ZERO,
            igst: total_tax,
        }
    } else {
        let half = Money::new(total_tax.amount() / rust_decimal::Decimal::TWO);
        TaxSplit {
            cgst: half,
            sgst: half,
            igst: Money::ZERO,
        }
    }
}

/// True when issuer and place of supply are in different states.
///
/// States are compared trimmed and case-insensitively. If either side is
/// unknown the supply is treated as intra-state.
pub fn is_cross_jurisdiction(issuer_state: Option<&str>, customer_state: Option<&str>) -> bool {
    let issuer = issuer_state.map(str::trim).filter(|s| !s.is_empty());
    let customer = customer_state.map(str::trim).filter(|s| !s.is_empty());

    match (issuer, customer) {
        (Some(a), Some(b)) => !a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

/// Cross-jurisdiction flag for an issuer / customer pair.
pub fn supply_is_inter_state(company: &Company, customer: &Customer) -> bool {
    is_cross_jurisdiction(company.state.as_deref(), customer.effective_state())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn rate(pct: Decimal) -> TaxRate {
        TaxRate::new(pct).unwrap()
    }

    #[test]
    fn test_intra_state_halves() {
        let split = compute_line_tax(Money::new(dec!(200)), rate(dec!(18)), false);
        assert_eq!(split.cgst.amount(), dec!(18));
        assert_eq!(split.sgst.amount(), dec!(18));
        assert!(split.igst.is_zero());
        assert_eq!(split.total().amount(), dec!(36));
    }

    #[test]
    fn test_inter_state_is_exact() {
        let split = compute_line_tax(Money::new(dec!(333.33)), rate(dec!(18)), true);
        assert_eq!(split.igst.amount(), dec!(59.9994));
        assert!(split.cgst.is_zero());
        assert!(split.sgst.is_zero());
    }

    #[test]
    fn test_zero_rate() {
        let split = compute_line_tax(Money::new(dec!(999.99)), TaxRate::zero(), false);
        assert_eq!(split, TaxSplit::zero());
    }

    #[test]
    fn test_cross_jurisdiction_policy() {
        assert!(!is_cross_jurisdiction(Some("Karnataka"), Some("Karnataka")));
        assert!(!is_cross_jurisdiction(Some("Karnataka"), Some(" karnataka ")));
        assert!(is_cross_jurisdiction(Some("Karnataka"), Some("Maharashtra")));
        // Unknown on either side defaults to intra-state
        assert!(!is_cross_jurisdiction(None, Some("Maharashtra")));
        assert!(!is_cross_jurisdiction(Some("Karnataka"), None));
        assert!(!is_cross_jurisdiction(Some("Karnataka"), Some("")));
    }

    fn arb_amount() -> impl Strategy<Value = Decimal> {
        (0i64..100_000_000i64).prop_map(|paise| Decimal::new(paise, 2))
    }

    fn arb_rate() -> impl Strategy<Value = Decimal> {
        (0i64..=10_000i64).prop_map(|bps| Decimal::new(bps, 2))
    }

    proptest! {
        /// For any amount and rate the heads match the formula exactly.
        #[test]
        fn prop_split_matches_formula(
            amount in arb_amount(),
            pct in arb_rate(),
            cross in any::<bool>(),
        ) {
            let split = compute_line_tax(Money::new(amount), rate(pct), cross);
            let expected = amount * pct / dec!(100);

            if cross {
                prop_assert_eq!(split.igst.amount(), expected);
                prop_assert!(split.cgst.is_zero());
                prop_assert!(split.sgst.is_zero());
            } else {
                prop_assert_eq!(split.cgst.amount(), expected / dec!(2));
                prop_assert_eq!(split.cgst, split.sgst);
                prop_assert!(split.igst.is_zero());
            }
        }
    }
}
