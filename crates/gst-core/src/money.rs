//! # Money Module
//!
//! Provides the `Money` type for handling rupee amounts exactly.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    333.33 × 18 / 100 = 59.999399999999994  ❌ WRONG!                    │
//! │                                                                         │
//! │  GST amounts are fractional paise until the very end:                   │
//! │    CGST on ₹100.01 at 5% = ₹2.50025 / 2 = ₹1.250125                     │
//! │                                                                         │
//! │  OUR SOLUTION: Exact base-10 Decimal                                    │
//! │    Line math stays exact, rounding happens exactly twice:               │
//! │    buckets → paise, grand total → rupee                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use gst_core::money::Money;
//! use rust_decimal::Decimal;
//!
//! let price = Money::new(Decimal::new(33333, 2)); // ₹333.33
//! let line = price * Decimal::from(2);            // ₹666.66
//! assert_eq!(line.round_to_rupee().amount(), Decimal::from(667));
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::error::ValidationError;

/// Paise precision for tax buckets and subtotals.
pub const PAISE_SCALE: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// An exact rupee amount.
///
/// ## Design Decisions
/// - **Decimal (signed)**: round-off corrections are negative as often as not
/// - **No implicit rounding**: arithmetic is exact, callers round explicitly
/// - **Serialized as a string**: `"393.33"`, never a JSON float
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  InvoiceItem.unit_price × quantity ──► line_amount ──► TaxSplit         │
/// │                                                          │              │
/// │  Σ line_amount ──► subtotal ─┐                           ▼              │
/// │                              ├──► raw total ──► rounded total           │
/// │  Σ TaxSplit ──► buckets ─────┘          └──► round_off                  │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero rupees.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Wraps an exact decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Whole rupees, mostly for tests and fixtures.
    #[inline]
    pub fn from_rupees(rupees: i64) -> Self {
        Money(Decimal::from(rupees))
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money::ZERO
    }

    /// Returns the underlying decimal.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Rounds to paise (two decimals), half away from zero.
    ///
    /// ```rust
    /// use gst_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let igst = Money::new(Decimal::new(599994, 4)); // 59.9994
    /// assert_eq!(igst.round_to_paise().amount(), Decimal::new(6000, 2));
    /// ```
    pub fn round_to_paise(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(PAISE_SCALE, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Rounds to the nearest whole rupee, half away from zero.
    ///
    /// This is the payable-total convention: `₹393.50 → ₹394`, `₹393.49 → ₹393`.
    pub fn round_to_rupee(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Percentage of this amount, exact: `amount × percent / 100`.
    pub fn percent(&self, percent: Decimal) -> Money {
        Money(self.0 * percent / Decimal::ONE_HUNDRED)
    }

    /// Canonical string used for storage (trailing zeros stripped).
    pub fn to_storage_string(&self) -> String {
        self.0.normalize().to_string()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display always shows paise: `₹393.00`, `-₹0.33`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        write!(f, "{}₹{:.2}", sign, self.0.abs())
    }
}

impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .map(Money)
            .map_err(|e| ValidationError::InvalidFormat {
                field: "amount".to_string(),
                reason: e.to_string(),
            })
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by a decimal quantity (unit price × qty).
impl Mul<Decimal> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: Decimal) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_display() {
        assert_eq!(Money::new(dec!(393)).to_string(), "₹393.00");
        assert_eq!(Money::new(dec!(10.5)).to_string(), "₹10.50");
        assert_eq!(Money::new(dec!(-0.33)).to_string(), "-₹0.33");
        assert_eq!(Money::zero().to_string(), "₹0.00");
    }

    #[test]
    fn test_round_to_paise_half_up() {
        assert_eq!(Money::new(dec!(1.005)).round_to_paise().amount(), dec!(1.01));
        assert_eq!(Money::new(dec!(1.0049)).round_to_paise().amount(), dec!(1.00));
        assert_eq!(Money::new(dec!(59.9994)).round_to_paise().amount(), dec!(60.00));
    }

    #[test]
    fn test_round_to_rupee_half_up() {
        assert_eq!(Money::new(dec!(393.33)).round_to_rupee().amount(), dec!(393));
        assert_eq!(Money::new(dec!(393.50)).round_to_rupee().amount(), dec!(394));
        assert_eq!(Money::new(dec!(393.49)).round_to_rupee().amount(), dec!(393));
    }

    #[test]
    fn test_percent_is_exact() {
        let amount = Money::new(dec!(333.33));
        assert_eq!(amount.percent(dec!(18)).amount(), dec!(59.9994));
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::new(dec!(10.25));
        let b = Money::new(dec!(0.75));
        assert_eq!((a + b).amount(), dec!(11.00));
        assert_eq!((a - b).amount(), dec!(9.50));
        assert_eq!((a * dec!(3)).amount(), dec!(30.75));

        let total: Money = vec![a, b, a].into_iter().sum();
        assert_eq!(total.amount(), dec!(21.25));
    }

    #[test]
    fn test_storage_round_trip_strips_trailing_zeros() {
        let m = Money::new(dec!(60.00));
        assert_eq!(m.to_storage_string(), "60");
        let parsed: Money = "60".parse().unwrap();
        assert_eq!(parsed, m);
        assert!("sixty".parse::<Money>().is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let m = Money::new(dec!(393.33));
        assert_eq!(serde_json::to_string(&m).unwrap(), "\"393.33\"");
    }
}
