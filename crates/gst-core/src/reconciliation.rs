//! # Quantity Reconciliation
//!
//! Arithmetic behind "how much of this invoice line can still be credited".
//! The store-backed ledger in gst-db feeds these functions with fresh rows
//! inside the save transaction.
//!
//! ```text
//! available = invoiced − Σ quantity of credit-note lines
//!                         whose credit note is not cancelled
//! ```
//!
//! There is no running counter: availability is recomputed from rows every
//! time, so cancelling a credit note frees its quantity with no extra step.

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};

/// Remaining creditable quantity.
pub fn available_quantity<I>(invoiced: Decimal, credited: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    invoiced - credited.into_iter().sum::<Decimal>()
}

/// Rejects `requested` when it exceeds `available`.
pub fn check_allocation(invoice_item_id: &str, available: Decimal, requested: Decimal) -> CoreResult<()> {
    if requested > available {
        return Err(CoreError::QuantityExceeded {
            invoice_item_id: invoice_item_id.to_string(),
            available,
            requested,
        });
    }
    Ok(())
}

/// Sums quantities per invoice line, keeping first-seen order.
///
/// Two lines of one credit note against the same invoice line must be
/// validated together, not one at a time.
pub fn merge_requested<'a, I>(lines: I) -> Vec<(String, Decimal)>
where
    I: IntoIterator<Item = (&'a str, Decimal)>,
{
    let mut order: Vec<(String, Decimal)> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();

    for (id, qty) in lines {
        match index.get(id) {
            Some(&i) => order[i].1 += qty,
            None => {
                index.insert(id, order.len());
                order.push((id.to_string(), qty));
            }
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_over_allocation_scenario() {
        let available = available_quantity(dec!(10), [dec!(7)]);
        assert_eq!(available, dec!(3));

        let err = check_allocation("line-1", available, dec!(4)).unwrap_err();
        assert_eq!(
            err,
            CoreError::QuantityExceeded {
                invoice_item_id: "line-1".to_string(),
                available: dec!(3),
                requested: dec!(4),
            }
        );
        assert!(check_allocation("line-1", available, dec!(3)).is_ok());
        assert_eq!(available_quantity(dec!(10), [dec!(7), dec!(3)]), dec!(0));
    }

    #[test]
    fn test_fractional_quantities() {
        let available = available_quantity(dec!(2.5), [dec!(1.25), dec!(0.75)]);
        assert_eq!(available, dec!(0.5));
        assert!(check_allocation("l", available, dec!(0.51)).is_err());
    }

    #[test]
    fn test_merge_requested_sums_duplicates_in_order() {
        let merged = merge_requested(vec![("a", dec!(2)), ("b", dec!(1)), ("a", dec!(3))]);
        assert_eq!(
            merged,
            vec![("a".to_string(), dec!(5)), ("b".to_string(), dec!(1))]
        );
    }

    proptest! {
        /// Allocating up to availability never drives it negative, and
        /// removing an allocation restores exactly what it took.
        #[test]
        fn prop_cancel_restores_availability(
            invoiced in 1i64..1_000_000i64,
            takes in prop::collection::vec(1i64..100_000i64, 0..10),
            cancel_index in any::<prop::sample::Index>(),
        ) {
            let invoiced = Decimal::new(invoiced, 2);
            let mut held: Vec<Decimal> = Vec::new();

            for take in takes {
                let take = Decimal::new(take, 2);
                let available = available_quantity(invoiced, held.iter().copied());
                if check_allocation("l", available, take).is_ok() {
                    held.push(take);
                }
                prop_assert!(available_quantity(invoiced, held.iter().copied()) >= Decimal::ZERO);
            }

            if !held.is_empty() {
                let before = available_quantity(invoiced, held.iter().copied());
                let freed = held.remove(cancel_index.index(held.len()));
                let after = available_quantity(invoiced, held.iter().copied());
                prop_assert_eq!(after - before, freed);
            }
        }
    }
}
