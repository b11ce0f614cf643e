use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::checkout::CartLine;

/// Totals breakdown returned alongside a completed checkout.
///
/// `total == subtotal + tax` holds exactly: subtotal and tax are rounded to
/// two decimal places first and the total is their sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl CheckoutTotals {
    /// `subtotal = Σ(price × quantity)`, `tax = subtotal × rate`, both rounded
    /// to cents.
    pub fn compute(lines: &[CartLine], tax_rate: Decimal) -> Self {
        let subtotal: Decimal = lines
            .iter()
            .map(|l| l.price * Decimal::from(l.quantity))
            .sum();
        // Force scale 2 so the amounts serialize as "x.yy" (e.g. "200.00").
        let mut subtotal = subtotal.round_dp(2);
        subtotal.rescale(2);
        let mut tax = (subtotal * tax_rate).round_dp(2);
        tax.rescale(2);
        Self {
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use tillpoint_core::ItemId;

    fn line(quantity: i64, price: Decimal) -> CartLine {
        CartLine {
            id: ItemId::new(),
            quantity,
            price,
            name: None,
        }
    }

    #[test]
    fn worked_example_two_items_at_eight_percent() {
        // A: 2 × 100, B: 1 × 50 → 250 / 20 / 270
        let totals = CheckoutTotals::compute(
            &[line(2, dec!(100)), line(1, dec!(50))],
            dec!(0.08),
        );
        assert_eq!(totals.subtotal, dec!(250));
        assert_eq!(totals.tax, dec!(20));
        assert_eq!(totals.total, dec!(270));
    }

    #[test]
    fn zero_tax_rate_yields_zero_tax() {
        let totals = CheckoutTotals::compute(&[line(3, dec!(9.99))], Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.total, totals.subtotal);
    }

    proptest! {
        #[test]
        fn total_is_always_subtotal_plus_tax(
            lines in proptest::collection::vec((1i64..50, 0i64..100_000), 1..8),
            rate_bp in 0i64..3000,
        ) {
            let cart: Vec<CartLine> = lines
                .into_iter()
                .map(|(qty, cents)| line(qty, Decimal::new(cents, 2)))
                .collect();
            let rate = Decimal::new(rate_bp, 4);

            let totals = CheckoutTotals::compute(&cart, rate);
            prop_assert_eq!(totals.total, totals.subtotal + totals.tax);
            prop_assert!(totals.subtotal >= Decimal::ZERO);
            prop_assert!(totals.tax >= Decimal::ZERO);
        }
    }
}
