//! Decimal money arithmetic for cart and order totals.
//!
//! All money values in the system are non-negative decimals. Subtotals and
//! totals are computed with `rust_decimal` so that prices like 99.99 survive
//! arithmetic exactly; floating point is never used on a money path.

use rust_decimal::Decimal;

/// Compute the subtotal of a single line item.
///
/// Invariant: `subtotal = unit_price * quantity`, exact in decimal.
#[must_use]
pub fn line_subtotal(unit_price: Decimal, quantity: u32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Compute the total of a list of line-item subtotals.
///
/// Invariant: `total = sum(subtotals)`, exact in decimal. An empty list
/// totals to zero, which is the canonical empty-cart total.
#[must_use]
pub fn order_total<I>(subtotals: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    subtotals.into_iter().sum()
}
