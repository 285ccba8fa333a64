//! Money calculation utilities using rust_decimal
//!
//! Prices and totals are `Decimal` end to end; rounding is to cents,
//! half away from zero.

use rust_decimal::prelude::*;

const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed quantity per line item
pub const MAX_QUANTITY: i32 = 9999;

/// Round to 2 decimal places (half away from zero)
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// `unit_price × quantity`
pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Tax on a subtotal at a flat rate, rounded to cents
pub fn tax_for(subtotal: Decimal, rate: Decimal) -> Decimal {
    round2(subtotal * rate)
}

/// Whether two amounts agree within [`MONEY_TOLERANCE`]
pub fn money_eq(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() < MONEY_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round2(Decimal::new(12345, 3)), Decimal::new(1235, 2));
        assert_eq!(round2(Decimal::new(-12345, 3)), Decimal::new(-1235, 2));
        assert_eq!(round2(Decimal::new(1234, 3)), Decimal::new(123, 2));
    }

    #[test]
    fn test_tax_for() {
        let rate = Decimal::new(10, 2);
        assert_eq!(tax_for(Decimal::new(2550, 2), rate), Decimal::new(255, 2));
        // 0.05 * 0.10 = 0.005 -> 0.01
        assert_eq!(tax_for(Decimal::new(5, 2), rate), Decimal::new(1, 2));
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(Decimal::new(1000, 2), 2), Decimal::new(2000, 2));
        assert_eq!(line_total(Decimal::new(550, 2), 1), Decimal::new(550, 2));
    }

    #[test]
    fn test_money_eq() {
        assert!(money_eq(Decimal::new(2805, 2), Decimal::new(28050001, 6)));
        assert!(!money_eq(Decimal::new(2805, 2), Decimal::new(2806, 2)));
    }
}
