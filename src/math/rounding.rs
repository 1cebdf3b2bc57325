//! Decimal-place rounding.
//!
//! `ceil_dp(x, d)` / `floor_dp(x, d)` round to the nearest multiple of
//! `10^-d` toward positive / negative infinity. Both are exact on `Decimal`.

use rust_decimal::{Decimal, RoundingStrategy};

#[must_use]
pub fn ceil_dp(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::ToPositiveInfinity)
}

#[must_use]
pub fn floor_dp(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::ToNegativeInfinity)
}

/// True if `value` carries no precision beyond `decimals` places.
#[must_use]
pub fn is_rounded_to(value: Decimal, decimals: u32) -> bool {
    floor_dp(value, decimals) == value
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ceil_and_floor() {
        assert_eq!(ceil_dp(dec!(98.001), 2), dec!(98.01));
        assert_eq!(floor_dp(dec!(98.009), 2), dec!(98.00));
        assert_eq!(ceil_dp(dec!(-1.001), 2), dec!(-1.00));
        assert_eq!(floor_dp(dec!(-1.001), 2), dec!(-1.01));
        assert_eq!(ceil_dp(dec!(98.00), 2), dec!(98.00));
    }

    #[test]
    fn test_notional_preserving_size() {
        let size = floor_dp(dec!(100.00) / dec!(98.00) * dec!(1.0000), 4);
        assert_eq!(size, dec!(1.0204));
    }

    #[test]
    fn test_is_rounded_to() {
        assert!(is_rounded_to(dec!(1.0204), 4));
        assert!(is_rounded_to(dec!(1.02040000), 4));
        assert!(!is_rounded_to(dec!(1.02041), 4));
        assert!(is_rounded_to(dec!(7), 0));
    }
}
