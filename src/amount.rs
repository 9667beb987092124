//! Conversion between user-entered decimal amounts and integer base units.

use crate::error::AmountError;
use ethers::{
    types::U256,
    utils::{format_ether, parse_ether},
};

/// Fractional digits of the display denomination
pub const DECIMALS: usize = 18;

/// Parses a decimal display amount ("0.01") into base units.
///
/// Only plain digits with at most one `.` are accepted. Amounts finer than
/// one base unit are rejected rather than truncated.
pub fn to_base_units(amount: &str) -> Result<U256, AmountError> {
    let amount = amount.trim();
    if amount.starts_with('-') {
        return Err(AmountError::Negative(amount.to_owned()));
    }
    let plain = amount.chars().all(|c| c.is_ascii_digit() || c == '.')
        && amount.matches('.').count() <= 1
        && amount.chars().any(|c| c.is_ascii_digit());
    if !plain {
        return Err(AmountError::NotDecimal(amount.to_owned()));
    }
    if let Some((_, fraction)) = amount.split_once('.') {
        if fraction.len() > DECIMALS {
            return Err(AmountError::TooPrecise(amount.to_owned()));
        }
    }
    Ok(parse_ether(amount)?)
}

/// Exact decimal rendering of a base-unit amount
pub fn format_decimal(amount: U256) -> String {
    format_ether(amount)
}

/// Lossy float rendering used for display
pub fn to_decimal(amount: U256) -> f64 {
    format_decimal(amount).parse().unwrap_or(f64::INFINITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hundredth_is_ten_to_the_sixteen() {
        assert_eq!(to_base_units("0.01").unwrap(), U256::exp10(16));
        assert_eq!(to_base_units("1").unwrap(), U256::exp10(18));
        assert_eq!(to_base_units(" 2.5 ").unwrap(), U256::from(25u64) * U256::exp10(17));
    }

    #[test]
    fn decimal_round_trip_is_stable() {
        for amount in [
            "0",
            "0.01",
            "0.0001",
            "1",
            "1.5",
            "42.000000000000000001",
            "0.000000000000000001",
            "123456789.123456789",
        ] {
            let base = to_base_units(amount).unwrap();
            let again = to_base_units(&format_decimal(base)).unwrap();
            assert_eq!(again, base, "round trip of {}", amount);
        }
    }

    #[test]
    fn display_float() {
        assert_eq!(to_decimal(U256::exp10(16)), 0.01);
        assert_eq!(to_decimal(U256::zero()), 0.0);
        assert_eq!(to_decimal(U256::from(3u64) * U256::exp10(18)), 3.0);
    }

    #[test]
    fn rejects_garbage_and_negatives() {
        assert!(matches!(to_base_units("-1"), Err(AmountError::Negative(_))));
        for garbage in ["abc", "1.2.3", ".", "1e18", "+1"] {
            assert!(
                matches!(to_base_units(garbage), Err(AmountError::NotDecimal(_))),
                "{} accepted",
                garbage
            );
        }
    }

    #[test]
    fn rejects_digit_separators() {
        assert!(matches!(
            to_base_units("1_000"),
            Err(AmountError::NotDecimal(_))
        ));
        assert!(matches!(
            to_base_units("0.000_1"),
            Err(AmountError::NotDecimal(_))
        ));
    }

    #[test]
    fn rejects_sub_base_unit_precision() {
        assert!(matches!(
            to_base_units("0.0000000000000000001"),
            Err(AmountError::TooPrecise(_))
        ));
        assert!(matches!(
            to_base_units("1.0000000000000000009"),
            Err(AmountError::TooPrecise(_))
        ));
        assert_eq!(
            to_base_units("1.000000000000000009").unwrap(),
            U256::exp10(18) + U256::from(9u64)
        );
    }
}
