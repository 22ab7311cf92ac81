//! # Safe Math Operations
//!
//! Overflow-checked arithmetic. Every failure maps to an engine error so
//! that a flow aborts before it executes anything with a wrapped value.

use crate::constants::BPS_DENOMINATOR;
use crate::errors::{HedgeError, HedgeResult};
use crate::math::big_int::{mul_div, Rounding};

/// Macro to generate safe arithmetic functions
macro_rules! safe_arith {
    // Division operations with zero check
    (div, $fn_name:ident, $type:ty) => {
        /// Safe division with zero check
        pub fn $fn_name(a: $type, b: $type) -> HedgeResult<$type> {
            if b == 0 {
                return Err(HedgeError::DivisionByZero);
            }
            Ok(a / b)
        }
    };

    // Binary operations with checked methods
    ($fn_name:ident, $type:ty, $checked_method:ident) => {
        /// Checked arithmetic, failing with `ArithmeticOverflow`
        pub fn $fn_name(a: $type, b: $type) -> HedgeResult<$type> {
            a.$checked_method(b).ok_or(HedgeError::ArithmeticOverflow)
        }
    };
}

safe_arith!(safe_add_u128, u128, checked_add);
safe_arith!(safe_sub_u128, u128, checked_sub);
safe_arith!(safe_mul_u128, u128, checked_mul);
safe_arith!(div, safe_div_u128, u128);

safe_arith!(safe_add_i128, i128, checked_add);
safe_arith!(safe_sub_i128, i128, checked_sub);

/// Signed difference `target - current` of two unsigned amounts
pub fn signed_delta(target: u128, current: u128) -> HedgeResult<i128> {
    let target = i128::try_from(target).map_err(|_| HedgeError::ArithmeticOverflow)?;
    let current = i128::try_from(current).map_err(|_| HedgeError::ArithmeticOverflow)?;
    safe_sub_i128(target, current)
}

/// Take `bps` basis points of a value
pub fn bps_of(value: u128, bps: u32, rounding: Rounding) -> HedgeResult<u128> {
    mul_div(value, bps as u128, BPS_DENOMINATOR, rounding)
}

/// Reduce a value by `bps` basis points: `value * (1 - bps)`
pub fn apply_bps_discount(value: u128, bps: u32, rounding: Rounding) -> HedgeResult<u128> {
    let factor = safe_sub_u128(BPS_DENOMINATOR, bps as u128)?;
    mul_div(value, factor, BPS_DENOMINATOR, rounding)
}

/// Increase a value by `bps` basis points: `value * (1 + bps)`
pub fn apply_bps_premium(value: u128, bps: u32, rounding: Rounding) -> HedgeResult<u128> {
    let factor = safe_add_u128(BPS_DENOMINATOR, bps as u128)?;
    mul_div(value, factor, BPS_DENOMINATOR, rounding)
}

/// Relative deviation of `current` from `reference` in basis points.
///
/// A zero reference deviates infinitely unless `current` is zero as well.
pub fn relative_deviation_bps(current: u128, reference: u128) -> HedgeResult<u128> {
    if reference == 0 {
        return Ok(if current == 0 { 0 } else { u128::MAX });
    }
    mul_div(current.abs_diff(reference), BPS_DENOMINATOR, reference, Rounding::Down)
}

/// 10^exponent as u128
pub fn pow10(exponent: u32) -> HedgeResult<u128> {
    10u128.checked_pow(exponent).ok_or(HedgeError::ArithmeticOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_ops() {
        assert_eq!(safe_add_u128(1, 2).unwrap(), 3);
        assert_eq!(safe_add_u128(u128::MAX, 1), Err(HedgeError::ArithmeticOverflow));
        assert_eq!(safe_sub_u128(1, 2), Err(HedgeError::ArithmeticOverflow));
        assert_eq!(safe_div_u128(1, 0), Err(HedgeError::DivisionByZero));
        assert_eq!(safe_div_u128(7, 2).unwrap(), 3);
        assert_eq!(safe_mul_u128(u128::MAX, 2), Err(HedgeError::ArithmeticOverflow));
    }

    #[test]
    fn test_signed_delta() {
        assert_eq!(signed_delta(5, 8).unwrap(), -3);
        assert_eq!(signed_delta(8, 5).unwrap(), 3);
        assert_eq!(signed_delta(u128::MAX, 0), Err(HedgeError::ArithmeticOverflow));
    }

    #[test]
    fn test_bps_helpers() {
        assert_eq!(bps_of(1_000, 250, Rounding::Down).unwrap(), 25);
        assert_eq!(apply_bps_discount(1_000, 100, Rounding::Down).unwrap(), 990);
        assert_eq!(apply_bps_premium(1_000, 100, Rounding::Down).unwrap(), 1010);
        assert_eq!(apply_bps_discount(999, 100, Rounding::Up).unwrap(), 990);
        assert_eq!(apply_bps_discount(999, 100, Rounding::Down).unwrap(), 989);
    }

    #[test]
    fn test_relative_deviation() {
        assert_eq!(relative_deviation_bps(105, 100).unwrap(), 500);
        assert_eq!(relative_deviation_bps(95, 100).unwrap(), 500);
        assert_eq!(relative_deviation_bps(0, 0).unwrap(), 0);
        assert_eq!(relative_deviation_bps(1, 0).unwrap(), u128::MAX);
    }
}
