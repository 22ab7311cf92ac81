//! Big integer operations for high-precision math
//!
//! This module provides the U256 intermediate and mul_div functionality
//! needed so that `a * b / c` never loses precision or silently wraps.

use crate::errors::{HedgeError, HedgeResult};

/// Rounding mode for division operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum Rounding {
    /// Round down (towards zero)
    Down,
    /// Round up (away from zero)
    Up,
}

/// 256-bit unsigned integer for intermediate calculations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct U256 {
    /// Low 128 bits
    pub lo: u128,
    /// High 128 bits
    pub hi: u128,
}

impl U256 {
    pub const ZERO: U256 = U256 { lo: 0, hi: 0 };

    /// Create a new U256 from low and high parts
    pub const fn new(lo: u128, hi: u128) -> Self {
        Self { lo, hi }
    }

    /// Create from a single u128 value
    pub const fn from_u128(value: u128) -> Self {
        Self { lo: value, hi: 0 }
    }

    /// Check if the value is zero
    pub const fn is_zero(&self) -> bool {
        self.lo == 0 && self.hi == 0
    }

    /// Convert to u128, returning None if overflow
    pub fn to_u128(&self) -> Option<u128> {
        if self.hi == 0 {
            Some(self.lo)
        } else {
            None
        }
    }

    /// Add two U256 values
    pub fn checked_add(&self, other: &U256) -> Option<U256> {
        let (lo, carry) = self.lo.overflowing_add(other.lo);
        let hi = self.hi.checked_add(other.hi)?.checked_add(carry as u128)?;
        Some(U256::new(lo, hi))
    }

    /// Subtract two U256 values
    pub fn checked_sub(&self, other: &U256) -> Option<U256> {
        let (lo, borrow) = self.lo.overflowing_sub(other.lo);
        let hi = self.hi.checked_sub(other.hi)?.checked_sub(borrow as u128)?;
        Some(U256::new(lo, hi))
    }

    /// Multiply by a u128, returning None if the product needs more than 256 bits
    pub fn checked_mul_u128(&self, factor: u128) -> Option<U256> {
        let low = mul_u128_to_u256(self.lo, factor);
        let high = self.hi.checked_mul(factor)?;
        let hi = low.hi.checked_add(high)?;
        Some(U256::new(low.lo, hi))
    }

    /// Divide by a u128, returning quotient and remainder
    pub fn div_rem_u128(&self, divisor: u128) -> Option<(U256, u128)> {
        if divisor == 0 {
            return None;
        }

        // Dividend fits in u128
        if self.hi == 0 {
            return Some((U256::from_u128(self.lo / divisor), self.lo % divisor));
        }

        // Binary long division; the running remainder always stays below the
        // divisor, so one carry bit is enough to track the shifted-out value.
        let mut quotient = U256::ZERO;
        let mut remainder: u128 = 0;
        for bit in (0..256).rev() {
            let carry = remainder >> 127;
            remainder = (remainder << 1) | self.bit(bit);
            if carry == 1 || remainder >= divisor {
                remainder = remainder.wrapping_sub(divisor);
                quotient.set_bit(bit);
            }
        }
        Some((quotient, remainder))
    }

    fn bit(&self, index: u32) -> u128 {
        if index < 128 {
            (self.lo >> index) & 1
        } else {
            (self.hi >> (index - 128)) & 1
        }
    }

    fn set_bit(&mut self, index: u32) {
        if index < 128 {
            self.lo |= 1u128 << index;
        } else {
            self.hi |= 1u128 << (index - 128);
        }
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.hi.cmp(&other.hi) {
            std::cmp::Ordering::Equal => self.lo.cmp(&other.lo),
            ordering => ordering,
        }
    }
}

/// Multiply two u128 values and return the full 256-bit product
pub fn mul_u128_to_u256(a: u128, b: u128) -> U256 {
    // Split into 64-bit parts for multiplication
    let a_lo = a as u64 as u128;
    let a_hi = a >> 64;
    let b_lo = b as u64 as u128;
    let b_hi = b >> 64;

    let lo_lo = a_lo * b_lo;
    let lo_hi = a_lo * b_hi;
    let hi_lo = a_hi * b_lo;
    let hi_hi = a_hi * b_hi;

    // Cross products can overflow u128 together; that carry is worth 2^192
    let (mid, mid_carry) = lo_hi.overflowing_add(hi_lo);
    let (lo, lo_carry) = lo_lo.overflowing_add(mid << 64);
    let hi = hi_hi + (mid >> 64) + ((mid_carry as u128) << 64) + lo_carry as u128;

    U256::new(lo, hi)
}

fn finish(product: U256, denominator: u128, rounding: Rounding) -> HedgeResult<u128> {
    let (quotient, remainder) = product
        .div_rem_u128(denominator)
        .ok_or(HedgeError::DivisionByZero)?;

    let quotient = quotient.to_u128().ok_or(HedgeError::ArithmeticOverflow)?;
    if rounding == Rounding::Up && remainder > 0 {
        return quotient.checked_add(1).ok_or(HedgeError::ArithmeticOverflow);
    }
    Ok(quotient)
}

/// Multiply two values and divide by a third with specified rounding
/// result = (a * b) / denominator
pub fn mul_div(a: u128, b: u128, denominator: u128, rounding: Rounding) -> HedgeResult<u128> {
    if denominator == 0 {
        return Err(HedgeError::DivisionByZero);
    }
    finish(mul_u128_to_u256(a, b), denominator, rounding)
}

/// Multiply three values and divide by a fourth with specified rounding
/// result = (a * b * c) / denominator
pub fn mul_mul_div(
    a: u128,
    b: u128,
    c: u128,
    denominator: u128,
    rounding: Rounding,
) -> HedgeResult<u128> {
    if denominator == 0 {
        return Err(HedgeError::DivisionByZero);
    }
    let product = mul_u128_to_u256(a, b)
        .checked_mul_u128(c)
        .ok_or(HedgeError::ArithmeticOverflow)?;
    finish(product, denominator, rounding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u256_basic_ops() {
        let a = U256::from_u128(100);
        let b = U256::from_u128(200);

        let sum = a.checked_add(&b).unwrap();
        assert_eq!(sum.to_u128().unwrap(), 300);

        let diff = b.checked_sub(&a).unwrap();
        assert_eq!(diff.to_u128().unwrap(), 100);
        assert!(a.checked_sub(&b).is_none());

        let product = a.checked_mul_u128(200).unwrap();
        assert_eq!(product.to_u128().unwrap(), 20000);
    }

    #[test]
    fn test_widening_multiplication() {
        let product = mul_u128_to_u256(u128::MAX, u128::MAX);
        // (2^128 - 1)^2 = 2^256 - 2^129 + 1
        assert_eq!(product.lo, 1);
        assert_eq!(product.hi, u128::MAX - 1);

        let product = mul_u128_to_u256(1u128 << 127, 4);
        assert_eq!(product, U256::new(0, 2));
    }

    #[test]
    fn test_long_division() {
        let value = mul_u128_to_u256(u128::MAX, 3);
        let (quotient, remainder) = value.div_rem_u128(3).unwrap();
        assert_eq!(quotient.to_u128().unwrap(), u128::MAX);
        assert_eq!(remainder, 0);

        let (quotient, remainder) = value.div_rem_u128(u128::MAX).unwrap();
        assert_eq!(quotient.to_u128().unwrap(), 3);
        assert_eq!(remainder, 0);

        assert!(value.div_rem_u128(0).is_none());
    }

    #[test]
    fn test_mul_div_rounding() {
        assert_eq!(mul_div(10, 3, 4, Rounding::Down).unwrap(), 7);
        assert_eq!(mul_div(10, 3, 4, Rounding::Up).unwrap(), 8);
        assert_eq!(mul_div(10, 4, 5, Rounding::Up).unwrap(), 8);
    }

    #[test]
    fn test_mul_div_large_numbers() {
        let a = u128::MAX / 2;
        assert_eq!(mul_div(a, 6, 6, Rounding::Down).unwrap(), a);
        assert_eq!(mul_div(u128::MAX, u128::MAX, u128::MAX, Rounding::Up).unwrap(), u128::MAX);
        assert_eq!(mul_div(u128::MAX, 2, 1, Rounding::Down), Err(HedgeError::ArithmeticOverflow));
        assert_eq!(mul_div(1, 1, 0, Rounding::Down), Err(HedgeError::DivisionByZero));
    }

    #[test]
    fn test_mul_mul_div() {
        let value = 100 * 10u128.pow(18);
        // The 1e50 intermediate only fits in 256 bits
        let result = mul_mul_div(value, 10u128.pow(20), 10u128.pow(10), 10u128.pow(30), Rounding::Down).unwrap();
        assert_eq!(result, value);
        assert_eq!(mul_mul_div(10, 3, 1, 4, Rounding::Up).unwrap(), 8);
        assert_eq!(
            mul_mul_div(u128::MAX, u128::MAX, u128::MAX, 1, Rounding::Down),
            Err(HedgeError::ArithmeticOverflow)
        );
    }
}
