//! Checked integer arithmetic for reserve accounting
//!
//! Every operation that can overflow or divide by zero returns `MathError`.
//! Nothing here saturates: a wrapped reserve is worse than a failed swap.

use thiserror::Error;

/// Basis points in 100%
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Arithmetic failure, always fatal to the enclosing operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,
}

/// Rounding direction for integer division
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Toward zero (in the pool's favour when computing outputs)
    Down,
    /// Away from zero (in the pool's favour when computing inputs and floors)
    Up,
}

/// `a * b / denominator` with a u128 intermediate
#[inline]
pub fn mul_div(a: u128, b: u128, denominator: u128, rounding: Rounding) -> Result<u128, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    div(product, denominator, rounding)
}

/// `numerator / denominator` with explicit rounding
#[inline]
pub fn div(numerator: u128, denominator: u128, rounding: Rounding) -> Result<u128, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }
    let quotient = numerator / denominator;
    match rounding {
        Rounding::Down => Ok(quotient),
        Rounding::Up if numerator % denominator != 0 => {
            quotient.checked_add(1).ok_or(MathError::Overflow)
        }
        Rounding::Up => Ok(quotient),
    }
}

/// Same as `mul_div` but the result must fit in a u64 token amount
#[inline]
pub fn mul_div_u64(a: u64, b: u64, denominator: u64, rounding: Rounding) -> Result<u64, MathError> {
    let result = mul_div(a as u128, b as u128, denominator as u128, rounding)?;
    to_u64(result)
}

/// Narrow a u128 intermediate to u64
#[inline]
pub fn to_u64(value: u128) -> Result<u64, MathError> {
    u64::try_from(value).map_err(|_| MathError::Overflow)
}

/// `amount * bps / 10_000`
#[inline]
pub fn apply_bps(amount: u64, bps: u64, rounding: Rounding) -> Result<u64, MathError> {
    mul_div_u64(amount, bps, BPS_DENOMINATOR, rounding)
}

/// `part / whole` expressed in basis points, rounded down
#[inline]
pub fn ratio_bps(part: u128, whole: u128) -> Result<u128, MathError> {
    mul_div(part, BPS_DENOMINATOR as u128, whole, Rounding::Down)
}

/// Narrow a bps value to u16, saturating at `u16::MAX`
///
/// Only for classification inputs (spread, divergence) where "at least
/// 65535 bps" carries the same meaning as the exact value.
#[inline(always)]
pub fn clamp_bps_u16(value: u128) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

/// `10^exp` as u128
#[inline]
pub fn pow10(exp: u32) -> Result<u128, MathError> {
    10u128.checked_pow(exp).ok_or(MathError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_rounding() {
        assert_eq!(mul_div(10, 3, 4, Rounding::Down), Ok(7));
        assert_eq!(mul_div(10, 3, 4, Rounding::Up), Ok(8));
        // Exact division rounds the same both ways
        assert_eq!(mul_div(10, 4, 4, Rounding::Up), Ok(10));
        assert_eq!(mul_div(10, 4, 4, Rounding::Down), Ok(10));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(mul_div(1, 1, 0, Rounding::Down), Err(MathError::DivisionByZero));
        assert_eq!(div(1, 0, Rounding::Up), Err(MathError::DivisionByZero));
        assert_eq!(ratio_bps(1, 0), Err(MathError::DivisionByZero));
    }

    #[test]
    fn test_overflow_edge() {
        // u128::MAX * 2 overflows the intermediate
        assert_eq!(
            mul_div(u128::MAX, 2, 2, Rounding::Down),
            Err(MathError::Overflow)
        );
        // The largest representable product still works
        assert_eq!(mul_div(u128::MAX, 1, 1, Rounding::Down), Ok(u128::MAX));
        // u64 narrowing
        assert_eq!(
            mul_div_u64(u64::MAX, 2, 1, Rounding::Down),
            Err(MathError::Overflow)
        );
        assert_eq!(mul_div_u64(u64::MAX, 2, 2, Rounding::Down), Ok(u64::MAX));
    }

    #[test]
    fn test_apply_bps() {
        // 3% of 10M
        assert_eq!(apply_bps(10_000_000, 300, Rounding::Down), Ok(300_000));
        // 1 bps of 5 units rounds to 0 down, 1 up
        assert_eq!(apply_bps(5, 1, Rounding::Down), Ok(0));
        assert_eq!(apply_bps(5, 1, Rounding::Up), Ok(1));
    }

    #[test]
    fn test_ratio_and_clamp() {
        // 4_000 / 50_000 = 8% = 800 bps
        assert_eq!(ratio_bps(4_000, 50_000), Ok(800));
        assert_eq!(clamp_bps_u16(800), 800);
        assert_eq!(clamp_bps_u16(1_000_000), u16::MAX);
    }

    #[test]
    fn test_pow10() {
        assert_eq!(pow10(0), Ok(1));
        assert_eq!(pow10(6), Ok(1_000_000));
        assert_eq!(pow10(38), Ok(10u128.pow(38)));
        assert_eq!(pow10(39), Err(MathError::Overflow));
    }
}
