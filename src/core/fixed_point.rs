//! Fixed-point prices for oracle reads
//!
//! Uses u64 internally with 8 decimal places precision.
//! Zero allocation, Copy type, no panics. Prices are never negative, so the
//! representation is unsigned; all arithmetic is checked.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::math::MathError;

/// Quote-per-base price with 8 decimal places
/// Stored as u64 where value = real_value * 100_000_000
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
#[repr(transparent)]
pub struct Price(u64);

impl Price {
    /// Number of decimal places
    pub const DECIMALS: u8 = 8;

    /// Scale factor (10^8)
    pub const SCALE: u64 = 100_000_000;

    /// One unit (1.0)
    pub const ONE: Self = Self(100_000_000);

    /// Zero
    pub const ZERO: Self = Self(0);

    /// Maximum value
    pub const MAX: Self = Self(u64::MAX);

    /// Create from raw u64 value
    #[inline(always)]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Get raw u64 value
    #[inline(always)]
    pub const fn as_raw(&self) -> u64 {
        self.0
    }

    #[inline(always)]
    pub const fn checked_add(&self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    #[inline(always)]
    pub const fn checked_sub(&self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Absolute distance between two prices
    #[inline(always)]
    pub const fn abs_diff(&self, other: Self) -> Self {
        Self(self.0.abs_diff(other.0))
    }

    /// Price ratio `self / other`, rounded down
    ///
    /// Used to turn two USD-denominated legs into a pair price.
    #[inline]
    pub fn checked_ratio(&self, other: Self) -> Result<Self, MathError> {
        if other.0 == 0 {
            return Err(MathError::DivisionByZero);
        }
        let scaled = (self.0 as u128 * Self::SCALE as u128) / other.0 as u128;
        u64::try_from(scaled)
            .map(Self)
            .map_err(|_| MathError::Overflow)
    }

    /// Parse from byte slice without allocation
    /// Supports format: "12345.6789" or "12345"
    /// Returns None on invalid format, sign, or overflow
    pub fn parse_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }

        let mut integer_part: u64 = 0;
        let mut fractional_part: u64 = 0;
        let mut fractional_digits: u8 = 0;
        let mut has_decimal = false;
        let mut has_digit = false;

        for &c in bytes {
            if c == b'.' {
                if has_decimal {
                    return None; // Multiple decimal points
                }
                has_decimal = true;
                continue;
            }

            if !c.is_ascii_digit() {
                return None;
            }
            has_digit = true;

            let digit = (c - b'0') as u64;

            if !has_decimal {
                integer_part = integer_part.checked_mul(10)?.checked_add(digit)?;
            } else if fractional_digits < Self::DECIMALS {
                fractional_part = fractional_part * 10 + digit;
                fractional_digits += 1;
            }
            // Digits beyond 8 decimal places are truncated
        }

        if !has_digit {
            return None;
        }

        while fractional_digits < Self::DECIMALS {
            fractional_part *= 10;
            fractional_digits += 1;
        }

        integer_part
            .checked_mul(Self::SCALE)?
            .checked_add(fractional_part)
            .map(Self)
    }

    /// Write to buffer without allocation
    /// Returns number of bytes written; a 32 byte buffer always fits
    pub fn write_to_buffer(&self, buf: &mut [u8]) -> usize {
        let integer = self.0 / Self::SCALE;
        let fractional = self.0 % Self::SCALE;

        let mut pos = 0;

        // Integer digits, written reversed then flipped
        let mut int_val = integer;
        loop {
            if pos >= buf.len() {
                return pos;
            }
            buf[pos] = b'0' + (int_val % 10) as u8;
            int_val /= 10;
            pos += 1;
            if int_val == 0 {
                break;
            }
        }
        buf[..pos].reverse();

        if pos < buf.len() {
            buf[pos] = b'.';
            pos += 1;
        }

        let mut divisor = Self::SCALE / 10;
        while divisor > 0 && pos < buf.len() {
            buf[pos] = b'0' + ((fractional / divisor) % 10) as u8;
            divisor /= 10;
            pos += 1;
        }

        pos
    }

    #[inline(always)]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0u8; 32];
        let len = self.write_to_buffer(&mut buf);
        f.write_str(std::str::from_utf8(&buf[..len]).unwrap_or(""))
    }
}

/// Invalid price literal
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid price literal: {0:?}")]
pub struct ParsePriceError(pub String);

impl FromStr for Price {
    type Err = ParsePriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_bytes(s.trim().as_bytes()).ok_or_else(|| ParsePriceError(s.to_string()))
    }
}

impl TryFrom<String> for Price {
    type Error = ParsePriceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Price> for String {
    fn from(price: Price) -> Self {
        price.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_arithmetic() {
        let a = Price::from_raw(100_000_000); // 1.0
        let b = Price::from_raw(250_000_000); // 2.5

        assert_eq!(a.checked_add(b).unwrap().as_raw(), 350_000_000);
        assert_eq!(b.checked_sub(a).unwrap().as_raw(), 150_000_000);
        assert!(a.checked_sub(b).is_none());
        assert!(Price::MAX.checked_add(Price::ONE).is_none());
    }

    #[test]
    fn test_abs_diff_is_symmetric() {
        let a = Price::from_raw(100_000_000);
        let b = Price::from_raw(101_200_000);
        assert_eq!(a.abs_diff(b), b.abs_diff(a));
        assert_eq!(a.abs_diff(b).as_raw(), 1_200_000);
    }

    #[test]
    fn test_ratio() {
        // SOL at $150, USDC at $1.00 -> 150 USDC per SOL
        let sol = Price::from_raw(150 * Price::SCALE);
        let usdc = Price::ONE;
        assert_eq!(sol.checked_ratio(usdc).unwrap().as_raw(), 150 * Price::SCALE);
        assert_eq!(sol.checked_ratio(Price::ZERO), Err(MathError::DivisionByZero));
        assert_eq!(
            Price::MAX.checked_ratio(Price::from_raw(1)),
            Err(MathError::Overflow)
        );
    }

    #[test]
    fn test_parse_bytes() {
        assert_eq!(Price::parse_bytes(b"123").unwrap().as_raw(), 12_300_000_000);
        assert_eq!(Price::parse_bytes(b"1.012").unwrap().as_raw(), 101_200_000);
        assert_eq!(Price::parse_bytes(b"0.12345678").unwrap().as_raw(), 12_345_678);
        // Truncates past 8 decimals
        assert_eq!(Price::parse_bytes(b"0.123456789").unwrap().as_raw(), 12_345_678);
        assert_eq!(Price::parse_bytes(b"0").unwrap(), Price::ZERO);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Price::parse_bytes(b"").is_none());
        assert!(Price::parse_bytes(b".").is_none());
        assert!(Price::parse_bytes(b"abc").is_none());
        assert!(Price::parse_bytes(b"1.2.3").is_none());
        assert!(Price::parse_bytes(b"-1").is_none());
        assert!(Price::parse_bytes(b"99999999999999999999").is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_raw(12_345_678_900).to_string(), "123.45678900");
        assert_eq!(Price::from_raw(50_000_000).to_string(), "0.50000000");
        assert_eq!(Price::ZERO.to_string(), "0.00000000");
    }

    #[test]
    fn test_serde_as_string() {
        let price: Price = serde_json::from_str("\"1.012\"").unwrap();
        assert_eq!(price.as_raw(), 101_200_000);
        assert_eq!(serde_json::to_string(&price).unwrap(), "\"1.01200000\"");
        assert!(serde_json::from_str::<Price>("\"-3\"").is_err());
    }
}
