//! Inventory engine: amount out, reserve floor and partial fills
//!
//! Output is `amount_in * price * (10_000 - fee) / 10_000`, each stage
//! rounded down. The output reserve never drops below
//! `ceil(reserves * floor_bps / 10_000)`; trades that would breach it are
//! partially filled and the unused input goes back to the caller.

use serde::{Deserialize, Serialize};

use crate::core::math::{apply_bps, mul_div, pow10, to_u64, MathError, Rounding, BPS_DENOMINATOR};
use crate::core::{Price, SwapDirection};
use crate::{AmmError, Result};

/// Result of sizing one trade against the inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub amount_out: u64,
    pub applied_amount_in: u64,
    /// `amount_in - applied_amount_in`, returned to the caller
    pub leftover_amount_in: u64,
    pub is_partial: bool,
    /// Fee portion of the applied input
    pub fee_amount: u64,
}

/// Input-to-output price conversion for one direction
///
/// `gross_out = amount_in * mul / div`, decimals folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    mul: u128,
    div: u128,
}

impl Conversion {
    /// Conversion for selling into the pool in `direction` at `mid`
    pub fn new(
        direction: SwapDirection,
        mid: Price,
        base_decimals: u8,
        quote_decimals: u8,
    ) -> std::result::Result<Self, MathError> {
        if mid.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        let mid = mid.as_raw() as u128;
        let scale = Price::SCALE as u128;

        // 10^(quote - base) goes into the numerator of base->quote
        let (quote_per_base_num, quote_per_base_den) = if quote_decimals >= base_decimals {
            (pow10((quote_decimals - base_decimals) as u32)?, 1)
        } else {
            (1, pow10((base_decimals - quote_decimals) as u32)?)
        };

        let (mul, div) = match direction {
            SwapDirection::BaseIn => (
                mid.checked_mul(quote_per_base_num).ok_or(MathError::Overflow)?,
                scale.checked_mul(quote_per_base_den).ok_or(MathError::Overflow)?,
            ),
            SwapDirection::QuoteIn => (
                scale.checked_mul(quote_per_base_den).ok_or(MathError::Overflow)?,
                mid.checked_mul(quote_per_base_num).ok_or(MathError::Overflow)?,
            ),
        };
        Ok(Self { mul, div })
    }

    /// Output for `amount_in` after `fee_bps`
    pub fn amount_out(&self, amount_in: u64, fee_bps: u16) -> std::result::Result<u128, MathError> {
        let gross = mul_div(amount_in as u128, self.mul, self.div, Rounding::Down)?;
        mul_div(gross, net_bps(fee_bps)?, BPS_DENOMINATOR as u128, Rounding::Down)
    }

    /// Smallest input whose output is at least `target_out`
    pub fn min_input_for(&self, target_out: u128, fee_bps: u16) -> std::result::Result<u128, MathError> {
        let gross = mul_div(target_out, BPS_DENOMINATOR as u128, net_bps(fee_bps)?, Rounding::Up)?;
        mul_div(gross, self.div, self.mul, Rounding::Up)
    }
}

#[inline]
fn net_bps(fee_bps: u16) -> std::result::Result<u128, MathError> {
    (BPS_DENOMINATOR as u128)
        .checked_sub(fee_bps as u128)
        .ok_or(MathError::Overflow)
}

/// Reserve the pool will not trade through: `ceil(reserves * floor_bps / 10_000)`
#[inline]
pub fn floor_amount(reserves: u64, floor_bps: u16) -> Result<u64> {
    Ok(apply_bps(reserves, floor_bps as u64, Rounding::Up)?)
}

/// Reserves above the floor; zero when already at or below it
#[inline]
pub fn available_inventory(reserves: u64, floor_bps: u16) -> Result<u64> {
    Ok(reserves.saturating_sub(floor_amount(reserves, floor_bps)?))
}

/// Exact-output quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactOutput {
    pub amount_in: u64,
    /// At least the requested output; rounding favours the pool
    pub amount_out: u64,
    pub fee_amount: u64,
}

/// Inventory engine for one token pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryEngine {
    base_decimals: u8,
    quote_decimals: u8,
}

impl InventoryEngine {
    pub fn new(base_decimals: u8, quote_decimals: u8) -> Self {
        Self {
            base_decimals,
            quote_decimals,
        }
    }

    /// Sell base into the pool, paid out of `quote_reserves`
    pub fn quote_base_in(
        &self,
        amount_in: u64,
        mid: Price,
        fee_bps: u16,
        quote_reserves: u64,
        floor_bps: u16,
    ) -> Result<Fill> {
        self.quote(SwapDirection::BaseIn, amount_in, mid, fee_bps, quote_reserves, floor_bps, None)
    }

    /// Sell quote into the pool, paid out of `base_reserves`
    pub fn quote_quote_in(
        &self,
        amount_in: u64,
        mid: Price,
        fee_bps: u16,
        base_reserves: u64,
        floor_bps: u16,
    ) -> Result<Fill> {
        self.quote(SwapDirection::QuoteIn, amount_in, mid, fee_bps, base_reserves, floor_bps, None)
    }

    /// Size a trade in either direction
    ///
    /// `size_cap_bps` further limits the output to a share of the available
    /// inventory (AOMQ).
    ///
    /// # Errors
    /// - `InvalidAmount` for a zero input or an output that rounds to zero
    /// - `InsufficientLiquidity` when nothing can be paid above the floor
    #[allow(clippy::too_many_arguments)]
    pub fn quote(
        &self,
        direction: SwapDirection,
        amount_in: u64,
        mid: Price,
        fee_bps: u16,
        out_reserves: u64,
        floor_bps: u16,
        size_cap_bps: Option<u16>,
    ) -> Result<Fill> {
        if amount_in == 0 {
            return Err(AmmError::InvalidAmount("amount_in is zero".to_string()));
        }
        let conversion = Conversion::new(direction, mid, self.base_decimals, self.quote_decimals)?;
        let available = self.tradable(out_reserves, floor_bps, size_cap_bps)?;

        let ideal = conversion.amount_out(amount_in, fee_bps)?;

        let (applied, amount_out) = if ideal <= available as u128 {
            (amount_in, to_u64(ideal)?)
        } else {
            // Largest input whose output still fits: one below the smallest
            // input that would pay out `available + 1`
            let breach = conversion.min_input_for(available as u128 + 1, fee_bps)?;
            let applied = to_u64(breach - 1)?;
            (applied, to_u64(conversion.amount_out(applied, fee_bps)?)?)
        };

        if amount_out == 0 {
            return Err(if available == 0 || applied < amount_in {
                AmmError::InsufficientLiquidity
            } else {
                AmmError::InvalidAmount("output rounds to zero".to_string())
            });
        }

        Ok(Fill {
            amount_out,
            applied_amount_in: applied,
            leftover_amount_in: amount_in - applied,
            is_partial: applied < amount_in,
            fee_amount: apply_bps(applied, fee_bps as u64, Rounding::Down)?,
        })
    }

    /// Input needed to receive at least `amount_out`
    ///
    /// # Errors
    /// `InsufficientLiquidity` if `amount_out` exceeds the tradable inventory.
    #[allow(clippy::too_many_arguments)]
    pub fn quote_exact_output(
        &self,
        direction: SwapDirection,
        amount_out: u64,
        mid: Price,
        fee_bps: u16,
        out_reserves: u64,
        floor_bps: u16,
        size_cap_bps: Option<u16>,
    ) -> Result<ExactOutput> {
        if amount_out == 0 {
            return Err(AmmError::InvalidAmount("amount_out is zero".to_string()));
        }
        if amount_out > self.tradable(out_reserves, floor_bps, size_cap_bps)? {
            return Err(AmmError::InsufficientLiquidity);
        }
        let conversion = Conversion::new(direction, mid, self.base_decimals, self.quote_decimals)?;
        let amount_in = to_u64(conversion.min_input_for(amount_out as u128, fee_bps)?)?;
        Ok(ExactOutput {
            amount_in,
            amount_out: to_u64(conversion.amount_out(amount_in, fee_bps)?)?,
            fee_amount: apply_bps(amount_in, fee_bps as u64, Rounding::Down)?,
        })
    }

    fn tradable(&self, out_reserves: u64, floor_bps: u16, size_cap_bps: Option<u16>) -> Result<u64> {
        let available = available_inventory(out_reserves, floor_bps)?;
        match size_cap_bps {
            Some(cap) => Ok(apply_bps(available, cap as u64, Rounding::Down)?),
            None => Ok(available),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::price;

    fn engine() -> InventoryEngine {
        // Same decimals on both sides keeps the arithmetic readable
        InventoryEngine::new(6, 6)
    }

    #[test]
    fn test_floor_and_available() {
        assert_eq!(floor_amount(10_000_000, 300).unwrap(), 300_000);
        assert_eq!(available_inventory(10_000_000, 300).unwrap(), 9_700_000);
        // Floor rounds up
        assert_eq!(floor_amount(101, 300).unwrap(), 4);
        assert_eq!(available_inventory(0, 300).unwrap(), 0);
    }

    #[test]
    fn test_full_fill() {
        let fill = engine()
            .quote_base_in(1_000_000, price("1.5"), 30, 10_000_000, 300)
            .unwrap();
        // 1_000_000 * 1.5 * 0.997
        assert_eq!(fill.amount_out, 1_495_500);
        assert_eq!(fill.applied_amount_in, 1_000_000);
        assert_eq!(fill.leftover_amount_in, 0);
        assert!(!fill.is_partial);
        assert_eq!(fill.fee_amount, 3_000);
    }

    #[test]
    fn test_floor_clamp_partial_fill() {
        // Demands 9_900_000 out of 10_000_000 with a 3% floor
        let fill = engine()
            .quote_base_in(9_900_000, Price::ONE, 0, 10_000_000, 300)
            .unwrap();
        assert!(fill.is_partial);
        assert_eq!(fill.amount_out, 9_700_000);
        assert_eq!(fill.applied_amount_in, 9_700_000);
        assert_eq!(fill.leftover_amount_in, 200_000);
        assert!(10_000_000 - fill.amount_out >= floor_amount(10_000_000, 300).unwrap());
    }

    #[test]
    fn test_partial_fill_with_fee_and_price() {
        let reserves = 10_000_000;
        let fill = engine()
            .quote_quote_in(50_000_000, price("3.3"), 45, reserves, 300)
            .unwrap();
        assert!(fill.is_partial);
        assert!(fill.amount_out <= 9_700_000);
        assert_eq!(fill.applied_amount_in + fill.leftover_amount_in, 50_000_000);
        // One more unit of input would breach the floor
        let next = Conversion::new(SwapDirection::QuoteIn, price("3.3"), 6, 6)
            .unwrap()
            .amount_out(fill.applied_amount_in + 1, 45)
            .unwrap();
        assert!(next > 9_700_000);
    }

    #[test]
    fn test_quote_in_uses_inverse_price() {
        let fill = engine()
            .quote_quote_in(2_000_000, price("2"), 0, 10_000_000, 300)
            .unwrap();
        assert_eq!(fill.amount_out, 1_000_000);
    }

    #[test]
    fn test_decimal_scaling() {
        // 9-decimal base, 6-decimal quote: 1 base token at 150 = 150 quote tokens
        let engine = InventoryEngine::new(9, 6);
        let fill = engine
            .quote_base_in(1_000_000_000, price("150"), 0, 1_000_000_000_000, 300)
            .unwrap();
        assert_eq!(fill.amount_out, 150_000_000);

        let back = engine
            .quote_quote_in(150_000_000, price("150"), 0, 1_000_000_000_000, 300)
            .unwrap();
        assert_eq!(back.amount_out, 1_000_000_000);
    }

    #[test]
    fn test_reserves_at_floor_is_insufficient_liquidity() {
        let result = engine().quote_base_in(1_000, Price::ONE, 0, 0, 300);
        assert!(matches!(result, Err(AmmError::InsufficientLiquidity)));
    }

    #[test]
    fn test_zero_and_dust_inputs() {
        assert!(matches!(
            engine().quote_base_in(0, Price::ONE, 0, 1_000, 300),
            Err(AmmError::InvalidAmount(_))
        ));
        // 1 unit at 0.5 rounds to zero output
        assert!(matches!(
            engine().quote_base_in(1, price("0.5"), 0, 1_000, 300),
            Err(AmmError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_zero_mid_is_math_error() {
        assert!(matches!(
            engine().quote_base_in(1_000, Price::ZERO, 0, 1_000, 300),
            Err(AmmError::Math(MathError::DivisionByZero))
        ));
    }

    #[test]
    fn test_overflow_is_fatal() {
        let result = InventoryEngine::new(0, 18).quote_base_in(u64::MAX, Price::MAX, 0, u64::MAX, 0);
        assert!(matches!(result, Err(AmmError::Math(MathError::Overflow))));
    }

    #[test]
    fn test_size_cap() {
        let fill = engine()
            .quote(SwapDirection::BaseIn, 5_000_000, Price::ONE, 0, 10_000_000, 300, Some(2_500))
            .unwrap();
        // 25% of 9_700_000
        assert!(fill.is_partial);
        assert_eq!(fill.amount_out, 2_425_000);
    }

    #[test]
    fn test_exact_output() {
        let quote = engine()
            .quote_exact_output(SwapDirection::BaseIn, 997_000, Price::ONE, 30, 10_000_000, 300, None)
            .unwrap();
        assert_eq!(quote.amount_in, 1_000_000);
        assert_eq!(quote.amount_out, 997_000);

        // Rounds the input up so the caller still receives the full amount
        let odd = engine()
            .quote_exact_output(SwapDirection::QuoteIn, 1_001, price("3"), 30, 10_000_000, 300, None)
            .unwrap();
        assert!(odd.amount_out >= 1_001);

        let too_big = engine().quote_exact_output(
            SwapDirection::BaseIn,
            9_700_001,
            Price::ONE,
            0,
            10_000_000,
            300,
            None,
        );
        assert!(matches!(too_big, Err(AmmError::InsufficientLiquidity)));
    }
}
