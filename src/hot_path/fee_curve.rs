//! Dynamic fee curve
//!
//! fee = base + decay(alpha * conf + beta * inventory_deviation) + size_term,
//! clamped to `[0, cap_bps]`. The dynamic (alpha/beta) part cools off by
//! `decay_pct_per_block` for every block since the last completed swap.

use serde::{Deserialize, Serialize};

use super::oracle::ZoneAdjustment;
use crate::infrastructure::config::FeeConfig;

/// Fixed-point scale for the decay factor
const DECAY_SCALE: u128 = 1_000_000_000_000;

/// Inputs that do not depend on trade size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeeInputs {
    pub conf_bps: u16,
    /// Hundredths of a percent (800 = 8%)
    pub inventory_deviation_pct: u32,
    pub blocks_since_update: u64,
}

/// Fee at one notional of the preview ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderRung {
    /// Raw quote units
    pub notional: u64,
    pub fee_bps: u16,
}

/// Fee curve over a borrowed config
#[derive(Debug, Clone, Copy)]
pub struct FeeCurve<'a> {
    config: &'a FeeConfig,
}

impl<'a> FeeCurve<'a> {
    pub fn new(config: &'a FeeConfig) -> Self {
        Self { config }
    }

    /// Fee in bps for a trade of `notional` raw quote units
    ///
    /// Always within `[0, cap_bps]`.
    pub fn compute_fee_bps(
        &self,
        conf_bps: u16,
        inventory_deviation_pct: u32,
        notional: u64,
        blocks_since_update: u64,
    ) -> u16 {
        let dynamic = self.decay(self.dynamic_bps(conf_bps, inventory_deviation_pct), blocks_since_update);
        let total = (self.config.base_bps as u128)
            .saturating_add(dynamic)
            .saturating_add(self.size_term_bps(notional));
        self.clamp(total)
    }

    /// Same as `compute_fee_bps` with bundled inputs
    #[inline]
    pub fn fee_for(&self, inputs: &FeeInputs, notional: u64) -> u16 {
        self.compute_fee_bps(
            inputs.conf_bps,
            inputs.inventory_deviation_pct,
            notional,
            inputs.blocks_since_update,
        )
    }

    /// Undecayed alpha/beta component
    pub fn dynamic_bps(&self, conf_bps: u16, inventory_deviation_pct: u32) -> u128 {
        let conf_term = conf_bps as u128 * self.config.alpha_conf_numerator as u128
            / self.config.alpha_conf_denominator.max(1) as u128;
        let inv_term = inventory_deviation_pct as u128 * self.config.beta_inv_dev_numerator as u128
            / self.config.beta_inv_dev_denominator.max(1) as u128;
        conf_term + inv_term
    }

    /// `dynamic * (1 - decay_pct / 100) ^ blocks`, rounded down
    pub fn decay(&self, dynamic: u128, blocks: u64) -> u128 {
        let pct = self.config.decay_pct_per_block.min(100) as u128;
        if blocks == 0 || pct == 0 || dynamic == 0 {
            return dynamic;
        }
        if pct == 100 {
            return 0;
        }

        // Exponentiation by squaring on a 1e12 fixed-point factor
        let mut factor = DECAY_SCALE;
        let mut base = (100 - pct) * DECAY_SCALE / 100;
        let mut remaining = blocks;
        while remaining > 0 && factor > 0 {
            if remaining & 1 == 1 {
                factor = factor * base / DECAY_SCALE;
            }
            base = base * base / DECAY_SCALE;
            remaining >>= 1;
        }

        dynamic.saturating_mul(factor) / DECAY_SCALE
    }

    /// `min(gamma_lin * units + gamma_quad * units^2, size_fee_cap)`
    pub fn size_term_bps(&self, notional: u64) -> u128 {
        let cap = self.config.size_fee_cap_bps as u128;
        let units = (notional / self.config.size_unit_quote.max(1)) as u128;

        let linear = units.checked_mul(self.config.gamma_size_lin as u128);
        let quadratic = units
            .checked_mul(units)
            .and_then(|sq| sq.checked_mul(self.config.gamma_size_quad as u128));

        // An overflowing term is above any cap
        match (linear, quadratic) {
            (Some(l), Some(q)) => l.checked_add(q).map_or(cap, |sum| sum.min(cap)),
            _ => cap,
        }
    }

    /// Apply the zone adjustment on top of a computed fee
    ///
    /// Soft adds the haircut; AOMQ raises the fee to the emergency floor.
    /// The result stays within `cap_bps`.
    pub fn apply_zone(&self, fee_bps: u16, adjustment: ZoneAdjustment) -> u16 {
        match adjustment {
            ZoneAdjustment::None => self.clamp(fee_bps as u128),
            ZoneAdjustment::Haircut { bps } => self.clamp(fee_bps as u128 + bps as u128),
            ZoneAdjustment::Aomq {
                emergency_fee_bps, ..
            } => self.clamp(fee_bps.max(emergency_fee_bps) as u128),
        }
    }

    /// Fee ladder over `notionals`
    pub fn ladder(
        &self,
        inputs: &FeeInputs,
        notionals: &[u64],
        adjustment: ZoneAdjustment,
    ) -> Vec<LadderRung> {
        notionals
            .iter()
            .map(|&notional| LadderRung {
                notional,
                fee_bps: self.apply_zone(self.fee_for(inputs, notional), adjustment),
            })
            .collect()
    }

    #[inline(always)]
    fn clamp(&self, fee: u128) -> u16 {
        fee.min(self.config.cap_bps as u128) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FeeConfig {
        FeeConfig::default()
    }

    #[test]
    fn test_base_fee_when_calm() {
        let config = config();
        let curve = FeeCurve::new(&config);
        // conf 10 * 1/20 rounds to zero, no deviation, sub-unit size
        assert_eq!(curve.compute_fee_bps(10, 0, 500_000_000, 0), 30);
    }

    #[test]
    fn test_conf_and_inventory_terms() {
        let config = config();
        let curve = FeeCurve::new(&config);
        // conf 40 / 20 = 2, deviation 800 / 10 = 80
        assert_eq!(curve.dynamic_bps(40, 800), 82);
        assert_eq!(curve.compute_fee_bps(40, 800, 0, 0), 30 + 82);
    }

    #[test]
    fn test_size_term_and_cap() {
        let config = config();
        let curve = FeeCurve::new(&config);
        // 3 units: 2*3 + 1*9 = 15
        assert_eq!(curve.size_term_bps(3_000_000_000), 15);
        // 10 units: 20 + 100 = 120, capped at 50
        assert_eq!(curve.size_term_bps(10_000_000_000), 50);
        // Huge notional does not overflow
        assert_eq!(curve.size_term_bps(u64::MAX), 50);
    }

    #[test]
    fn test_decay_per_block() {
        let config = config(); // 5% per block
        let curve = FeeCurve::new(&config);
        assert_eq!(curve.decay(100, 0), 100);
        assert_eq!(curve.decay(100, 1), 95);
        // 0.95^2 = 0.9025
        assert_eq!(curve.decay(1_000, 2), 902);
        // Long idle periods cool to zero
        assert_eq!(curve.decay(1_000, 10_000), 0);
        assert_eq!(curve.decay(1_000, u64::MAX), 0);
    }

    #[test]
    fn test_decay_edges() {
        let mut config = config();
        config.decay_pct_per_block = 0;
        assert_eq!(FeeCurve::new(&config).decay(77, 1_000), 77);
        config.decay_pct_per_block = 100;
        assert_eq!(FeeCurve::new(&config).decay(77, 1), 0);
    }

    #[test]
    fn test_decay_only_touches_dynamic_part() {
        let config = config();
        let curve = FeeCurve::new(&config);
        let fresh = curve.compute_fee_bps(40, 800, 3_000_000_000, 0);
        let cooled = curve.compute_fee_bps(40, 800, 3_000_000_000, 1_000);
        assert_eq!(fresh, 30 + 82 + 15);
        assert_eq!(cooled, 30 + 15);
    }

    #[test]
    fn test_fee_clamped_to_cap() {
        let config = config();
        let curve = FeeCurve::new(&config);
        assert_eq!(curve.compute_fee_bps(u16::MAX, u32::MAX, u64::MAX, 0), 500);
    }

    #[test]
    fn test_apply_zone() {
        let config = config();
        let curve = FeeCurve::new(&config);
        assert_eq!(curve.apply_zone(30, ZoneAdjustment::None), 30);
        assert_eq!(curve.apply_zone(30, ZoneAdjustment::Haircut { bps: 20 }), 50);
        assert_eq!(curve.apply_zone(490, ZoneAdjustment::Haircut { bps: 20 }), 500);

        let aomq = ZoneAdjustment::Aomq {
            emergency_fee_bps: 150,
            max_size_bps: 2_500,
        };
        assert_eq!(curve.apply_zone(30, aomq), 150);
        assert_eq!(curve.apply_zone(200, aomq), 200);
    }

    #[test]
    fn test_ladder_is_non_decreasing_in_size() {
        let config = config();
        let curve = FeeCurve::new(&config);
        let inputs = FeeInputs {
            conf_bps: 20,
            inventory_deviation_pct: 100,
            blocks_since_update: 0,
        };
        let notionals = [1_000_000_000, 2_000_000_000, 5_000_000_000, 20_000_000_000];
        let ladder = curve.ladder(&inputs, &notionals, ZoneAdjustment::None);
        assert_eq!(ladder.len(), 4);
        assert_eq!(ladder[0].notional, 1_000_000_000);
        assert!(ladder.windows(2).all(|w| w[0].fee_bps <= w[1].fee_bps));
    }
}
