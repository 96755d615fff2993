//! Recenter controller
//!
//! Moves `target_base_xstar` when base inventory has drifted from the target
//! (or the mid has drifted from the last rebalance price), at most once per
//! cooldown window. This is the only code that writes the target.

use serde::{Deserialize, Serialize};
use tracing::Level;

use super::inventory::Conversion;
use crate::core::math::{ratio_bps, MathError};
use crate::core::{PoolState, Price, RecenterState, SwapDirection};
use crate::infrastructure::config::{InventoryConfig, RecenterPolicy};
use crate::{log_recenter, Result};

/// What one evaluation did to the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecenterOutcome {
    /// Below every trigger
    Unchanged,
    /// Target was zero and has been set to the base reserve
    Initialized { target: u64 },
    Recentered { previous_target: u64, target: u64 },
    /// Triggered inside the cooldown window; nothing mutated
    CooldownPending { remaining_sec: u64 },
}

/// Inventory deviation from target in hundredths of a percent
///
/// `|reserve_base - target| * 10_000 / target`, saturating at `u32::MAX`.
/// Zero target yields zero (nothing to deviate from yet).
#[inline]
pub fn deviation_pct(reserve_base: u64, target: u64) -> u32 {
    if target == 0 {
        return 0;
    }
    let diff = reserve_base.abs_diff(target) as u128;
    ratio_bps(diff, target as u128)
        .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
        .unwrap_or(u32::MAX)
}

/// Mid drift from the last rebalance price in bps; zero without an anchor price
#[inline]
pub fn price_drift_bps(mid: Price, last_rebalance_price: Price) -> u32 {
    if last_rebalance_price.is_zero() {
        return 0;
    }
    let diff = mid.abs_diff(last_rebalance_price).as_raw() as u128;
    ratio_bps(diff, last_rebalance_price.as_raw() as u128)
        .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
        .unwrap_or(u32::MAX)
}

/// Recenter controller over a borrowed inventory config
#[derive(Debug, Clone, Copy)]
pub struct RecenterController<'a> {
    config: &'a InventoryConfig,
}

impl<'a> RecenterController<'a> {
    pub fn new(config: &'a InventoryConfig) -> Self {
        Self { config }
    }

    /// Deviation or price drift is at or above its threshold
    pub fn is_triggered(&self, pool: &PoolState, mid: Price) -> bool {
        if deviation_pct(pool.reserve_base, pool.target_base_xstar) >= self.config.recenter_threshold_pct {
            return true;
        }
        self.config.recenter_price_drift_bps > 0
            && price_drift_bps(mid, pool.last_rebalance_price) >= self.config.recenter_price_drift_bps
    }

    /// Evaluate after a swap (or on demand) and recenter if allowed
    pub fn evaluate(&self, pool: &mut PoolState, mid: Price, now_sec: u64) -> Result<RecenterOutcome> {
        if pool.target_base_xstar == 0 {
            pool.target_base_xstar = pool.reserve_base;
            pool.recenter_state = RecenterState::Stable;
            log_recenter!(Level::INFO, target = pool.reserve_base, "target initialized");
            return Ok(RecenterOutcome::Initialized {
                target: pool.reserve_base,
            });
        }

        if !self.is_triggered(pool, mid) {
            pool.recenter_state = RecenterState::Stable;
            return Ok(RecenterOutcome::Unchanged);
        }

        let elapsed = now_sec.saturating_sub(pool.last_rebalance_timestamp);
        if elapsed < self.config.recenter_cooldown_sec {
            pool.recenter_state = RecenterState::CooldownPending;
            let remaining_sec = self.config.recenter_cooldown_sec - elapsed;
            log_recenter!(Level::DEBUG, remaining_sec, "recenter triggered inside cooldown");
            return Ok(RecenterOutcome::CooldownPending { remaining_sec });
        }

        self.recenter_now(pool, mid, now_sec)
    }

    /// Recenter unconditionally (governance path); ignores thresholds and cooldown
    pub fn recenter_now(&self, pool: &mut PoolState, mid: Price, now_sec: u64) -> Result<RecenterOutcome> {
        let target = self.new_target(pool, mid)?;
        let previous_target = pool.target_base_xstar;

        pool.target_base_xstar = target;
        pool.last_rebalance_price = mid;
        pool.last_rebalance_timestamp = now_sec;
        pool.recenter_state = RecenterState::Stable;

        log_recenter!(
            Level::INFO,
            previous_target,
            target,
            mid = %mid,
            policy = ?self.config.recenter_policy,
            "recentered"
        );

        Ok(RecenterOutcome::Recentered {
            previous_target,
            target,
        })
    }

    fn new_target(&self, pool: &PoolState, mid: Price) -> Result<u64> {
        match self.config.recenter_policy {
            RecenterPolicy::ReserveAnchor => Ok(pool.reserve_base),
            RecenterPolicy::PriceAnchor => {
                // Half the pool's total value, expressed in base
                let quote_as_base = Conversion::new(
                    SwapDirection::QuoteIn,
                    mid,
                    self.config.base_decimals,
                    self.config.quote_decimals,
                )?
                .amount_out(pool.reserve_quote, 0)?;
                let total = (pool.reserve_base as u128)
                    .checked_add(quote_as_base)
                    .ok_or(MathError::Overflow)?;
                Ok(crate::core::math::to_u64(total / 2)?)
            }
        }
    }
}
