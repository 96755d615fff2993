//! Pool state and the operation guard
//!
//! `PoolState` is the single mutable object of the engine. It is only ever
//! touched through `&mut`, and every mutating operation enters through
//! `PoolState::begin_operation`, which provides the reentrancy check and
//! all-or-nothing rollback.

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use super::math::MathError;
use super::{Price, SwapDirection};
use crate::{AmmError, Result};

/// Divergence classification between the primary and secondary mids
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceZone {
    Accept,
    Soft,
    Hard,
}

/// Soft-divergence hysteresis tracker
///
/// Entered on any Soft/Hard read; cleared only after enough consecutive
/// Accept reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SoftDivergenceState {
    pub active: bool,
    pub last_delta_bps: u16,
    pub healthy_streak: u8,
}

impl SoftDivergenceState {
    /// State after observing one classified read
    pub fn observe(self, zone: DivergenceZone, delta_bps: u16, healthy_reads_required: u8) -> Self {
        match zone {
            DivergenceZone::Soft | DivergenceZone::Hard => Self {
                active: true,
                last_delta_bps: delta_bps,
                healthy_streak: 0,
            },
            DivergenceZone::Accept if self.active => {
                let streak = self.healthy_streak.saturating_add(1);
                if streak >= healthy_reads_required {
                    Self {
                        active: false,
                        last_delta_bps: delta_bps,
                        healthy_streak: 0,
                    }
                } else {
                    Self {
                        active: true,
                        last_delta_bps: delta_bps,
                        healthy_streak: streak,
                    }
                }
            }
            DivergenceZone::Accept => Self {
                last_delta_bps: delta_bps,
                ..self
            },
        }
    }

    /// Zone the pricing path should act on
    ///
    /// An Accept read does not lift soft treatment until the state clears.
    #[inline]
    pub fn effective_zone(&self, raw: DivergenceZone) -> DivergenceZone {
        if raw == DivergenceZone::Accept && self.active {
            DivergenceZone::Soft
        } else {
            raw
        }
    }
}

/// Recenter controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecenterState {
    #[default]
    Stable,
    CooldownPending,
}

/// Singleton two-asset pool state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolState {
    pub reserve_base: u64,
    pub reserve_quote: u64,

    /// Target base inventory anchor. Mutated only by the recenter controller.
    pub target_base_xstar: u64,
    pub last_rebalance_price: Price,
    pub last_rebalance_timestamp: u64,

    pub soft_divergence: SoftDivergenceState,
    pub recenter_state: RecenterState,

    /// Fee portion of applied input, in base units
    pub cumulative_fees_base: u64,
    /// Fee portion of applied input, in quote units
    pub cumulative_fees_quote: u64,
    /// Block of the last completed swap; fee decay counts from here
    pub last_fee_update_block: u64,

    pub paused: bool,

    #[serde(skip)]
    in_progress: bool,
}

impl PoolState {
    /// Fresh pool anchored at its current base reserve
    pub fn new(reserve_base: u64, reserve_quote: u64) -> Self {
        Self {
            reserve_base,
            reserve_quote,
            target_base_xstar: reserve_base,
            ..Self::default()
        }
    }

    /// Reserve paid out for a swap in `direction`
    #[inline]
    pub fn output_reserve(&self, direction: SwapDirection) -> u64 {
        match direction {
            SwapDirection::BaseIn => self.reserve_quote,
            SwapDirection::QuoteIn => self.reserve_base,
        }
    }

    /// True while a mutating operation is executing
    #[inline(always)]
    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    /// Enter a mutating operation
    ///
    /// # Errors
    /// `AmmError::Reentrancy` if another operation on this state has not
    /// finished yet (e.g. a settlement callback calling back in).
    pub fn begin_operation(&mut self) -> Result<OperationGuard<'_>> {
        if self.in_progress {
            return Err(AmmError::Reentrancy);
        }
        let entry = self.clone();
        self.in_progress = true;
        Ok(OperationGuard {
            pool: self,
            entry,
            committed: false,
        })
    }

    /// Book a completed fill against the reserves
    pub(crate) fn apply_fill(
        &mut self,
        direction: SwapDirection,
        amount_in: u64,
        amount_out: u64,
        fee_amount: u64,
    ) -> std::result::Result<(), MathError> {
        match direction {
            SwapDirection::BaseIn => {
                self.reserve_base = self.reserve_base.checked_add(amount_in).ok_or(MathError::Overflow)?;
                self.reserve_quote = self.reserve_quote.checked_sub(amount_out).ok_or(MathError::Overflow)?;
                self.cumulative_fees_base = self
                    .cumulative_fees_base
                    .checked_add(fee_amount)
                    .ok_or(MathError::Overflow)?;
            }
            SwapDirection::QuoteIn => {
                self.reserve_quote = self.reserve_quote.checked_add(amount_in).ok_or(MathError::Overflow)?;
                self.reserve_base = self.reserve_base.checked_sub(amount_out).ok_or(MathError::Overflow)?;
                self.cumulative_fees_quote = self
                    .cumulative_fees_quote
                    .checked_add(fee_amount)
                    .ok_or(MathError::Overflow)?;
            }
        }
        Ok(())
    }
}

/// Exclusive handle on a `PoolState` for the duration of one operation
///
/// Dropping the guard without `commit` restores the state captured on
/// entry. The in-progress flag is cleared on every exit path.
pub struct OperationGuard<'a> {
    pool: &'a mut PoolState,
    entry: PoolState,
    committed: bool,
}

impl OperationGuard<'_> {
    /// Keep the mutations made through this guard
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Deref for OperationGuard<'_> {
    type Target = PoolState;

    fn deref(&self) -> &PoolState {
        self.pool
    }
}

impl DerefMut for OperationGuard<'_> {
    fn deref_mut(&mut self) -> &mut PoolState {
        self.pool
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            *self.pool = std::mem::take(&mut self.entry);
        }
        self.pool.in_progress = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hysteresis_enters_on_soft_and_hard() {
        let state = SoftDivergenceState::default();
        let soft = state.observe(DivergenceZone::Soft, 80, 3);
        assert!(soft.active);
        assert_eq!(soft.last_delta_bps, 80);

        let hard = state.observe(DivergenceZone::Hard, 400, 3);
        assert!(hard.active);
        assert_eq!(hard.healthy_streak, 0);
    }

    #[test]
    fn test_hysteresis_clears_after_streak() {
        let mut state = SoftDivergenceState::default().observe(DivergenceZone::Soft, 80, 3);

        state = state.observe(DivergenceZone::Accept, 10, 3);
        assert!(state.active);
        assert_eq!(state.healthy_streak, 1);
        assert_eq!(state.effective_zone(DivergenceZone::Accept), DivergenceZone::Soft);

        state = state.observe(DivergenceZone::Accept, 10, 3);
        assert!(state.active);
        assert_eq!(state.healthy_streak, 2);

        state = state.observe(DivergenceZone::Accept, 10, 3);
        assert!(!state.active);
        assert_eq!(state.healthy_streak, 0);
        assert_eq!(state.effective_zone(DivergenceZone::Accept), DivergenceZone::Accept);
    }

    #[test]
    fn test_hysteresis_streak_resets_on_non_accept() {
        let mut state = SoftDivergenceState::default().observe(DivergenceZone::Soft, 80, 3);
        state = state.observe(DivergenceZone::Accept, 10, 3);
        state = state.observe(DivergenceZone::Accept, 10, 3);
        state = state.observe(DivergenceZone::Soft, 60, 3);
        assert!(state.active);
        assert_eq!(state.healthy_streak, 0);
        assert_eq!(state.last_delta_bps, 60);
    }

    #[test]
    fn test_guard_rolls_back_without_commit() {
        let mut pool = PoolState::new(1_000, 2_000);
        {
            let mut op = pool.begin_operation().unwrap();
            op.reserve_base = 0;
            op.paused = true;
        }
        assert_eq!(pool.reserve_base, 1_000);
        assert!(!pool.paused);
        assert!(!pool.is_in_progress());
    }

    #[test]
    fn test_guard_commit_keeps_changes() {
        let mut pool = PoolState::new(1_000, 2_000);
        let mut op = pool.begin_operation().unwrap();
        op.reserve_base = 1_500;
        assert!(op.is_in_progress());
        op.commit();
        assert_eq!(pool.reserve_base, 1_500);
        assert!(!pool.is_in_progress());
    }

    #[test]
    fn test_guard_rejects_reentry() {
        let mut pool = PoolState::new(1_000, 2_000);
        let mut op = pool.begin_operation().unwrap();
        assert!(matches!(op.begin_operation(), Err(AmmError::Reentrancy)));
        drop(op);
        assert!(pool.begin_operation().is_ok());
    }

    #[test]
    fn test_apply_fill_checks_underflow() {
        let mut pool = PoolState::new(1_000, 2_000);
        pool.apply_fill(SwapDirection::BaseIn, 100, 190, 1).unwrap();
        assert_eq!((pool.reserve_base, pool.reserve_quote), (1_100, 1_810));
        assert_eq!(pool.cumulative_fees_base, 1);
        assert_eq!(
            pool.apply_fill(SwapDirection::QuoteIn, 10, 5_000, 0),
            Err(MathError::Overflow)
        );
    }
}
