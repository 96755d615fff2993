//! Oracle reconciliation
//!
//! Resolves the primary mid (or its EMA fallback), the primary bid/ask and the
//! secondary pair read into a single `ResolvedOracle`, classifying the
//! primary/secondary divergence into Accept/Soft/Hard.
//!
//! Pure: reads the snapshot and config, never the pool. Hysteresis is applied
//! by the caller through `SoftDivergenceState`.

use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::core::math::{clamp_bps_u16, ratio_bps, BPS_DENOMINATOR};
use crate::core::{DivergenceZone, OracleMode, OracleSnapshot, PairRead, Price};
use crate::infrastructure::config::{AomqConfig, OracleConfig};
use crate::{log_oracle, AmmError, Result};

/// Usable oracle price for one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleData {
    pub mid: Price,
    /// Equal to `mid` when the bid/ask read was unusable
    pub bid: Price,
    pub ask: Price,
    pub spread_bps: u16,
    /// Age of the mid actually used
    pub age_sec: u64,
    pub is_valid: bool,
    pub used_fallback: bool,
}

/// Reconciler output: usable price plus divergence classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOracle {
    pub data: OracleData,
    /// `u16::MAX` when the secondary could not be evaluated
    pub divergence_bps: u16,
    /// Secondary confidence; zero when the secondary was unusable
    pub conf_bps: u16,
    /// Raw zone of this read, before hysteresis
    pub zone: DivergenceZone,
}

/// Pricing adjustment derived from the effective zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneAdjustment {
    None,
    /// Soft divergence: bps added to the fee
    Haircut { bps: u16 },
    /// Hard divergence under AOMQ: fee floor plus size clamp
    Aomq {
        emergency_fee_bps: u16,
        max_size_bps: u16,
    },
}

impl ZoneAdjustment {
    #[inline(always)]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Aomq { .. })
    }
}

/// Spread in bps: `(ask - bid) * 10_000 / mid`, truncated
///
/// Zero for a crossed/locked book, a zero bid or a zero mid.
#[inline]
pub fn compute_spread_bps(bid: Price, ask: Price, mid: Price) -> u16 {
    if !bid.is_positive() || ask <= bid || mid.is_zero() {
        return 0;
    }
    let width = ask.abs_diff(bid).as_raw() as u128;
    ratio_bps(width, mid.as_raw() as u128)
        .map(clamp_bps_u16)
        .unwrap_or(0)
}

/// Divergence in bps between two mids: `|a - b| * 10_000 / min(a, b)`
///
/// Symmetric in its arguments. A zero mid yields `u16::MAX`, meaning
/// "cannot evaluate" rather than "no divergence".
#[inline]
pub fn compute_divergence_bps(a: Price, b: Price) -> u16 {
    if a.is_zero() || b.is_zero() {
        return u16::MAX;
    }
    let diff = a.abs_diff(b).as_raw() as u128;
    let base = a.min(b).as_raw() as u128;
    ratio_bps(diff, base).map(clamp_bps_u16).unwrap_or(u16::MAX)
}

/// Single classification function for divergence zones
#[inline]
pub fn classify(divergence_bps: u16, config: &OracleConfig) -> DivergenceZone {
    if divergence_bps <= config.divergence_accept_bps {
        DivergenceZone::Accept
    } else if divergence_bps <= config.divergence_soft_bps {
        DivergenceZone::Soft
    } else {
        DivergenceZone::Hard
    }
}

/// Soft-zone haircut: `haircut_min + slope * (divergence - accept) / 10_000`
#[inline]
pub fn haircut_bps(divergence_bps: u16, config: &OracleConfig) -> u16 {
    let excess = divergence_bps.saturating_sub(config.divergence_accept_bps) as u64;
    let slope = excess * config.haircut_slope_bps as u64 / BPS_DENOMINATOR;
    clamp_bps_u16(config.haircut_min_bps as u128 + slope as u128)
}

/// Adjustment for an effective zone; hysteresis must already be applied
pub fn zone_adjustment(
    zone: DivergenceZone,
    divergence_bps: u16,
    config: &OracleConfig,
    aomq: &AomqConfig,
) -> ZoneAdjustment {
    match zone {
        DivergenceZone::Accept => ZoneAdjustment::None,
        DivergenceZone::Soft => ZoneAdjustment::Haircut {
            bps: haircut_bps(divergence_bps, config),
        },
        DivergenceZone::Hard => ZoneAdjustment::Aomq {
            emergency_fee_bps: aomq.emergency_fee_bps,
            max_size_bps: aomq.max_size_bps,
        },
    }
}

/// Oracle reconciler
pub struct OracleReconciler;

impl OracleReconciler {
    /// Resolve one snapshot under `mode`
    ///
    /// # Errors
    /// - `OracleUnavailable` if neither the primary mid nor an allowed EMA
    ///   fallback is usable
    /// - `OracleDivergence` for a Hard read that cannot be served degraded:
    ///   `Strict` mode, AOMQ disabled, or a measured divergence beyond
    ///   `divergence_hard_bps`. An unusable secondary in `Spot` mode with
    ///   AOMQ enabled is served degraded.
    pub fn resolve(
        snapshot: &OracleSnapshot,
        mode: OracleMode,
        config: &OracleConfig,
        aomq: &AomqConfig,
    ) -> Result<ResolvedOracle> {
        let (mid_read, used_fallback) = if snapshot.primary.is_usable(config.max_age_sec) {
            (snapshot.primary, false)
        } else if config.allow_ema_fallback && snapshot.ema.is_usable(config.max_age_sec) {
            log_oracle!(
                Level::WARN,
                primary_age = snapshot.primary.age_sec,
                primary_ok = snapshot.primary.success,
                "primary mid unusable, using EMA fallback"
            );
            (snapshot.ema, true)
        } else {
            log_oracle!(Level::WARN, "no usable primary or fallback mid");
            return Err(AmmError::OracleUnavailable);
        };
        let mid = mid_read.mid;

        // The bid/ask belongs to the primary read; ignore it when that read was skipped
        let (bid, ask, spread_bps) = if !used_fallback && snapshot.bid_ask.is_valid() {
            let bid_ask = snapshot.bid_ask;
            (bid_ask.bid, bid_ask.ask, compute_spread_bps(bid_ask.bid, bid_ask.ask, mid))
        } else {
            (mid, mid, 0)
        };

        let secondary_evaluated = Self::secondary_usable(&snapshot.secondary, mode, config);
        let (divergence_bps, conf_bps) = if secondary_evaluated {
            (
                compute_divergence_bps(mid, snapshot.secondary.mid),
                snapshot.secondary.conf_bps,
            )
        } else {
            (u16::MAX, 0)
        };

        let zone = classify(divergence_bps, config);

        if zone == DivergenceZone::Hard {
            // Oracle stress (no usable secondary) has no measured divergence to bound
            let degradable = mode == OracleMode::Spot
                && aomq.enabled
                && (!secondary_evaluated || divergence_bps <= config.divergence_hard_bps);
            if !degradable {
                log_oracle!(
                    Level::WARN,
                    divergence_bps,
                    secondary_evaluated,
                    ?mode,
                    "hard divergence, rejecting"
                );
                return Err(AmmError::OracleDivergence { divergence_bps });
            }
            log_oracle!(
                Level::WARN,
                divergence_bps,
                secondary_evaluated,
                "hard divergence, quoting degraded"
            );
        }

        log_oracle!(
            Level::DEBUG,
            mid = %mid,
            spread_bps,
            divergence_bps,
            conf_bps,
            ?zone,
            used_fallback,
            "oracle resolved"
        );

        Ok(ResolvedOracle {
            data: OracleData {
                mid,
                bid,
                ask,
                spread_bps,
                age_sec: mid_read.age_sec,
                is_valid: true,
                used_fallback,
            },
            divergence_bps,
            conf_bps,
            zone,
        })
    }

    /// Secondary read is fresh, non-zero and within the mode's confidence cap
    fn secondary_usable(read: &PairRead, mode: OracleMode, config: &OracleConfig) -> bool {
        let conf_cap = match mode {
            OracleMode::Spot => config.conf_cap_bps_spot,
            OracleMode::Strict => config.conf_cap_bps_strict,
        };
        read.success
            && read.mid.is_positive()
            && read.age_sec <= config.stall_window_sec
            && read.conf_bps <= conf_cap
    }
}
