//! Preview cache
//!
//! Holds the last computed fee ladder so off-path consumers can read fees
//! without resolving the oracle themselves. A snapshot older than the oracle
//! `max_age_sec` is stale.

use serde::{Deserialize, Serialize};

use super::fee_curve::{FeeCurve, FeeInputs, LadderRung};
use super::oracle::ZoneAdjustment;
use crate::core::{DivergenceZone, OracleMode, Price};
use crate::infrastructure::config::PreviewConfig;
use crate::{AmmError, Result};

/// Cached fee ladder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSnapshot {
    pub timestamp: u64,
    pub mid: Price,
    pub mode: OracleMode,
    /// Effective zone the ladder was priced under
    pub zone: DivergenceZone,
    pub ladder: Vec<LadderRung>,
}

/// Ladder handed to a reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewLadder {
    pub snapshot: PreviewSnapshot,
    pub age_sec: u64,
    /// Only ever true when stale reads are tolerated
    pub stale: bool,
}

/// TTL-bound fee ladder cache
#[derive(Debug, Clone)]
pub struct PreviewCache {
    config: PreviewConfig,
    max_age_sec: u64,
    snapshot: Option<PreviewSnapshot>,
}

impl PreviewCache {
    pub fn new(config: PreviewConfig, max_age_sec: u64) -> Self {
        Self {
            config,
            max_age_sec,
            snapshot: None,
        }
    }

    /// Swap in new settings; the cached ladder was priced under the old ones
    pub fn reconfigure(&mut self, config: PreviewConfig, max_age_sec: u64) {
        self.config = config;
        self.max_age_sec = max_age_sec;
        self.snapshot = None;
    }

    /// Recompute the ladder
    ///
    /// Returns `false` without touching the cache when the last refresh is
    /// younger than `snapshot_cooldown_sec`.
    #[allow(clippy::too_many_arguments)]
    pub fn refresh(
        &mut self,
        now_sec: u64,
        mode: OracleMode,
        mid: Price,
        zone: DivergenceZone,
        inputs: &FeeInputs,
        curve: &FeeCurve<'_>,
        adjustment: ZoneAdjustment,
    ) -> bool {
        if let Some(snapshot) = &self.snapshot {
            if now_sec.saturating_sub(snapshot.timestamp) < self.config.snapshot_cooldown_sec {
                return false;
            }
        }

        self.snapshot = Some(PreviewSnapshot {
            timestamp: now_sec,
            mid,
            mode,
            zone,
            ladder: curve.ladder(inputs, &self.config.ladder_notionals, adjustment),
        });
        true
    }

    /// Current ladder
    ///
    /// # Errors
    /// `StalePreview` when nothing is cached, or when the snapshot is older
    /// than `max_age_sec` and stale reads are not tolerated.
    pub fn get_ladder(&self, now_sec: u64) -> Result<PreviewLadder> {
        let Some(snapshot) = &self.snapshot else {
            return Err(AmmError::StalePreview {
                age_sec: u64::MAX,
                max_age_sec: self.max_age_sec,
            });
        };

        let age_sec = now_sec.saturating_sub(snapshot.timestamp);
        let stale = age_sec > self.max_age_sec;
        if stale && !self.config.tolerate_stale {
            return Err(AmmError::StalePreview {
                age_sec,
                max_age_sec: self.max_age_sec,
            });
        }

        Ok(PreviewLadder {
            snapshot: snapshot.clone(),
            age_sec,
            stale,
        })
    }

    /// Drop the cached ladder
    #[inline]
    pub fn invalidate(&mut self) {
        self.snapshot = None;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.snapshot.is_none()
    }
}
