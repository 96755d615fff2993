//! Oracle read types
//!
//! One `OracleSnapshot` is captured per quote or swap and never outlives it.
//! All reads are Copy so they can be passed around without allocation.

use serde::{Deserialize, Serialize};

use super::Price;

/// Mid price read with its age (primary mid or EMA fallback)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MidRead {
    pub mid: Price,
    pub age_sec: u64,
    pub success: bool,
}

impl MidRead {
    #[inline(always)]
    pub const fn new(mid: Price, age_sec: u64) -> Self {
        Self {
            mid,
            age_sec,
            success: true,
        }
    }

    /// A failed read
    #[inline(always)]
    pub const fn failed() -> Self {
        Self {
            mid: Price::ZERO,
            age_sec: 0,
            success: false,
        }
    }

    /// Successful, non-zero and no older than `max_age_sec`
    #[inline]
    pub fn is_usable(&self, max_age_sec: u64) -> bool {
        self.success && self.mid.is_positive() && self.age_sec <= max_age_sec
    }
}

/// Best bid/ask read from the primary feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BidAskRead {
    pub bid: Price,
    pub ask: Price,
    /// Spread as reported by the feed (informational, recomputed locally)
    #[serde(default)]
    pub spread_bps: u16,
    pub success: bool,
}

impl BidAskRead {
    #[inline(always)]
    pub const fn new(bid: Price, ask: Price) -> Self {
        Self {
            bid,
            ask,
            spread_bps: 0,
            success: true,
        }
    }

    #[inline(always)]
    pub const fn failed() -> Self {
        Self {
            bid: Price::ZERO,
            ask: Price::ZERO,
            spread_bps: 0,
            success: false,
        }
    }

    /// Read succeeded, bid is positive and the book is not crossed
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.success && self.bid.is_positive() && self.ask > self.bid
    }
}

/// Secondary feed read, already combined into a pair price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PairRead {
    pub mid: Price,
    pub conf_bps: u16,
    pub age_sec: u64,
    pub success: bool,
}

impl PairRead {
    #[inline(always)]
    pub const fn new(mid: Price, conf_bps: u16, age_sec: u64) -> Self {
        Self {
            mid,
            conf_bps,
            age_sec,
            success: true,
        }
    }

    #[inline(always)]
    pub const fn failed() -> Self {
        Self {
            mid: Price::ZERO,
            conf_bps: 0,
            age_sec: 0,
            success: false,
        }
    }
}

/// Raw oracle payload for a single quote or swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OracleSnapshot {
    pub primary: MidRead,
    pub bid_ask: BidAskRead,
    pub ema: MidRead,
    pub secondary: PairRead,
}

/// Oracle strictness requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleMode {
    /// Loose confidence cap; hard divergence degrades to AOMQ when enabled
    #[default]
    Spot,
    /// Tight confidence cap; hard divergence rejects
    Strict,
}

/// Which asset the caller is selling to the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapDirection {
    /// Caller sells base, receives quote
    BaseIn,
    /// Caller sells quote, receives base
    QuoteIn,
}

impl SwapDirection {
    #[inline(always)]
    pub const fn is_base_in(&self) -> bool {
        matches!(self, Self::BaseIn)
    }
}

/// Chain time as seen by one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Clock {
    pub now_sec: u64,
    pub block: u64,
}

impl Clock {
    #[inline(always)]
    pub const fn new(now_sec: u64, block: u64) -> Self {
        Self { now_sec, block }
    }
}
