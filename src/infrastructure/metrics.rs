//! Metrics collection for engine monitoring
//!
//! Lock-free counters updated on every quote and swap. Snapshots are taken
//! on the cold path (replay summary, operator queries).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::CachePadded;
use serde::Serialize;

use crate::AmmError;

/// Engine metrics collector
///
/// Each counter sits on its own cache line; quotes run under a shared read
/// lock from many threads at once.
pub struct EngineMetrics {
    quotes: CachePadded<AtomicU64>,
    swaps: CachePadded<AtomicU64>,
    partial_fills: CachePadded<AtomicU64>,
    fallback_uses: CachePadded<AtomicU64>,
    degraded_fills: CachePadded<AtomicU64>,
    recenters: CachePadded<AtomicU64>,
    /// Rejects caused by the oracle (unavailable or divergence)
    oracle_rejects: CachePadded<AtomicU64>,
    liquidity_rejects: CachePadded<AtomicU64>,
    stale_previews: CachePadded<AtomicU64>,
    /// Preview refreshes that failed to resolve the oracle
    preview_failures: CachePadded<AtomicU64>,
    /// Everything else: math, reentrancy, pause, custody, auth, input
    other_rejects: CachePadded<AtomicU64>,
    start_time: Instant,
}

/// Metrics snapshot for export
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricsSnapshot {
    pub quotes: u64,
    pub swaps: u64,
    pub partial_fills: u64,
    pub fallback_uses: u64,
    pub degraded_fills: u64,
    pub recenters: u64,
    pub oracle_rejects: u64,
    pub liquidity_rejects: u64,
    pub stale_previews: u64,
    pub preview_failures: u64,
    pub other_rejects: u64,
    /// Rejects over all quote and swap attempts
    pub reject_rate: f64,
    pub uptime_seconds: u64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            quotes: CachePadded::new(AtomicU64::new(0)),
            swaps: CachePadded::new(AtomicU64::new(0)),
            partial_fills: CachePadded::new(AtomicU64::new(0)),
            fallback_uses: CachePadded::new(AtomicU64::new(0)),
            degraded_fills: CachePadded::new(AtomicU64::new(0)),
            recenters: CachePadded::new(AtomicU64::new(0)),
            oracle_rejects: CachePadded::new(AtomicU64::new(0)),
            liquidity_rejects: CachePadded::new(AtomicU64::new(0)),
            stale_previews: CachePadded::new(AtomicU64::new(0)),
            preview_failures: CachePadded::new(AtomicU64::new(0)),
            other_rejects: CachePadded::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    #[inline]
    pub fn record_quote(&self) {
        self.quotes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed swap and its service flags
    #[inline]
    pub fn record_swap(&self, is_partial: bool, used_fallback: bool, degraded: bool) {
        self.swaps.fetch_add(1, Ordering::Relaxed);
        if is_partial {
            self.partial_fills.fetch_add(1, Ordering::Relaxed);
        }
        if used_fallback {
            self.fallback_uses.fetch_add(1, Ordering::Relaxed);
        }
        if degraded {
            self.degraded_fills.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_recenter(&self) {
        self.recenters.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected quote or swap by error kind
    pub fn record_reject(&self, error: &AmmError) {
        let counter = match error {
            AmmError::OracleUnavailable | AmmError::OracleDivergence { .. } => &self.oracle_rejects,
            AmmError::InsufficientLiquidity => &self.liquidity_rejects,
            _ => &self.other_rejects,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed preview read or refresh
    ///
    /// Preview upkeep is not a trade attempt and stays out of `reject_rate`.
    pub fn record_preview_failure(&self, error: &AmmError) {
        let counter = match error {
            AmmError::StalePreview { .. } => &self.stale_previews,
            _ => &self.preview_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current snapshot of metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let quotes = self.quotes.load(Ordering::Relaxed);
        let swaps = self.swaps.load(Ordering::Relaxed);
        let oracle_rejects = self.oracle_rejects.load(Ordering::Relaxed);
        let liquidity_rejects = self.liquidity_rejects.load(Ordering::Relaxed);
        let other_rejects = self.other_rejects.load(Ordering::Relaxed);

        let rejects = oracle_rejects + liquidity_rejects + other_rejects;
        let attempts = quotes + swaps + rejects;
        let reject_rate = if attempts > 0 {
            rejects as f64 / attempts as f64
        } else {
            0.0
        };

        MetricsSnapshot {
            quotes,
            swaps,
            partial_fills: self.partial_fills.load(Ordering::Relaxed),
            fallback_uses: self.fallback_uses.load(Ordering::Relaxed),
            degraded_fills: self.degraded_fills.load(Ordering::Relaxed),
            recenters: self.recenters.load(Ordering::Relaxed),
            oracle_rejects,
            liquidity_rejects,
            stale_previews: self.stale_previews.load(Ordering::Relaxed),
            preview_failures: self.preview_failures.load(Ordering::Relaxed),
            other_rejects,
            reject_rate,
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
