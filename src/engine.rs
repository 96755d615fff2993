//! Core Application Engine
//!
//! The swap pipeline as free functions over `PoolState`, plus `AmmEngine`,
//! the shared handle that adds locking, authorization gates, preview upkeep
//! and metrics around them.
//!
//! Mutating functions take `&mut PoolState` and enter through
//! `PoolState::begin_operation`, so a failed operation leaves the state
//! exactly as it found it and a reentrant call is rejected.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::core::{
    Clock, DivergenceZone, OracleMode, OracleSnapshot, PoolState, Price, SoftDivergenceState,
    SwapDirection,
};
use crate::hot_path::oracle::zone_adjustment;
use crate::hot_path::{
    deviation_pct, Conversion, FeeCurve, FeeInputs, Fill, InventoryEngine, OracleReconciler,
    PreviewCache, PreviewLadder, RecenterController, RecenterOutcome, ResolvedOracle,
    ZoneAdjustment,
};
use crate::infrastructure::config::{
    AomqConfig, Config, FeeConfig, InventoryConfig, OracleConfig, PreviewConfig,
};
use crate::infrastructure::metrics::EngineMetrics;
use crate::{log_engine, AmmError, Result};

/// Why a result is not plain normal service; the most severe flag wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    Ok,
    EmaFallback,
    SoftDivergence,
    FloorClamped,
    Degraded,
}

impl ReasonCode {
    fn from_flags(degraded: bool, is_partial: bool, zone: DivergenceZone, used_fallback: bool) -> Self {
        if degraded {
            Self::Degraded
        } else if is_partial {
            Self::FloorClamped
        } else if zone == DivergenceZone::Soft {
            Self::SoftDivergence
        } else if used_fallback {
            Self::EmaFallback
        } else {
            Self::Ok
        }
    }
}

/// Priced trade returned by quotes and swaps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteResult {
    pub amount_out: u64,
    pub mid_used: Price,
    pub fee_bps_used: u16,
    pub applied_amount_in: u64,
    /// Applied input when partially filled, zero otherwise
    pub partial_fill_amount_in: u64,
    pub leftover_amount_in: u64,
    pub is_partial: bool,
    pub used_fallback: bool,
    /// Served under hard divergence (AOMQ)
    pub degraded: bool,
    /// Effective zone after hysteresis
    pub zone: DivergenceZone,
    pub reason: ReasonCode,
}

impl QuoteResult {
    fn new(pricing: &Pricing, fee_bps: u16, fill: &Fill) -> Self {
        let used_fallback = pricing.resolved.data.used_fallback;
        let degraded = pricing.adjustment.is_degraded();
        Self {
            amount_out: fill.amount_out,
            mid_used: pricing.mid(),
            fee_bps_used: fee_bps,
            applied_amount_in: fill.applied_amount_in,
            partial_fill_amount_in: if fill.is_partial {
                fill.applied_amount_in
            } else {
                0
            },
            leftover_amount_in: fill.leftover_amount_in,
            is_partial: fill.is_partial,
            used_fallback,
            degraded,
            zone: pricing.zone,
            reason: ReasonCode::from_flags(degraded, fill.is_partial, pricing.zone, used_fallback),
        }
    }
}

/// Swap intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub direction: SwapDirection,
    pub amount_in: u64,
    #[serde(default)]
    pub mode: OracleMode,
    /// Reject instead of settling for less than this
    #[serde(default)]
    pub min_amount_out: u64,
}

impl SwapRequest {
    pub fn new(direction: SwapDirection, amount_in: u64) -> Self {
        Self {
            direction,
            amount_in,
            mode: OracleMode::default(),
            min_amount_out: 0,
        }
    }

    pub fn with_mode(mut self, mode: OracleMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Transfers custody has to perform for one swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub direction: SwapDirection,
    /// Debited from the caller
    pub amount_in: u64,
    /// Credited to the caller
    pub amount_out: u64,
    /// Never taken from the caller
    pub leftover_amount_in: u64,
}

/// Token custody collaborator
///
/// Called with the reserves already updated and the operation still in
/// progress. Returning an error rolls the whole swap back. Any mutating
/// engine call made with `pool` from inside `settle` fails with
/// `AmmError::Reentrancy`.
pub trait TokenCustody {
    fn settle(&mut self, pool: &mut PoolState, settlement: &Settlement) -> Result<()>;
}

/// Completed swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapReceipt {
    #[serde(flatten)]
    pub quote: QuoteResult,
    pub recenter: RecenterOutcome,
}

/// Oracle, hysteresis and zone outcome shared by every priced operation
#[derive(Debug, Clone, Copy)]
struct Pricing {
    resolved: ResolvedOracle,
    /// Hysteresis after this read; only swaps write it back
    soft_divergence: SoftDivergenceState,
    zone: DivergenceZone,
    adjustment: ZoneAdjustment,
    inputs: FeeInputs,
}

impl Pricing {
    fn resolve(
        pool: &PoolState,
        config: &Config,
        snapshot: &OracleSnapshot,
        mode: OracleMode,
        clock: Clock,
    ) -> Result<Self> {
        let resolved = OracleReconciler::resolve(snapshot, mode, &config.oracle, &config.aomq)?;
        let soft_divergence = pool.soft_divergence.observe(
            resolved.zone,
            resolved.divergence_bps,
            config.oracle.hysteresis_healthy_reads,
        );
        let zone = soft_divergence.effective_zone(resolved.zone);
        Ok(Self {
            resolved,
            soft_divergence,
            zone,
            adjustment: zone_adjustment(zone, resolved.divergence_bps, &config.oracle, &config.aomq),
            inputs: FeeInputs {
                conf_bps: resolved.conf_bps,
                inventory_deviation_pct: deviation_pct(pool.reserve_base, pool.target_base_xstar),
                blocks_since_update: clock.block.saturating_sub(pool.last_fee_update_block),
            },
        })
    }

    #[inline]
    fn mid(&self) -> Price {
        self.resolved.data.mid
    }

    #[inline]
    fn size_cap_bps(&self) -> Option<u16> {
        match self.adjustment {
            ZoneAdjustment::Aomq { max_size_bps, .. } => Some(max_size_bps),
            _ => None,
        }
    }

    fn fee_bps(&self, config: &FeeConfig, notional: u64) -> u16 {
        let curve = FeeCurve::new(config);
        curve.apply_zone(curve.fee_for(&self.inputs, notional), self.adjustment)
    }

    /// Fee and fill for selling `amount_in` in `direction`
    fn fill(
        &self,
        pool: &PoolState,
        config: &Config,
        direction: SwapDirection,
        amount_in: u64,
    ) -> Result<(u16, Fill)> {
        let notional = quote_value(direction.is_base_in(), amount_in, self.mid(), &config.inventory)?;
        let fee_bps = self.fee_bps(&config.fee, notional);
        let fill = InventoryEngine::new(config.inventory.base_decimals, config.inventory.quote_decimals)
            .quote(
                direction,
                amount_in,
                self.mid(),
                fee_bps,
                pool.output_reserve(direction),
                config.inventory.floor_bps,
                self.size_cap_bps(),
            )?;
        Ok((fee_bps, fill))
    }
}

/// `amount` of one asset valued in raw quote units, saturating
///
/// Only feeds the fee curve's size term, where "at least u64::MAX" and the
/// exact value price the same.
fn quote_value(is_base: bool, amount: u64, mid: Price, inventory: &InventoryConfig) -> Result<u64> {
    if !is_base {
        return Ok(amount);
    }
    let conversion = Conversion::new(
        SwapDirection::BaseIn,
        mid,
        inventory.base_decimals,
        inventory.quote_decimals,
    )?;
    Ok(conversion
        .amount_out(amount, 0)
        .map_or(u64::MAX, |value| u64::try_from(value).unwrap_or(u64::MAX)))
}

/// Price a trade without touching the pool
///
/// Hysteresis is evaluated on a copy, so a quote never moves the soft
/// divergence state.
pub fn quote(
    pool: &PoolState,
    config: &Config,
    direction: SwapDirection,
    amount_in: u64,
    mode: OracleMode,
    snapshot: &OracleSnapshot,
    clock: Clock,
) -> Result<QuoteResult> {
    let pricing = Pricing::resolve(pool, config, snapshot, mode, clock)?;
    let (fee_bps, fill) = pricing.fill(pool, config, direction, amount_in)?;
    Ok(QuoteResult::new(&pricing, fee_bps, &fill))
}

/// Input required to receive at least `amount_out`
///
/// Never partial: an output above the tradable inventory is
/// `InsufficientLiquidity`.
pub fn quote_exact_output(
    pool: &PoolState,
    config: &Config,
    direction: SwapDirection,
    amount_out: u64,
    mode: OracleMode,
    snapshot: &OracleSnapshot,
    clock: Clock,
) -> Result<QuoteResult> {
    let pricing = Pricing::resolve(pool, config, snapshot, mode, clock)?;
    // Output asset is quote when base comes in
    let notional = quote_value(!direction.is_base_in(), amount_out, pricing.mid(), &config.inventory)?;
    let fee_bps = pricing.fee_bps(&config.fee, notional);

    let exact = InventoryEngine::new(config.inventory.base_decimals, config.inventory.quote_decimals)
        .quote_exact_output(
            direction,
            amount_out,
            pricing.mid(),
            fee_bps,
            pool.output_reserve(direction),
            config.inventory.floor_bps,
            pricing.size_cap_bps(),
        )?;

    let fill = Fill {
        amount_out: exact.amount_out,
        applied_amount_in: exact.amount_in,
        leftover_amount_in: 0,
        is_partial: false,
        fee_amount: exact.fee_amount,
    };
    Ok(QuoteResult::new(&pricing, fee_bps, &fill))
}

/// Execute a swap against the pool
///
/// Pipeline: oracle, hysteresis, fee, floor-clamped fill, reserve update,
/// custody settlement, recenter. Any error restores the pool to its state
/// on entry.
///
/// # Errors
/// `Reentrancy` if another operation on `pool` is in progress, `Paused`
/// while paused, anything the pricing pipeline or custody returns.
pub fn swap<C: TokenCustody + ?Sized>(
    pool: &mut PoolState,
    config: &Config,
    request: &SwapRequest,
    snapshot: &OracleSnapshot,
    clock: Clock,
    custody: &mut C,
) -> Result<SwapReceipt> {
    let mut op = pool.begin_operation()?;
    if op.paused {
        return Err(AmmError::Paused);
    }

    let pricing = Pricing::resolve(&op, config, snapshot, request.mode, clock)?;
    let (fee_bps, fill) = pricing.fill(&op, config, request.direction, request.amount_in)?;
    if fill.amount_out < request.min_amount_out {
        return Err(AmmError::InvalidAmount(format!(
            "amount_out {} below minimum {}",
            fill.amount_out, request.min_amount_out
        )));
    }

    op.soft_divergence = pricing.soft_divergence;
    op.apply_fill(request.direction, fill.applied_amount_in, fill.amount_out, fill.fee_amount)?;
    op.last_fee_update_block = clock.block;

    let settlement = Settlement {
        direction: request.direction,
        amount_in: fill.applied_amount_in,
        amount_out: fill.amount_out,
        leftover_amount_in: fill.leftover_amount_in,
    };
    custody.settle(&mut op, &settlement)?;

    let recenter = RecenterController::new(&config.inventory).evaluate(&mut op, pricing.mid(), clock.now_sec)?;

    let result = QuoteResult::new(&pricing, fee_bps, &fill);
    op.commit();

    log_engine!(
        Level::DEBUG,
        direction = ?request.direction,
        amount_in = request.amount_in,
        amount_out = result.amount_out,
        fee_bps,
        reason = ?result.reason,
        "swap settled"
    );

    Ok(SwapReceipt {
        quote: result,
        recenter,
    })
}

/// Recenter now, ignoring threshold and cooldown
pub fn manual_recenter(
    pool: &mut PoolState,
    config: &InventoryConfig,
    mid: Price,
    now_sec: u64,
) -> Result<RecenterOutcome> {
    let mut op = pool.begin_operation()?;
    let outcome = RecenterController::new(config).recenter_now(&mut op, mid, now_sec)?;
    op.commit();
    Ok(outcome)
}

/// Governance config change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "section", content = "config", rename_all = "snake_case")]
pub enum ConfigUpdate {
    Oracle(OracleConfig),
    Fee(FeeConfig),
    Inventory(InventoryConfig),
    Aomq(AomqConfig),
    Preview(PreviewConfig),
}

/// Shared engine handle
///
/// Single writer, many readers: quotes and previews take read locks, swaps
/// and governance take the pool write lock. Locks are always taken in the
/// order config, pool, preview.
pub struct AmmEngine {
    config: RwLock<Config>,
    pool: RwLock<PoolState>,
    preview: RwLock<PreviewCache>,
    metrics: Arc<EngineMetrics>,
}

impl AmmEngine {
    /// Create engine over an existing pool state
    pub fn new(config: Config, pool: PoolState) -> Result<Self> {
        config.validate()?;
        let preview = PreviewCache::new(config.preview.clone(), config.oracle.max_age_sec);
        Ok(Self {
            config: RwLock::new(config),
            pool: RwLock::new(pool),
            preview: RwLock::new(preview),
            metrics: Arc::new(EngineMetrics::new()),
        })
    }

    /// Create engine with a fresh pool seeded from `[pool]`
    pub fn from_config(config: Config) -> Result<Self> {
        let pool = PoolState::new(config.pool.reserve_base, config.pool.reserve_quote);
        Self::new(config, pool)
    }

    pub fn metrics(&self) -> Arc<EngineMetrics> {
        self.metrics.clone()
    }

    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    /// Copy of the current pool state
    pub fn pool_snapshot(&self) -> PoolState {
        self.pool.read().clone()
    }

    pub fn quote(
        &self,
        direction: SwapDirection,
        amount_in: u64,
        mode: OracleMode,
        snapshot: &OracleSnapshot,
        clock: Clock,
    ) -> Result<QuoteResult> {
        let config = self.config.read();
        let pool = self.pool.read();
        let result = quote(&pool, &config, direction, amount_in, mode, snapshot, clock);
        self.record_quote(&result);
        result
    }

    pub fn quote_exact_output(
        &self,
        direction: SwapDirection,
        amount_out: u64,
        mode: OracleMode,
        snapshot: &OracleSnapshot,
        clock: Clock,
    ) -> Result<QuoteResult> {
        let config = self.config.read();
        let pool = self.pool.read();
        let result = quote_exact_output(&pool, &config, direction, amount_out, mode, snapshot, clock);
        self.record_quote(&result);
        result
    }

    /// Execute a swap
    ///
    /// `custody` gets the pool, not the engine; calling back into the engine
    /// from `settle` would deadlock on the pool lock.
    pub fn swap<C: TokenCustody + ?Sized>(
        &self,
        request: &SwapRequest,
        snapshot: &OracleSnapshot,
        clock: Clock,
        custody: &mut C,
    ) -> Result<SwapReceipt> {
        let config = self.config.read();
        let result = swap(&mut self.pool.write(), &config, request, snapshot, clock, custody);

        match &result {
            Ok(receipt) => {
                let quote = &receipt.quote;
                self.metrics
                    .record_swap(quote.is_partial, quote.used_fallback, quote.degraded);
                if matches!(receipt.recenter, RecenterOutcome::Recentered { .. }) {
                    self.metrics.record_recenter();
                }
            }
            Err(e) => {
                self.metrics.record_reject(e);
                log_engine!(Level::WARN, code = e.code(), error = %e, "swap rejected");
            }
        }
        result
    }

    /// Recompute the preview ladder; `Ok(false)` when throttled
    pub fn refresh_preview(
        &self,
        mode: OracleMode,
        snapshot: &OracleSnapshot,
        clock: Clock,
    ) -> Result<bool> {
        let config = self.config.read();
        let pricing = {
            let pool = self.pool.read();
            Pricing::resolve(&pool, &config, snapshot, mode, clock)
        };
        let pricing = pricing.inspect_err(|e| self.metrics.record_preview_failure(e))?;

        let curve = FeeCurve::new(&config.fee);
        Ok(self.preview.write().refresh(
            clock.now_sec,
            mode,
            pricing.mid(),
            pricing.zone,
            &pricing.inputs,
            &curve,
            pricing.adjustment,
        ))
    }

    pub fn get_ladder(&self, now_sec: u64) -> Result<PreviewLadder> {
        self.preview
            .read()
            .get_ladder(now_sec)
            .inspect_err(|e| self.metrics.record_preview_failure(e))
    }

    /// Halt or resume swap acceptance (pauser only)
    pub fn set_paused(&self, caller: &str, paused: bool) -> Result<()> {
        authorize(caller, &self.config.read().access.pauser)?;
        self.pool.write().paused = paused;
        log_engine!(Level::INFO, caller, paused, "pause state changed");
        Ok(())
    }

    /// Replace one config section (governance only)
    ///
    /// The updated config is validated as a whole before it is applied. The
    /// preview cache is dropped since its ladder was priced under the old
    /// settings.
    pub fn update_config(&self, caller: &str, update: ConfigUpdate) -> Result<()> {
        let mut config = self.config.write();
        authorize(caller, &config.access.governance)?;

        let mut next = config.clone();
        let section = match update {
            ConfigUpdate::Oracle(oracle) => {
                next.oracle = oracle;
                "oracle"
            }
            ConfigUpdate::Fee(fee) => {
                next.fee = fee;
                "fee"
            }
            ConfigUpdate::Inventory(inventory) => {
                next.inventory = inventory;
                "inventory"
            }
            ConfigUpdate::Aomq(aomq) => {
                next.aomq = aomq;
                "aomq"
            }
            ConfigUpdate::Preview(preview) => {
                next.preview = preview;
                "preview"
            }
        };
        next.validate()?;

        self.preview
            .write()
            .reconfigure(next.preview.clone(), next.oracle.max_age_sec);
        *config = next;
        log_engine!(Level::INFO, caller, section, "config updated");
        Ok(())
    }

    /// Recenter at the current oracle mid (governance only)
    pub fn manual_recenter(
        &self,
        caller: &str,
        mode: OracleMode,
        snapshot: &OracleSnapshot,
        clock: Clock,
    ) -> Result<RecenterOutcome> {
        let config = self.config.read();
        authorize(caller, &config.access.governance)?;

        let resolved = OracleReconciler::resolve(snapshot, mode, &config.oracle, &config.aomq)?;
        let outcome = manual_recenter(
            &mut self.pool.write(),
            &config.inventory,
            resolved.data.mid,
            clock.now_sec,
        )?;
        self.metrics.record_recenter();
        log_engine!(Level::INFO, caller, ?outcome, "manual recenter");
        Ok(outcome)
    }

    fn record_quote(&self, result: &Result<QuoteResult>) {
        match result {
            Ok(_) => self.metrics.record_quote(),
            Err(e) => self.metrics.record_reject(e),
        }
    }
}

fn authorize(caller: &str, principal: &str) -> Result<()> {
    if !principal.is_empty() && caller == principal {
        return Ok(());
    }
    log_engine!(Level::WARN, caller, "unauthorized call");
    Err(AmmError::Unauthorized)
}
