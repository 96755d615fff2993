//! Property tests for the pricing and inventory invariants
//!
//! Increase cases: PROPTEST_CASES=10000 cargo test --test properties

use oracle_amm::core::{
    BidAskRead, Clock, MidRead, OracleMode, OracleSnapshot, PairRead, PoolState, Price,
    SwapDirection,
};
use oracle_amm::engine::swap;
use oracle_amm::hot_path::inventory::{floor_amount, available_inventory};
use oracle_amm::hot_path::oracle::compute_divergence_bps;
use oracle_amm::hot_path::{FeeCurve, Fill, InventoryEngine};
use oracle_amm::infrastructure::config::FeeConfig;
use oracle_amm::{AmmError, Config, Settlement, SwapRequest, TokenCustody};
use proptest::prelude::*;

// ============================================================================
// STRATEGIES
// ============================================================================

/// Prices between 0.01 and 10_000
fn price() -> impl Strategy<Value = Price> {
    (1_000_000u64..1_000_000_000_000).prop_map(Price::from_raw)
}

fn direction() -> impl Strategy<Value = SwapDirection> {
    prop_oneof![Just(SwapDirection::BaseIn), Just(SwapDirection::QuoteIn)]
}

fn fee_config() -> impl Strategy<Value = FeeConfig> {
    (
        0u16..=10_000,
        0u32..100,
        1u32..100,
        0u32..100,
        1u32..100,
        (0u32..1_000, 0u32..1_000, 1u64..10_000_000_000, 0u16..=10_000),
        0u8..=100,
    )
        .prop_map(
            |(cap_bps, alpha_n, alpha_d, beta_n, beta_d, (lin, quad, unit, size_cap), decay)| FeeConfig {
                base_bps: cap_bps / 2,
                alpha_conf_numerator: alpha_n,
                alpha_conf_denominator: alpha_d,
                beta_inv_dev_numerator: beta_n,
                beta_inv_dev_denominator: beta_d,
                gamma_size_lin: lin,
                gamma_size_quad: quad,
                size_unit_quote: unit,
                size_fee_cap_bps: size_cap,
                cap_bps,
                decay_pct_per_block: decay,
            },
        )
}

/// Output of a quote, zero when it was rejected for lack of output
fn output_or_zero(result: oracle_amm::Result<Fill>) -> u64 {
    match result {
        Ok(fill) => fill.amount_out,
        Err(AmmError::InsufficientLiquidity) | Err(AmmError::InvalidAmount(_)) => 0,
        Err(e) => panic!("unexpected error: {e}"),
    }
}

struct AcceptAll;

impl TokenCustody for AcceptAll {
    fn settle(&mut self, _pool: &mut PoolState, _settlement: &Settlement) -> oracle_amm::Result<()> {
        Ok(())
    }
}

// ============================================================================
// INVENTORY
// ============================================================================

proptest! {
    #[test]
    fn floor_is_never_breached(
        direction in direction(),
        amount_in in 1u64..10_000_000_000_000,
        mid in price(),
        fee_bps in 0u16..1_000,
        reserves in 0u64..10_000_000_000_000,
        floor_bps in 0u16..5_000,
    ) {
        let engine = InventoryEngine::new(6, 6);
        if let Ok(fill) = engine.quote(direction, amount_in, mid, fee_bps, reserves, floor_bps, None) {
            prop_assert!(fill.amount_out <= available_inventory(reserves, floor_bps).unwrap());
            prop_assert!(reserves - fill.amount_out >= floor_amount(reserves, floor_bps).unwrap());
        }
    }

    #[test]
    fn conservation_and_partial_consistency(
        direction in direction(),
        amount_in in 1u64..10_000_000_000_000,
        mid in price(),
        fee_bps in 0u16..1_000,
        reserves in 0u64..10_000_000_000_000,
        floor_bps in 0u16..5_000,
        size_cap in proptest::option::of(1u16..=10_000),
    ) {
        let engine = InventoryEngine::new(9, 6);
        if let Ok(fill) = engine.quote(direction, amount_in, mid, fee_bps, reserves, floor_bps, size_cap) {
            prop_assert_eq!(fill.applied_amount_in + fill.leftover_amount_in, amount_in);
            prop_assert_eq!(fill.is_partial, fill.applied_amount_in < amount_in);
            prop_assert!(fill.amount_out > 0);
        }
    }

    #[test]
    fn output_is_monotone_in_input(
        direction in direction(),
        a in 1u64..10_000_000_000_000,
        b in 1u64..10_000_000_000_000,
        mid in price(),
        fee_bps in 0u16..1_000,
        reserves in 0u64..10_000_000_000_000,
        floor_bps in 0u16..5_000,
    ) {
        let (small, large) = if a <= b { (a, b) } else { (b, a) };
        let engine = InventoryEngine::new(6, 6);
        let out_small = output_or_zero(engine.quote(direction, small, mid, fee_bps, reserves, floor_bps, None));
        let out_large = output_or_zero(engine.quote(direction, large, mid, fee_bps, reserves, floor_bps, None));
        prop_assert!(out_small <= out_large);
    }

    #[test]
    fn exact_output_covers_request(
        direction in direction(),
        amount_out in 1u64..1_000_000_000_000,
        mid in price(),
        fee_bps in 0u16..1_000,
        reserves in 0u64..10_000_000_000_000,
    ) {
        let engine = InventoryEngine::new(6, 6);
        if let Ok(exact) = engine.quote_exact_output(direction, amount_out, mid, fee_bps, reserves, 300, None) {
            prop_assert!(exact.amount_out >= amount_out);
        }
    }
}

// ============================================================================
// ORACLE AND FEES
// ============================================================================

proptest! {
    #[test]
    fn divergence_is_symmetric(a in any::<u64>(), b in any::<u64>()) {
        let (a, b) = (Price::from_raw(a), Price::from_raw(b));
        prop_assert_eq!(compute_divergence_bps(a, b), compute_divergence_bps(b, a));
    }

    #[test]
    fn fee_stays_within_cap(
        config in fee_config(),
        conf_bps in any::<u16>(),
        deviation in any::<u32>(),
        notional in any::<u64>(),
        blocks in any::<u64>(),
    ) {
        let fee = FeeCurve::new(&config).compute_fee_bps(conf_bps, deviation, notional, blocks);
        prop_assert!(fee <= config.cap_bps);
        prop_assert!(fee <= 10_000);
    }
}

// ============================================================================
// SWAP PIPELINE
// ============================================================================

proptest! {
    #[test]
    fn failed_swap_leaves_pool_unchanged(
        direction in direction(),
        amount_in in 0u64..100_000_000_000,
        secondary_raw in 90_000_000u64..110_000_000,
        conf_bps in 0u16..200,
        strict in any::<bool>(),
        min_amount_out in 0u64..1_000_000_000,
    ) {
        let mut config = Config::default();
        config.inventory.base_decimals = 6;
        config.inventory.quote_decimals = 6;

        let snapshot = OracleSnapshot {
            primary: MidRead::new(Price::ONE, 3),
            bid_ask: BidAskRead::new(Price::from_raw(99_900_000), Price::from_raw(100_100_000)),
            ema: MidRead::new(Price::ONE, 10),
            secondary: PairRead::new(Price::from_raw(secondary_raw), conf_bps, 5),
        };
        let mode = if strict { OracleMode::Strict } else { OracleMode::Spot };
        let request = SwapRequest { direction, amount_in, mode, min_amount_out };

        let mut pool = PoolState::new(10_000_000_000, 10_000_000_000);
        let before = pool.clone();
        match swap(&mut pool, &config, &request, &snapshot, Clock::new(1_000, 10), &mut AcceptAll) {
            Ok(receipt) => {
                let floor_bps = config.inventory.floor_bps;
                let out_before = before.output_reserve(direction);
                prop_assert!(pool.output_reserve(direction) >= floor_amount(out_before, floor_bps).unwrap());
                prop_assert_eq!(
                    out_before - pool.output_reserve(direction),
                    receipt.quote.amount_out
                );
            }
            Err(_) => prop_assert_eq!(&pool, &before),
        }
        prop_assert!(!pool.is_in_progress());
    }
}
