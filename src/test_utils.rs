//! Shared test fixtures
//!
//! Prices are written as decimal strings so test expectations read the way
//! an operator would type them.

use crate::core::{BidAskRead, MidRead, OracleSnapshot, PairRead, PoolState, Price};
use crate::infrastructure::config::Config;

/// Parse a decimal price, panicking on bad input
pub fn price(s: &str) -> Price {
    s.parse().unwrap()
}

/// Healthy snapshot: primary at `primary` (age 3) with a 20 bps book around
/// it, EMA at the same mid (age 10), secondary at `secondary` (age 5)
pub fn snapshot(primary: &str, secondary: &str, conf_bps: u16) -> OracleSnapshot {
    let mid = price(primary);
    let raw = mid.as_raw();
    OracleSnapshot {
        primary: MidRead::new(mid, 3),
        bid_ask: BidAskRead::new(
            Price::from_raw(raw / 10_000 * 9_990),
            Price::from_raw(raw / 10_000 * 10_010),
        ),
        ema: MidRead::new(mid, 10),
        secondary: PairRead::new(price(secondary), conf_bps, 5),
    }
}

/// Config with equal 6/6 decimals so one raw unit of base trades for one raw
/// unit of quote at mid 1.0
pub fn config() -> Config {
    let mut config = Config::default();
    config.inventory.base_decimals = 6;
    config.inventory.quote_decimals = 6;
    config.logging.directory = Default::default();
    config
}

/// Pool with 10M of each asset, target at the base reserve
pub fn pool() -> PoolState {
    PoolState::new(10_000_000, 10_000_000)
}
