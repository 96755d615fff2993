//! Secondary feed: two USD legs combined into one pair read

use serde::{Deserialize, Serialize};

use crate::core::math::{clamp_bps_u16, mul_div, Rounding, BPS_DENOMINATOR};
use crate::core::{PairRead, Price};

/// One asset priced in USD with its confidence interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsdLeg {
    pub price: Price,
    /// Half-width of the confidence interval, same units as `price`
    pub conf: Price,
    pub age_sec: u64,
    pub success: bool,
}

impl UsdLeg {
    pub const fn new(price: Price, conf: Price, age_sec: u64) -> Self {
        Self {
            price,
            conf,
            age_sec,
            success: true,
        }
    }

    /// Confidence relative to price, rounded up; `None` for a zero price
    fn conf_bps(&self) -> Option<u128> {
        mul_div(
            self.conf.as_raw() as u128,
            BPS_DENOMINATOR as u128,
            self.price.as_raw() as u128,
            Rounding::Up,
        )
        .ok()
    }
}

/// Base and quote legs from one secondary update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsdLegsRead {
    pub base: UsdLeg,
    pub quote: UsdLeg,
}

/// Combine the USD legs into a base/quote pair read
///
/// Pair mid is `base / quote`, age is the older leg, confidence is the sum of
/// both legs' relative confidence. A failed or zero leg fails the pair.
pub fn combine_legs(read: &UsdLegsRead) -> PairRead {
    let UsdLegsRead { base, quote } = read;
    if !base.success || !quote.success {
        return PairRead::failed();
    }

    let (Ok(mid), Some(base_conf), Some(quote_conf)) = (
        base.price.checked_ratio(quote.price),
        base.conf_bps(),
        quote.conf_bps(),
    ) else {
        return PairRead::failed();
    };
    if mid.is_zero() {
        return PairRead::failed();
    }

    PairRead::new(
        mid,
        clamp_bps_u16(base_conf.saturating_add(quote_conf)),
        base.age_sec.max(quote.age_sec),
    )
}
