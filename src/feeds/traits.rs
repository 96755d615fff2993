//! Oracle feed abstraction traits
//!
//! Feeds never return errors: a failed read comes back with `success = false`
//! and the reconciler decides what that means for the operation.
//! Generic over the feed type, no dynamic dispatch on the swap path.

use crate::core::{BidAskRead, MidRead};

use super::secondary::UsdLegsRead;

/// Primary price feed (mid, top of book, EMA)
pub trait PrimaryFeed {
    /// Feed name for logging
    fn name(&self) -> &'static str;

    /// Latest mid with its age in seconds
    fn read_mid_and_age(&self) -> MidRead;

    /// Best bid/ask
    fn read_bid_ask(&self) -> BidAskRead;

    /// Slow EMA of the mid, used when the spot mid is unusable
    fn read_mid_ema_fallback(&self) -> MidRead;
}

/// Secondary feed reporting both legs against USD
pub trait SecondaryFeed {
    fn name(&self) -> &'static str;

    /// Verify and decode a signed price update
    fn read_usd_mid(&self, update_blob: &[u8]) -> UsdLegsRead;
}
