//! Oracle feed boundary
//!
//! Feeds are external collaborators. This module defines what the engine
//! needs from them and assembles one `OracleSnapshot` per operation.

pub mod secondary;
pub mod traits;

pub use secondary::{combine_legs, UsdLeg, UsdLegsRead};
pub use traits::{PrimaryFeed, SecondaryFeed};

use tracing::Level;

use crate::core::OracleSnapshot;
use crate::log_oracle;

impl OracleSnapshot {
    /// Read every feed once
    pub fn capture<P, S>(primary: &P, secondary: &S, update_blob: &[u8]) -> Self
    where
        P: PrimaryFeed + ?Sized,
        S: SecondaryFeed + ?Sized,
    {
        let snapshot = Self {
            primary: primary.read_mid_and_age(),
            bid_ask: primary.read_bid_ask(),
            ema: primary.read_mid_ema_fallback(),
            secondary: combine_legs(&secondary.read_usd_mid(update_blob)),
        };

        if !snapshot.primary.success || !snapshot.secondary.success {
            log_oracle!(
                Level::DEBUG,
                primary = primary.name(),
                primary_ok = snapshot.primary.success,
                secondary = secondary.name(),
                secondary_ok = snapshot.secondary.success,
                "feed read failed"
            );
        }
        snapshot
    }
}
