//! Core types for the pricing engine
//!
//! This module contains the fundamental types used throughout the system:
//! - Price: Fixed-point oracle prices
//! - math: Checked mul/div with explicit rounding
//! - OracleSnapshot: Raw oracle reads for one operation
//! - PoolState: The single mutable pool object

pub mod fixed_point;
pub mod market_data;
pub mod math;
pub mod pool_state;

pub use fixed_point::Price;
pub use market_data::{
    BidAskRead, Clock, MidRead, OracleMode, OracleSnapshot, PairRead, SwapDirection,
};
pub use math::{MathError, Rounding};
pub use pool_state::{
    DivergenceZone, OperationGuard, PoolState, RecenterState, SoftDivergenceState,
};
