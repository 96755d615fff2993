//! Oracle-anchored AMM pricing and risk engine
//!
//! Core library for quoting and settling swaps against a two-asset pool
//! priced off external oracles, with dynamic fees, a reserve floor and
//! target recentering.

pub mod core;
pub mod engine;
pub mod feeds;
pub mod hot_path;
pub mod infrastructure;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use crate::core::{MathError, PoolState, Price};
pub use engine::{AmmEngine, QuoteResult, ReasonCode, Settlement, SwapRequest, TokenCustody};
pub use infrastructure::config::{Config, ConfigError};

use thiserror::Error;

/// Main error type for the engine
///
/// Every variant is fatal to the operation that raised it and leaves the
/// pool state untouched. Degraded service is reported on `QuoteResult`.
#[derive(Error, Debug)]
pub enum AmmError {
    #[error("no usable primary mid or EMA fallback")]
    OracleUnavailable,

    #[error("oracle divergence {divergence_bps} bps cannot be served")]
    OracleDivergence { divergence_bps: u16 },

    /// `age_sec` is `u64::MAX` when nothing has been cached yet
    #[error("preview is stale: age {age_sec}s, max {max_age_sec}s")]
    StalePreview { age_sec: u64, max_age_sec: u64 },

    #[error("insufficient liquidity above the reserve floor")]
    InsufficientLiquidity,

    #[error("math error: {0}")]
    Math(#[from] MathError),

    #[error("reentrant call while an operation is in progress")]
    Reentrancy,

    #[error("swaps are paused")]
    Paused,

    #[error("caller is not authorized")]
    Unauthorized,

    #[error("custody settlement failed: {0}")]
    Custody(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AmmError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            AmmError::OracleUnavailable => "ORACLE_UNAVAILABLE",
            AmmError::OracleDivergence { .. } => "ORACLE_DIVERGENCE",
            AmmError::StalePreview { .. } => "STALE_PREVIEW",
            AmmError::InsufficientLiquidity => "INSUFFICIENT_LIQUIDITY",
            AmmError::Math(MathError::Overflow) => "MATH_OVERFLOW",
            AmmError::Math(MathError::DivisionByZero) => "DIVISION_BY_ZERO",
            AmmError::Reentrancy => "REENTRANCY",
            AmmError::Paused => "PAUSED",
            AmmError::Unauthorized => "UNAUTHORIZED",
            AmmError::Custody(_) => "CUSTODY_FAILED",
            AmmError::InvalidAmount(_) => "INVALID_AMOUNT",
            AmmError::Config(_) => "CONFIG",
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AmmError>;
