//! Configuration management for the pricing engine
//!
//! Loads configuration from config.toml at startup.
//! Every tunable is a config value; nothing in the pricing path is hardcoded.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::math::BPS_DENOMINATOR;

/// Engine configuration
///
/// Loaded from config.toml at startup. Every section has defaults so a
/// partial file (or no file) still yields a usable engine.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(default)]
    pub fee: FeeConfig,

    #[serde(default)]
    pub inventory: InventoryConfig,

    /// Degraded quoting under hard divergence
    #[serde(default)]
    pub aomq: AomqConfig,

    #[serde(default)]
    pub preview: PreviewConfig,

    #[serde(default)]
    pub access: AccessConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Initial reserves for the replay binary
    #[serde(default)]
    pub pool: PoolConfig,
}

/// Oracle reconciliation settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Max age of the primary mid and EMA fallback
    pub max_age_sec: u64,
    /// Max age of the secondary feed
    pub stall_window_sec: u64,
    pub conf_cap_bps_spot: u16,
    pub conf_cap_bps_strict: u16,
    pub divergence_accept_bps: u16,
    pub divergence_soft_bps: u16,
    /// Beyond this even degraded quoting rejects
    pub divergence_hard_bps: u16,
    pub haircut_min_bps: u16,
    /// Haircut bps added per 10_000 bps of divergence above accept
    pub haircut_slope_bps: u32,
    pub allow_ema_fallback: bool,
    /// Consecutive Accept reads needed to leave soft divergence
    pub hysteresis_healthy_reads: u8,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            max_age_sec: 60,
            stall_window_sec: 120,
            conf_cap_bps_spot: 100,
            conf_cap_bps_strict: 30,
            divergence_accept_bps: 50,
            divergence_soft_bps: 100,
            divergence_hard_bps: 300,
            haircut_min_bps: 5,
            haircut_slope_bps: 5_000,
            allow_ema_fallback: true,
            hysteresis_healthy_reads: 3,
        }
    }
}

/// Fee curve coefficients
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FeeConfig {
    pub base_bps: u16,
    pub alpha_conf_numerator: u32,
    pub alpha_conf_denominator: u32,
    pub beta_inv_dev_numerator: u32,
    pub beta_inv_dev_denominator: u32,
    /// Bps per size unit
    pub gamma_size_lin: u32,
    /// Bps per size unit squared
    pub gamma_size_quad: u32,
    /// Notional (raw quote units) of one size unit, the s0 notional
    pub size_unit_quote: u64,
    pub size_fee_cap_bps: u16,
    pub cap_bps: u16,
    pub decay_pct_per_block: u8,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            base_bps: 30,
            alpha_conf_numerator: 1,
            alpha_conf_denominator: 20,
            beta_inv_dev_numerator: 1,
            beta_inv_dev_denominator: 10,
            gamma_size_lin: 2,
            gamma_size_quad: 1,
            size_unit_quote: 1_000_000_000, // 1_000 quote tokens at 6 decimals
            size_fee_cap_bps: 50,
            cap_bps: 500,
            decay_pct_per_block: 5,
        }
    }
}

/// Which value a recenter moves the target anchor to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecenterPolicy {
    /// Target becomes the current base reserve
    #[default]
    ReserveAnchor,
    /// Target becomes the value-balanced base amount at the oracle mid
    PriceAnchor,
}

/// Inventory and recenter settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub floor_bps: u16,
    /// Hundredths of a percent (750 = 7.5%)
    pub recenter_threshold_pct: u32,
    pub recenter_cooldown_sec: u64,
    /// Mid drift from the last rebalance price that also triggers; 0 disables
    pub recenter_price_drift_bps: u32,
    pub recenter_policy: RecenterPolicy,
    pub base_decimals: u8,
    pub quote_decimals: u8,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            floor_bps: 300,
            recenter_threshold_pct: 750,
            recenter_cooldown_sec: 300,
            recenter_price_drift_bps: 0,
            recenter_policy: RecenterPolicy::default(),
            base_decimals: 9,
            quote_decimals: 6,
        }
    }
}

/// AOMQ (degraded quoting) settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AomqConfig {
    pub enabled: bool,
    /// Share of available inventory still tradable while degraded
    pub max_size_bps: u16,
    /// Minimum fee while degraded
    pub emergency_fee_bps: u16,
}

impl Default for AomqConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size_bps: 2_500,
            emergency_fee_bps: 150,
        }
    }
}

/// Preview ladder settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Notionals (raw quote units) the ladder is evaluated at
    pub ladder_notionals: Vec<u64>,
    pub snapshot_cooldown_sec: u64,
    pub tolerate_stale: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            ladder_notionals: vec![
                1_000_000_000,
                5_000_000_000,
                10_000_000_000,
                50_000_000_000,
                100_000_000_000,
            ],
            snapshot_cooldown_sec: 5,
            tolerate_stale: false,
        }
    }
}

/// Principals allowed through the authorization gates
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessConfig {
    pub governance: String,
    pub pauser: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            governance: "governance".to_string(),
            pauser: "pauser".to_string(),
        }
    }
}

/// Logging output settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for rolling log files; file output is off when empty
    pub directory: PathBuf,
    /// `EnvFilter` directive used when RUST_LOG is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            filter: "info".to_string(),
        }
    }
}

/// Initial pool reserves
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    pub reserve_base: u64,
    pub reserve_quote: u64,
}

impl Config {
    /// Load configuration from the file named by CONFIG_PATH (default config.toml)
    ///
    /// If the file doesn't exist, returns default configuration.
    /// # Errors
    /// Returns error if file exists but cannot be read, parsed or validated.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());

        match Self::load_from(Path::new(&config_path)) {
            Err(ConfigError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Config::default())
            }
            other => other,
        }
    }

    /// Load and validate configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pricing path cannot honour
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.oracle.validate()?;
        self.fee.validate()?;
        self.inventory.validate()?;

        let bps_max = BPS_DENOMINATOR as u16;
        if self.aomq.max_size_bps > bps_max || self.aomq.emergency_fee_bps > bps_max {
            return Err(ConfigError::Invalid(
                "aomq bps values must not exceed 10000".to_string(),
            ));
        }
        // A zero clamp turns every degraded quote into INSUFFICIENT_LIQUIDITY
        if self.aomq.enabled && self.aomq.max_size_bps == 0 {
            return Err(ConfigError::Invalid(
                "aomq.max_size_bps must be non-zero while aomq is enabled".to_string(),
            ));
        }
        if self.preview.snapshot_cooldown_sec > self.oracle.max_age_sec {
            return Err(ConfigError::Invalid(format!(
                "preview.snapshot_cooldown_sec {} exceeds oracle.max_age_sec {}",
                self.preview.snapshot_cooldown_sec, self.oracle.max_age_sec
            )));
        }
        Ok(())
    }
}

impl OracleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.divergence_accept_bps <= self.divergence_soft_bps
            && self.divergence_soft_bps <= self.divergence_hard_bps)
        {
            return Err(ConfigError::Invalid(format!(
                "divergence zones must be ordered: accept {} <= soft {} <= hard {}",
                self.divergence_accept_bps, self.divergence_soft_bps, self.divergence_hard_bps
            )));
        }
        Ok(())
    }
}

impl FeeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alpha_conf_denominator == 0 || self.beta_inv_dev_denominator == 0 {
            return Err(ConfigError::Invalid(
                "fee coefficient denominators must be non-zero".to_string(),
            ));
        }
        if self.size_unit_quote == 0 {
            return Err(ConfigError::Invalid("fee.size_unit_quote must be non-zero".to_string()));
        }
        if self.cap_bps as u64 > BPS_DENOMINATOR {
            return Err(ConfigError::Invalid(format!(
                "fee.cap_bps {} exceeds 10000",
                self.cap_bps
            )));
        }
        if self.decay_pct_per_block > 100 {
            return Err(ConfigError::Invalid(format!(
                "fee.decay_pct_per_block {} exceeds 100",
                self.decay_pct_per_block
            )));
        }
        Ok(())
    }
}

impl InventoryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.floor_bps as u64 >= BPS_DENOMINATOR {
            return Err(ConfigError::Invalid(format!(
                "inventory.floor_bps {} must be below 10000",
                self.floor_bps
            )));
        }
        if self.base_decimals > 18 || self.quote_decimals > 18 {
            return Err(ConfigError::Invalid("token decimals above 18".to_string()));
        }
        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Parse error (invalid TOML)
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// Parsed but inconsistent
    #[error("Invalid config: {0}")]
    Invalid(String),
}
