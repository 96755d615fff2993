//! Hot path operations - zero allocation, zero panic
//!
//! This module contains the pricing pipeline of a swap:
//! - Oracle reconciliation and divergence zones
//! - Dynamic fee curve
//! - Inventory sizing with the reserve floor
//! - Target recentering
//! - Fee ladder preview

pub mod fee_curve;
pub mod inventory;
pub mod oracle;
pub mod preview;
pub mod recenter;

pub use fee_curve::{FeeCurve, FeeInputs, LadderRung};
pub use inventory::{available_inventory, floor_amount, Conversion, ExactOutput, Fill, InventoryEngine};
pub use oracle::{OracleData, OracleReconciler, ResolvedOracle, ZoneAdjustment};
pub use preview::{PreviewCache, PreviewLadder, PreviewSnapshot};
pub use recenter::{deviation_pct, RecenterController, RecenterOutcome};
