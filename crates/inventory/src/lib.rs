//! Inventory replenishment rules.
//!
//! This crate contains the replenishment math (safety stock, reorder point,
//! economic order quantity) as deterministic functions (no IO, no HTTP, no storage).

pub mod error;
pub mod normal;
pub mod optimizer;
pub mod params;
pub mod policy;

pub use error::InventoryError;
pub use normal::standard_normal_quantile;
pub use optimizer::{
    DemandStats, InventoryOptimizer, OrderRecommendation, ReplenishmentDecision, ReplenishmentPlan,
};
pub use params::{InventoryBook, InventoryParams};
pub use policy::{ReplenishmentPolicy, StockSuggestion};
