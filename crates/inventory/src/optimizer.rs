use serde::{Deserialize, Serialize};

use crate::error::InventoryError;
use crate::normal::standard_normal_quantile;
use crate::params::InventoryParams;

const DAYS_PER_YEAR: f64 = 365.0;

/// Daily demand statistics of one group.
///
/// `std_daily` is the sample standard deviation and is NaN when fewer than two
/// days were observed; the NaN flows through to a non-finite reorder point,
/// which is reported as 0 with a HOLD recommendation.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandStats {
    pub avg_daily: f64,
    pub std_daily: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderRecommendation {
    Order,
    Hold,
    /// No inventory parameters exist for the group.
    Unknown,
}

impl OrderRecommendation {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderRecommendation::Order => "ORDER",
            OrderRecommendation::Hold => "HOLD",
            OrderRecommendation::Unknown => "UNKNOWN",
        }
    }
}

impl core::fmt::Display for OrderRecommendation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrounded replenishment quantities.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplenishmentPlan {
    /// Service-level z-score.
    pub z: f64,
    pub safety_stock: f64,
    pub reorder_point: f64,
    pub annual_demand: f64,
    pub eoq: f64,
    pub recommendation: OrderRecommendation,
}

/// Output-ready decision: quantities ceiled to whole units, non-finite values as 0.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplenishmentDecision {
    pub recommendation: OrderRecommendation,
    pub reorder_point: i64,
    pub eoq: i64,
}

impl ReplenishmentDecision {
    pub fn unknown() -> Self {
        Self {
            recommendation: OrderRecommendation::Unknown,
            reorder_point: 0,
            eoq: 0,
        }
    }
}

impl From<ReplenishmentPlan> for ReplenishmentDecision {
    fn from(plan: ReplenishmentPlan) -> Self {
        Self {
            recommendation: plan.recommendation,
            reorder_point: ceil_or_zero(plan.reorder_point),
            eoq: ceil_or_zero(plan.eoq),
        }
    }
}

fn ceil_or_zero(x: f64) -> i64 {
    if x.is_finite() { x.ceil() as i64 } else { 0 }
}

/// Safety stock / reorder point / EOQ calculator.
///
/// - `z = Phi^-1(service_level)`
/// - `safety_stock = z * std_daily * sqrt(lead_time_days)`
/// - `reorder_point = avg_daily * lead_time_days + safety_stock`
/// - `eoq = sqrt(2 * (avg_daily * 365) * order_cost / holding_cost)`
/// - ORDER when `current_stock < reorder_point`, otherwise HOLD
#[derive(Debug, Copy, Clone, Default)]
pub struct InventoryOptimizer;

impl InventoryOptimizer {
    pub fn plan(
        &self,
        stats: DemandStats,
        params: &InventoryParams,
    ) -> Result<ReplenishmentPlan, InventoryError> {
        params.validate()?;
        let z = standard_normal_quantile(params.service_level)
            .ok_or_else(|| InventoryError::invalid("service_level", "must be in (0, 1)"))?;

        let safety_stock = z * stats.std_daily * params.lead_time_days.sqrt();
        let reorder_point = stats.avg_daily * params.lead_time_days + safety_stock;
        let annual_demand = stats.avg_daily * DAYS_PER_YEAR;
        let eoq = ((2.0 * annual_demand * params.order_cost) / params.holding_cost_per_unit_per_year).sqrt();

        // A NaN reorder point compares false, which lands on HOLD.
        let recommendation = if params.current_stock < reorder_point {
            OrderRecommendation::Order
        } else {
            OrderRecommendation::Hold
        };

        Ok(ReplenishmentPlan {
            z,
            safety_stock,
            reorder_point,
            annual_demand,
            eoq,
            recommendation,
        })
    }

    /// Plan when parameters exist, otherwise the explicit UNKNOWN decision.
    pub fn decide(
        &self,
        stats: DemandStats,
        params: Option<&InventoryParams>,
    ) -> Result<ReplenishmentDecision, InventoryError> {
        match params {
            Some(p) => self.plan(stats, p).map(ReplenishmentDecision::from),
            None => Ok(ReplenishmentDecision::unknown()),
        }
    }
}
