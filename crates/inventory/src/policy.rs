use serde::{Deserialize, Serialize};

use crate::error::InventoryError;

/// Tunables applied when turning forecasts and raw inventory rows into suggestions.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplenishmentPolicy {
    /// Multiplier applied to forecast demand to get a suggested stock level.
    pub safety_factor: f64,
    /// Service level used for inventory rows that leave it blank.
    pub default_service_level: f64,
}

impl Default for ReplenishmentPolicy {
    fn default() -> Self {
        Self {
            safety_factor: 1.2,
            default_service_level: 0.95,
        }
    }
}

/// Per-forecast-bucket stock suggestion.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSuggestion {
    /// Forecast rounded to 2 decimals; 0 when the forecast is unrepresentable.
    pub predicted_demand: f64,
    /// `ceil(forecast * safety_factor)`; 0 when the forecast is unrepresentable.
    pub suggested_stock: i64,
}

impl ReplenishmentPolicy {
    pub fn with_safety_factor(mut self, safety_factor: f64) -> Self {
        self.safety_factor = safety_factor;
        self
    }

    pub fn with_default_service_level(mut self, service_level: f64) -> Self {
        self.default_service_level = service_level;
        self
    }

    pub fn validate(&self) -> Result<(), InventoryError> {
        if !(self.safety_factor.is_finite() && self.safety_factor > 0.0) {
            return Err(InventoryError::invalid(
                "safety_factor",
                format!("must be a finite positive number, got {}", self.safety_factor),
            ));
        }
        if !(self.default_service_level > 0.0 && self.default_service_level < 1.0) {
            return Err(InventoryError::invalid(
                "default_service_level",
                format!("must be in (0, 1), got {}", self.default_service_level),
            ));
        }
        Ok(())
    }

    /// Resolve a possibly-blank service level cell.
    pub fn service_level_or_default(&self, service_level: Option<f64>) -> f64 {
        service_level.unwrap_or(self.default_service_level)
    }

    pub fn suggest(&self, forecast: Option<f64>) -> StockSuggestion {
        match forecast.filter(|f| f.is_finite()) {
            Some(f) => StockSuggestion {
                predicted_demand: (f * 100.0).round_ties_even() / 100.0,
                suggested_stock: (f * self.safety_factor).ceil() as i64,
            },
            None => StockSuggestion {
                predicted_demand: 0.0,
                suggested_stock: 0,
            },
        }
    }
}
