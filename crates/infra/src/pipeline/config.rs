use std::str::FromStr;

use serde::{Deserialize, Serialize};

use demandlens_analytics::{DemandForecaster, SpikeDetector};
use demandlens_inventory::ReplenishmentPolicy;

use crate::error::ConfigError;

pub const ENV_Z_THRESHOLD: &str = "DEMANDLENS_Z_THRESHOLD";
pub const ENV_SAFETY_FACTOR: &str = "DEMANDLENS_SAFETY_FACTOR";
pub const ENV_SERVICE_LEVEL: &str = "DEMANDLENS_SERVICE_LEVEL";
pub const ENV_FORECAST_HORIZON: &str = "DEMANDLENS_FORECAST_HORIZON";
pub const ENV_SEASONAL_PERIOD: &str = "DEMANDLENS_SEASONAL_PERIOD";
pub const ENV_WORKERS: &str = "DEMANDLENS_WORKERS";

/// Tunables for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Seasonal cycle length in hourly buckets (decomposition and forecasting).
    pub seasonal_period: usize,
    /// One-sided residual z-score threshold for spike candidates.
    pub z_threshold: f64,
    /// Number of future hourly buckets to forecast.
    pub forecast_horizon: usize,
    /// Series at least this long get a seasonal forecast model.
    pub seasonal_min_observations: usize,
    pub safety_factor: f64,
    pub default_service_level: f64,
    /// Worker threads for per-group analysis; 1 runs on the calling thread.
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seasonal_period: 24,
            z_threshold: 1.8,
            forecast_horizon: 24,
            seasonal_min_observations: 48,
            safety_factor: 1.2,
            default_service_level: 0.95,
            workers: 1,
        }
    }
}

impl PipelineConfig {
    pub fn with_z_threshold(mut self, z_threshold: f64) -> Self {
        self.z_threshold = z_threshold;
        self
    }

    pub fn with_safety_factor(mut self, safety_factor: f64) -> Self {
        self.safety_factor = safety_factor;
        self
    }

    pub fn with_default_service_level(mut self, service_level: f64) -> Self {
        self.default_service_level = service_level;
        self
    }

    pub fn with_forecast_horizon(mut self, horizon: usize) -> Self {
        self.forecast_horizon = horizon;
        self
    }

    /// Sets the period and keeps the seasonal-model threshold at two periods.
    pub fn with_seasonal_period(mut self, period: usize) -> Self {
        self.seasonal_period = period;
        self.seasonal_min_observations = period.saturating_mul(2);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Defaults overridden by `DEMANDLENS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`] with an injectable lookup.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = parse_var(&lookup, ENV_Z_THRESHOLD)? {
            config = config.with_z_threshold(v);
        }
        if let Some(v) = parse_var(&lookup, ENV_SAFETY_FACTOR)? {
            config = config.with_safety_factor(v);
        }
        if let Some(v) = parse_var(&lookup, ENV_SERVICE_LEVEL)? {
            config = config.with_default_service_level(v);
        }
        if let Some(v) = parse_var(&lookup, ENV_FORECAST_HORIZON)? {
            config = config.with_forecast_horizon(v);
        }
        if let Some(v) = parse_var(&lookup, ENV_SEASONAL_PERIOD)? {
            config = config.with_seasonal_period(v);
        }
        if let Some(v) = parse_var(&lookup, ENV_WORKERS)? {
            config = config.with_workers(v);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.z_threshold.is_finite() && self.z_threshold > 0.0) {
            return Err(ConfigError::invalid(
                "z_threshold",
                format!("must be a finite positive number, got {}", self.z_threshold),
            ));
        }
        if self.seasonal_period < 2 {
            return Err(ConfigError::invalid(
                "seasonal_period",
                format!("must be >= 2, got {}", self.seasonal_period),
            ));
        }
        if self.forecast_horizon == 0 {
            return Err(ConfigError::invalid("forecast_horizon", "must be >= 1"));
        }
        if self.seasonal_min_observations < 2 * self.seasonal_period {
            return Err(ConfigError::invalid(
                "seasonal_min_observations",
                format!(
                    "must cover two seasonal periods ({}), got {}",
                    2 * self.seasonal_period,
                    self.seasonal_min_observations
                ),
            ));
        }
        if self.workers == 0 {
            return Err(ConfigError::invalid("workers", "must be >= 1"));
        }
        self.policy()
            .validate()
            .map_err(|e| ConfigError::invalid("replenishment_policy", e.to_string()))
    }

    pub fn policy(&self) -> ReplenishmentPolicy {
        ReplenishmentPolicy::default()
            .with_safety_factor(self.safety_factor)
            .with_default_service_level(self.default_service_level)
    }

    pub fn spike_detector(&self) -> Result<SpikeDetector, ConfigError> {
        SpikeDetector::new(self.seasonal_period, self.z_threshold)
            .map_err(|e| ConfigError::invalid("spike_detector", e.to_string()))
    }

    pub fn forecaster(&self) -> Result<DemandForecaster, ConfigError> {
        DemandForecaster::new(
            self.forecast_horizon,
            self.seasonal_period,
            self.seasonal_min_observations,
        )
        .map_err(|e| ConfigError::invalid("forecaster", e.to_string()))
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::invalid(key, format!("'{raw}': {e}"))),
    }
}
