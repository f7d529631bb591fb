use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use demandlens_core::AlignedSeries;

use crate::error::AnalyticsError;
use crate::smoothing::FittedSmoothing;
use crate::stats::variance_sample;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastModel {
    /// Holt: additive trend, no seasonality.
    AdditiveTrend,
    /// Holt-Winters: additive trend and additive seasonality.
    AdditiveTrendSeasonal { period: usize },
}

/// One projected bucket. `quantity` is `None` when the model produced a value
/// that cannot be represented (NaN/inf).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: NaiveDateTime,
    pub quantity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub model: ForecastModel,
    pub points: Vec<ForecastPoint>,
}

/// Short-horizon demand projection.
///
/// Series with fewer than `seasonal_min_observations` points get a trend-only
/// model; longer series get trend + seasonality with `seasonal_period`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DemandForecaster {
    horizon: usize,
    seasonal_period: usize,
    seasonal_min_observations: usize,
}

impl DemandForecaster {
    pub fn new(
        horizon: usize,
        seasonal_period: usize,
        seasonal_min_observations: usize,
    ) -> Result<Self, AnalyticsError> {
        if horizon == 0 {
            return Err(AnalyticsError::invalid_input("forecast horizon must be >= 1"));
        }
        if seasonal_period < 2 {
            return Err(AnalyticsError::invalid_input("seasonal period must be >= 2"));
        }
        if seasonal_min_observations < 2 * seasonal_period {
            return Err(AnalyticsError::invalid_input(
                "seasonal models need at least two full periods",
            ));
        }
        Ok(Self {
            horizon,
            seasonal_period,
            seasonal_min_observations,
        })
    }

    /// 24-hour horizon, daily seasonality once two days of history exist.
    pub fn hourly_default() -> Self {
        Self {
            horizon: 24,
            seasonal_period: 24,
            seasonal_min_observations: 48,
        }
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn forecast(&self, series: &AlignedSeries) -> Result<Forecast, AnalyticsError> {
        let values = series.values();
        match variance_sample(values) {
            Some(v) if v.is_finite() && v > 0.0 => {}
            Some(_) => return Err(AnalyticsError::fit_failed("degenerate variance")),
            None => {
                return Err(AnalyticsError::InsufficientData {
                    required: 2,
                    actual: values.len(),
                });
            }
        }

        let (model, fitted) = if values.len() < self.seasonal_min_observations {
            (ForecastModel::AdditiveTrend, FittedSmoothing::fit_trend(values)?)
        } else {
            (
                ForecastModel::AdditiveTrendSeasonal {
                    period: self.seasonal_period,
                },
                FittedSmoothing::fit_trend_seasonal(values, self.seasonal_period)?,
            )
        };
        debug!(?model, params = ?fitted.params(), sse = fitted.sse(), "fitted smoothing model");

        let points = series
            .future_timestamps(self.horizon)
            .into_iter()
            .zip(fitted.forecast(self.horizon))
            .map(|(timestamp, q)| ForecastPoint {
                timestamp,
                quantity: q.is_finite().then_some(q),
            })
            .collect();

        Ok(Forecast { model, points })
    }
}
