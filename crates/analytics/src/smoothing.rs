//! Additive exponential smoothing with fitted smoothing constants.
//!
//! Two shapes are supported:
//! - **Holt (additive trend)**: `l_t = a*y_t + (1-a)(l + b)`, `b_t = B*(l_t - l) + (1-B)*b`
//! - **Holt-Winters (additive trend + additive season)**: as above on `y_t - s`, plus
//!   `s_t = g*(y_t - l_t) + (1-g)*s`
//!
//! Smoothing constants are chosen by minimising the one-step-ahead sum of squared
//! errors: a coarse grid over `(0, 1)` followed by a shrinking pattern search.

use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

const GRID: [f64; 10] = [0.05, 0.15, 0.25, 0.35, 0.45, 0.55, 0.65, 0.75, 0.85, 0.95];
const LOWER: f64 = 1e-4;
const UPPER: f64 = 1.0 - 1e-4;
const INITIAL_STEP: f64 = 0.05;
const MIN_STEP: f64 = 1e-4;
const MAX_SEARCH_ROUNDS: usize = 500;

/// Fewest observations a trend model can be fitted on (two to seed, one to score).
pub const MIN_TREND_OBSERVATIONS: usize = 3;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingParams {
    pub alpha: f64,
    pub beta: f64,
    /// Seasonal smoothing; `None` for a non-seasonal model.
    pub gamma: Option<f64>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Shape {
    Trend,
    TrendSeasonal { period: usize },
}

#[derive(Debug, Clone)]
struct FilterState {
    level: f64,
    trend: f64,
    seasonal: Vec<f64>,
    sse: f64,
}

/// A fitted model ready to extrapolate from the end of its training data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedSmoothing {
    params: SmoothingParams,
    level: f64,
    trend: f64,
    /// Seasonal state indexed by `t % period`; empty for the trend model.
    seasonal: Vec<f64>,
    observations: usize,
    sse: f64,
}

impl FittedSmoothing {
    /// Fit an additive-trend model with no seasonal component.
    pub fn fit_trend(data: &[f64]) -> Result<Self, AnalyticsError> {
        Self::fit(data, Shape::Trend)
    }

    /// Fit an additive-trend, additive-seasonal model.
    pub fn fit_trend_seasonal(data: &[f64], period: usize) -> Result<Self, AnalyticsError> {
        if period < 2 {
            return Err(AnalyticsError::invalid_input("seasonal period must be >= 2"));
        }
        Self::fit(data, Shape::TrendSeasonal { period })
    }

    pub fn params(&self) -> SmoothingParams {
        self.params
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn trend(&self) -> f64 {
        self.trend
    }

    pub fn seasonal(&self) -> &[f64] {
        &self.seasonal
    }

    /// Sum of squared one-step-ahead errors over the training data.
    pub fn sse(&self) -> f64 {
        self.sse
    }

    /// Point forecasts for the `steps` periods after the last observation.
    pub fn forecast(&self, steps: usize) -> Vec<f64> {
        (1..=steps)
            .map(|h| {
                let base = self.level + h as f64 * self.trend;
                if self.seasonal.is_empty() {
                    base
                } else {
                    let period = self.seasonal.len();
                    base + self.seasonal[(self.observations - 1 + h) % period]
                }
            })
            .collect()
    }

    fn fit(data: &[f64], shape: Shape) -> Result<Self, AnalyticsError> {
        let required = match shape {
            Shape::Trend => MIN_TREND_OBSERVATIONS,
            Shape::TrendSeasonal { period } => 2 * period,
        };
        if data.len() < required {
            return Err(AnalyticsError::InsufficientData {
                required,
                actual: data.len(),
            });
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(AnalyticsError::invalid_input("series contains non-finite values"));
        }

        let params = optimise(data, shape)?;
        let state = run_filter(data, shape, params);
        if !(state.level.is_finite() && state.trend.is_finite() && state.sse.is_finite())
            || state.seasonal.iter().any(|s| !s.is_finite())
        {
            return Err(AnalyticsError::fit_failed("smoothing state diverged"));
        }

        Ok(Self {
            params,
            level: state.level,
            trend: state.trend,
            seasonal: state.seasonal,
            observations: data.len(),
            sse: state.sse,
        })
    }
}

fn run_filter(data: &[f64], shape: Shape, params: SmoothingParams) -> FilterState {
    let SmoothingParams { alpha, beta, gamma } = params;
    match shape {
        Shape::Trend => {
            let mut level = data[0];
            let mut trend = data[1] - data[0];
            let mut sse = 0.0;
            for &y in &data[1..] {
                let err = y - (level + trend);
                sse += err * err;
                let prev_level = level;
                level = alpha * y + (1.0 - alpha) * (level + trend);
                trend = beta * (level - prev_level) + (1.0 - beta) * trend;
            }
            FilterState {
                level,
                trend,
                seasonal: Vec::new(),
                sse,
            }
        }
        Shape::TrendSeasonal { period } => {
            let gamma = gamma.unwrap_or(0.0);
            let first = data[..period].iter().sum::<f64>() / period as f64;
            let second = data[period..2 * period].iter().sum::<f64>() / period as f64;
            let mut level = first;
            let mut trend = (second - first) / period as f64;
            let mut seasonal: Vec<f64> = data[..period].iter().map(|y| y - first).collect();
            let mut sse = 0.0;
            for (t, &y) in data.iter().enumerate().skip(period) {
                let idx = t % period;
                let s = seasonal[idx];
                let err = y - (level + trend + s);
                sse += err * err;
                let prev_level = level;
                level = alpha * (y - s) + (1.0 - alpha) * (level + trend);
                trend = beta * (level - prev_level) + (1.0 - beta) * trend;
                seasonal[idx] = gamma * (y - level) + (1.0 - gamma) * s;
            }
            FilterState {
                level,
                trend,
                seasonal,
                sse,
            }
        }
    }
}

fn objective(data: &[f64], shape: Shape, x: &[f64; 3]) -> f64 {
    let params = SmoothingParams {
        alpha: x[0],
        beta: x[1],
        gamma: matches!(shape, Shape::TrendSeasonal { .. }).then_some(x[2]),
    };
    let sse = run_filter(data, shape, params).sse;
    if sse.is_finite() { sse } else { f64::INFINITY }
}

fn optimise(data: &[f64], shape: Shape) -> Result<SmoothingParams, AnalyticsError> {
    let seasonal = matches!(shape, Shape::TrendSeasonal { .. });
    let dims = if seasonal { 3 } else { 2 };
    let gammas: &[f64] = if seasonal { &GRID } else { &[0.0] };

    let mut best_x = [0.0; 3];
    let mut best = f64::INFINITY;
    for &alpha in &GRID {
        for &beta in &GRID {
            for &gamma in gammas {
                let x = [alpha, beta, gamma];
                let sse = objective(data, shape, &x);
                if sse < best {
                    best = sse;
                    best_x = x;
                }
            }
        }
    }
    if !best.is_finite() {
        return Err(AnalyticsError::fit_failed(
            "no smoothing parameters produced a finite error",
        ));
    }

    let mut step = INITIAL_STEP;
    let mut rounds = 0;
    while step > MIN_STEP && rounds < MAX_SEARCH_ROUNDS {
        rounds += 1;
        let mut improved = false;
        for d in 0..dims {
            for dir in [-1.0, 1.0] {
                let mut candidate = best_x;
                candidate[d] = (best_x[d] + dir * step).clamp(LOWER, UPPER);
                let sse = objective(data, shape, &candidate);
                if sse < best {
                    best = sse;
                    best_x = candidate;
                    improved = true;
                }
            }
        }
        if !improved {
            step /= 2.0;
        }
    }

    Ok(SmoothingParams {
        alpha: best_x[0],
        beta: best_x[1],
        gamma: seasonal.then_some(best_x[2]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_model_extrapolates_a_line() {
        let data: Vec<f64> = (0..30).map(|i| 10.0 + 2.0 * i as f64).collect();
        let model = FittedSmoothing::fit_trend(&data).unwrap();
        let fc = model.forecast(3);
        assert!((fc[0] - 70.0).abs() < 1e-6, "got {fc:?}");
        assert!((fc[2] - 74.0).abs() < 1e-6);
        assert!(model.sse() < 1e-9);
    }

    #[test]
    fn seasonal_model_repeats_the_cycle() {
        let period = 24;
        let data: Vec<f64> = (0..period * 4)
            .map(|i| 30.0 + if i % period < 12 { 10.0 } else { -10.0 })
            .collect();
        let model = FittedSmoothing::fit_trend_seasonal(&data, period).unwrap();
        let fc = model.forecast(period);
        // Data ends on a full cycle, so the next bucket is hour 0 (high half).
        assert!((fc[0] - 40.0).abs() < 0.5, "got {}", fc[0]);
        assert!((fc[18] - 20.0).abs() < 0.5, "got {}", fc[18]);
        assert!(model.params().gamma.is_some());
    }

    #[test]
    fn seasonal_index_follows_series_end() {
        let period = 4;
        // 2.5 cycles: the last observation is at phase 1, so the first forecast is phase 2.
        let pattern = [0.0, 5.0, 10.0, 5.0];
        let data: Vec<f64> = (0..10).map(|i| 100.0 + pattern[i % period]).collect();
        let model = FittedSmoothing::fit_trend_seasonal(&data, period).unwrap();
        let fc = model.forecast(2);
        assert!(fc[0] > fc[1], "phase 2 should exceed phase 3: {fc:?}");
    }

    #[test]
    fn parameters_stay_in_open_unit_interval() {
        let data: Vec<f64> = (0..60).map(|i| ((i * 37) % 13) as f64).collect();
        let p = FittedSmoothing::fit_trend(&data).unwrap().params();
        assert!(p.alpha > 0.0 && p.alpha < 1.0);
        assert!(p.beta > 0.0 && p.beta < 1.0);
        assert_eq!(p.gamma, None);
    }

    #[test]
    fn too_short_inputs_are_rejected() {
        assert!(matches!(
            FittedSmoothing::fit_trend(&[1.0, 2.0]),
            Err(AnalyticsError::InsufficientData { required: 3, actual: 2 })
        ));
        assert!(matches!(
            FittedSmoothing::fit_trend_seasonal(&[1.0; 47], 24),
            Err(AnalyticsError::InsufficientData { required: 48, .. })
        ));
    }
}
