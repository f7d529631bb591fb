//! Seasonal-trend decomposition using loess (STL), with optional robustness
//! iterations that down-weight outliers.
//!
//! Model: `y = trend + seasonal + residual`.
//! - Inner loop: cycle-subseries loess smoothing gives the seasonal component,
//!   a low-pass filter removes leakage of trend into it, and a loess fit of the
//!   deseasonalised series gives the trend.
//! - Outer loop (robust mode): bisquare weights computed from the residuals are
//!   fed back into the loess fits so a few large spikes do not bend the trend.
//!
//! Window sizes follow the usual defaults: seasonal span 7, trend span is the
//! smallest odd integer `>= 1.5 * period / (1 - 1.5 / seasonal)`, low-pass span is
//! the smallest odd integer `> period`. All loess fits are locally linear.

use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

const LOESS_DEGREE: usize = 1;
const ROBUST_INNER_ITERATIONS: usize = 2;
const ROBUST_OUTER_ITERATIONS: usize = 15;
const PLAIN_INNER_ITERATIONS: usize = 5;

/// Decomposed series components, aligned index-by-index with the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct StlConfig {
    pub period: usize,
    /// Span of the cycle-subseries smoother (odd, >= 3).
    pub seasonal_span: usize,
    pub robust: bool,
}

impl StlConfig {
    pub fn robust(period: usize) -> Self {
        Self {
            period,
            seasonal_span: 7,
            robust: true,
        }
    }

    pub fn trend_span(&self) -> usize {
        let raw = 1.5 * self.period as f64 / (1.0 - 1.5 / self.seasonal_span as f64);
        make_odd(raw.ceil() as usize)
    }

    pub fn low_pass_span(&self) -> usize {
        make_odd(self.period + 1)
    }
}

fn make_odd(x: usize) -> usize {
    if x % 2 == 0 { x + 1 } else { x }
}

/// Validated STL decomposer.
#[derive(Debug, Copy, Clone)]
pub struct Stl {
    config: StlConfig,
}

impl Stl {
    pub fn new(config: StlConfig) -> Result<Self, AnalyticsError> {
        if config.period < 2 {
            return Err(AnalyticsError::invalid_input("period must be >= 2"));
        }
        if config.seasonal_span < 3 || config.seasonal_span % 2 == 0 {
            return Err(AnalyticsError::invalid_input(
                "seasonal span must be an odd integer >= 3",
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &StlConfig {
        &self.config
    }

    /// Decompose `y`. Series shorter than two periods still decompose, but the
    /// seasonal estimate rests on one or two points per subseries.
    pub fn decompose(&self, y: &[f64]) -> Result<Decomposition, AnalyticsError> {
        if y.is_empty() {
            return Err(AnalyticsError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(AnalyticsError::invalid_input("series contains non-finite values"));
        }

        let n = y.len();
        let (inner, outer) = if self.config.robust {
            (ROBUST_INNER_ITERATIONS, ROBUST_OUTER_ITERATIONS)
        } else {
            (PLAIN_INNER_ITERATIONS, 0)
        };

        let mut trend = vec![0.0; n];
        let mut seasonal = vec![0.0; n];
        let mut robustness: Option<Vec<f64>> = None;

        for pass in 0..=outer {
            for _ in 0..inner {
                self.inner_step(y, robustness.as_deref(), &mut trend, &mut seasonal);
            }
            if pass == outer {
                break;
            }
            let fit: Vec<f64> = trend.iter().zip(&seasonal).map(|(t, s)| t + s).collect();
            robustness = Some(robustness_weights(y, &fit));
        }

        let residual = y
            .iter()
            .zip(&trend)
            .zip(&seasonal)
            .map(|((v, t), s)| v - t - s)
            .collect();

        Ok(Decomposition {
            trend,
            seasonal,
            residual,
        })
    }

    fn inner_step(
        &self,
        y: &[f64],
        robustness: Option<&[f64]>,
        trend: &mut [f64],
        seasonal: &mut [f64],
    ) {
        let period = self.config.period;

        let detrended: Vec<f64> = y.iter().zip(trend.iter()).map(|(v, t)| v - t).collect();
        let cycle = smooth_cycle_subseries(&detrended, period, self.config.seasonal_span, robustness);

        let filtered = moving_average(&moving_average(&moving_average(&cycle, period), period), 3);
        let low_pass = loess_smooth(&filtered, self.config.low_pass_span(), None);

        for (i, s) in seasonal.iter_mut().enumerate() {
            *s = cycle[period + i] - low_pass[i];
        }

        let deseasonalised: Vec<f64> = y.iter().zip(seasonal.iter()).map(|(v, s)| v - s).collect();
        let smoothed = loess_smooth(&deseasonalised, self.config.trend_span(), robustness);
        trend.copy_from_slice(&smoothed);
    }
}

/// Locally-linear tricube-weighted estimate at 1-based position `xs`, using the
/// points `nleft..=nright` (1-based). `None` when every weight vanishes.
#[allow(clippy::too_many_arguments)]
fn loess_estimate(
    y: &[f64],
    span: usize,
    xs: f64,
    nleft: usize,
    nright: usize,
    weights: &mut [f64],
    robustness: Option<&[f64]>,
) -> Option<f64> {
    let n = y.len();
    let range = n.saturating_sub(1) as f64;
    let mut h = (xs - nleft as f64).max(nright as f64 - xs);
    if span > n {
        h += ((span - n) / 2) as f64;
    }
    let h9 = 0.999 * h;
    let h1 = 0.001 * h;

    let mut total = 0.0;
    for j in nleft..=nright {
        let idx = j - 1;
        weights[idx] = 0.0;
        let r = (j as f64 - xs).abs();
        if r <= h9 {
            let mut w = if r <= h1 {
                1.0
            } else {
                (1.0 - (r / h).powi(3)).powi(3)
            };
            if let Some(rw) = robustness {
                w *= rw[idx];
            }
            weights[idx] = w;
            total += w;
        }
    }
    if total <= 0.0 {
        return None;
    }
    for w in &mut weights[nleft - 1..nright] {
        *w /= total;
    }

    if h > 0.0 && LOESS_DEGREE > 0 {
        let center: f64 = (nleft..=nright).map(|j| weights[j - 1] * j as f64).sum();
        let spread: f64 = (nleft..=nright)
            .map(|j| weights[j - 1] * (j as f64 - center).powi(2))
            .sum();
        if spread.sqrt() > 0.001 * range {
            let slope = (xs - center) / spread;
            for j in nleft..=nright {
                weights[j - 1] *= slope * (j as f64 - center) + 1.0;
            }
        }
    }

    Some((nleft..=nright).map(|j| weights[j - 1] * y[j - 1]).sum())
}

/// Loess smooth evaluated at every point with a sliding window of `span` points.
fn loess_smooth(y: &[f64], span: usize, robustness: Option<&[f64]>) -> Vec<f64> {
    let n = y.len();
    if n < 2 {
        return y.to_vec();
    }
    let mut out = vec![0.0; n];
    let mut weights = vec![0.0; n];
    let (mut nleft, mut nright) = if span >= n { (1, n) } else { (1, span) };
    let half = (span + 1) / 2;

    for i in 1..=n {
        if span < n && i > half && nright != n {
            nleft += 1;
            nright += 1;
        }
        out[i - 1] = loess_estimate(y, span, i as f64, nleft, nright, &mut weights, robustness)
            .unwrap_or(y[i - 1]);
    }
    out
}

/// Smooth each cycle-subseries and extend it one period on each side.
///
/// Returns `n + 2 * period` values: index `period + i` lines up with input `i`.
fn smooth_cycle_subseries(
    w: &[f64],
    period: usize,
    span: usize,
    robustness: Option<&[f64]>,
) -> Vec<f64> {
    let n = w.len();
    let mut out = vec![0.0; n + 2 * period];

    for j in 0..period.min(n) {
        let sub: Vec<f64> = w.iter().skip(j).step_by(period).copied().collect();
        let sub_rw: Option<Vec<f64>> =
            robustness.map(|rw| rw.iter().skip(j).step_by(period).copied().collect());
        let sub_rw = sub_rw.as_deref();
        let k = sub.len();

        let smoothed = loess_smooth(&sub, span, sub_rw);
        let mut weights = vec![0.0; k];

        let before = loess_estimate(&sub, span, 0.0, 1, span.min(k), &mut weights, sub_rw)
            .unwrap_or(smoothed[0]);
        let nleft = if k > span { k - span + 1 } else { 1 };
        let after = loess_estimate(&sub, span, (k + 1) as f64, nleft, k, &mut weights, sub_rw)
            .unwrap_or(smoothed[k - 1]);

        out[j] = before;
        for (m, v) in smoothed.iter().enumerate() {
            out[(m + 1) * period + j] = *v;
        }
        out[(k + 1) * period + j] = after;
    }
    out
}

fn moving_average(x: &[f64], len: usize) -> Vec<f64> {
    if len == 0 || x.len() < len {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(x.len() - len + 1);
    let mut sum: f64 = x[..len].iter().sum();
    out.push(sum / len as f64);
    for i in len..x.len() {
        sum += x[i] - x[i - len];
        out.push(sum / len as f64);
    }
    out
}

/// Bisquare robustness weights from residuals `y - fit`, scaled by six times the
/// median absolute residual.
fn robustness_weights(y: &[f64], fit: &[f64]) -> Vec<f64> {
    let abs_resid: Vec<f64> = y.iter().zip(fit).map(|(v, f)| (v - f).abs()).collect();
    let h = 6.0 * crate::stats::median(&abs_resid).unwrap_or(0.0);
    let c9 = 0.999 * h;
    let c1 = 0.001 * h;
    abs_resid
        .iter()
        .map(|&r| {
            if r <= c1 {
                1.0
            } else if r <= c9 {
                (1.0 - (r / h).powi(2)).powi(2)
            } else {
                0.0
            }
        })
        .collect()
}
