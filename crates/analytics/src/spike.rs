use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use demandlens_core::AlignedSeries;

use crate::error::AnalyticsError;
use crate::stats::{mean, round_to, stddev_sample, variance_sample};
use crate::stl::{Stl, StlConfig};

/// Residual spread below this (relative to the series' own spread) counts as a
/// zero-variance decomposition.
const DEGENERATE_RELATIVE_STD: f64 = 1e-9;

/// A demand surge flagged by [`SpikeDetector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spike {
    pub timestamp: NaiveDateTime,
    /// Residual z-score, rounded to 2 decimals.
    pub z_score: f64,
    /// Observed quantity in the bucket.
    pub quantity: f64,
    /// Percentage above the series mean, rounded to 1 decimal. Never negative.
    pub surge_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeScan {
    pub spikes: Vec<Spike>,
    /// Timestamps whose z-score crossed the threshold, before dips were dropped.
    pub candidate_count: usize,
    /// Fewer than two full periods were available.
    pub low_confidence: bool,
}

/// Residual z-score spike detection on an hourly series.
///
/// Model:
/// - Robust STL decomposition with the configured seasonal period.
/// - `z = (resid - mean(resid)) / std(resid)` for every bucket.
/// - Candidates are buckets with `z > z_threshold` (one-sided).
/// - A candidate whose surge over the series mean computes negative is dropped
///   after selection, so a large residual can be flagged by z but never reported.
#[derive(Debug, Clone)]
pub struct SpikeDetector {
    stl: Stl,
    z_threshold: f64,
}

impl SpikeDetector {
    pub fn new(period: usize, z_threshold: f64) -> Result<Self, AnalyticsError> {
        if !(z_threshold.is_finite() && z_threshold > 0.0) {
            return Err(AnalyticsError::invalid_input(
                "z_threshold must be a finite positive number",
            ));
        }
        Ok(Self {
            stl: Stl::new(StlConfig::robust(period))?,
            z_threshold,
        })
    }

    pub fn period(&self) -> usize {
        self.stl.config().period
    }

    pub fn z_threshold(&self) -> f64 {
        self.z_threshold
    }

    pub fn detect(&self, series: &AlignedSeries) -> Result<SpikeScan, AnalyticsError> {
        let values = series.values();
        let series_std = match stddev_sample(values) {
            Some(s) if s.is_finite() && s > 0.0 => s,
            _ => {
                return Err(AnalyticsError::degenerate(
                    "series has zero variance; residual z-scores are undefined",
                ));
            }
        };

        let low_confidence = values.len() < 2 * self.period();
        if low_confidence {
            debug!(
                observations = values.len(),
                period = self.period(),
                "series shorter than two periods; spike scores are low-confidence"
            );
        }

        let decomposition = self.stl.decompose(values)?;
        let resid = &decomposition.residual;
        let resid_mean = mean(resid);
        let resid_std = variance_sample(resid).map(f64::sqrt).unwrap_or(f64::NAN);
        if !(resid_std.is_finite() && resid_std > DEGENERATE_RELATIVE_STD * series_std) {
            return Err(AnalyticsError::degenerate(
                "decomposition residual has zero variance",
            ));
        }

        let series_mean = mean(values);
        let mut spikes = Vec::new();
        let mut candidate_count = 0;

        for (i, r) in resid.iter().enumerate() {
            let z = (r - resid_mean) / resid_std;
            if z <= self.z_threshold {
                continue;
            }
            candidate_count += 1;

            let quantity = values[i];
            let surge_percent = if series_mean == 0.0 {
                0.0
            } else {
                round_to((quantity / series_mean - 1.0) * 100.0, 1)
            };
            if surge_percent < 0.0 {
                continue;
            }

            spikes.push(Spike {
                timestamp: series.timestamp_at(i),
                z_score: round_to(z, 2),
                quantity,
                surge_percent,
            });
        }

        Ok(SpikeScan {
            spikes,
            candidate_count,
            low_confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use demandlens_core::Frequency;
    use proptest::prelude::*;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn hourly(values: Vec<f64>) -> AlignedSeries {
        AlignedSeries::new(Frequency::Hourly, start(), values).unwrap()
    }

    /// Daily pattern with mild deterministic jitter.
    fn baseline(hours: usize) -> Vec<f64> {
        (0..hours)
            .map(|i| {
                let hour = (i % 24) as f64;
                let jitter = ((i * 7919) % 11) as f64 / 5.0 - 1.0;
                20.0 + 5.0 * (hour / 24.0 * std::f64::consts::TAU).sin() + jitter
            })
            .collect()
    }

    #[test]
    fn flags_injected_surge() {
        let mut values = baseline(24 * 5);
        values[50] += 90.0;
        let scan = SpikeDetector::new(24, 1.8).unwrap().detect(&hourly(values)).unwrap();

        let spike = scan
            .spikes
            .iter()
            .find(|s| s.timestamp == start() + chrono::Duration::hours(50))
            .expect("surge at hour 50 should be flagged");
        assert!(spike.z_score > 1.8);
        assert!(spike.surge_percent > 100.0);
        assert!(!scan.low_confidence);
        assert!(scan.candidate_count >= scan.spikes.len());
    }

    #[test]
    fn all_zero_series_is_degenerate() {
        let err = SpikeDetector::new(24, 1.8)
            .unwrap()
            .detect(&hourly(vec![0.0; 72]))
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::DegenerateSeries(_)));
    }

    #[test]
    fn constant_series_is_degenerate() {
        let result = SpikeDetector::new(24, 1.8).unwrap().detect(&hourly(vec![7.0; 60]));
        assert!(matches!(result, Err(AnalyticsError::DegenerateSeries(_))));
    }

    #[test]
    fn short_series_runs_with_low_confidence() {
        let mut values = baseline(30);
        values[12] += 40.0;
        let scan = SpikeDetector::new(24, 1.8).unwrap().detect(&hourly(values)).unwrap();
        assert!(scan.low_confidence);
    }

    #[test]
    fn candidate_below_the_mean_is_counted_then_dropped() {
        let mut values: Vec<f64> = (0..24 * 5)
            .map(|i| {
                let hour = (i % 24) as f64;
                let jitter = ((i * 7919) % 11) as f64 / 5.0 - 1.0;
                100.0 + 80.0 * (hour / 24.0 * std::f64::consts::TAU).sin() + jitter
            })
            .collect();
        // Trough hour: large residual, quantity still well under the mean.
        let bump = 24 * 2 + 18;
        values[bump] += 45.0;
        assert!(values[bump] < mean(&values));

        let scan = SpikeDetector::new(24, 1.8).unwrap().detect(&hourly(values)).unwrap();

        let bump_ts = start() + chrono::Duration::hours(bump as i64);
        assert!(scan.spikes.iter().all(|s| s.timestamp != bump_ts));
        assert_eq!(scan.candidate_count, scan.spikes.len() + 1);
    }

    #[test]
    fn rejects_non_positive_threshold() {
        assert!(SpikeDetector::new(24, 0.0).is_err());
        assert!(SpikeDetector::new(24, f64::NAN).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 48,
            ..ProptestConfig::default()
        })]

        /// Property: no reported spike ever carries a negative surge.
        #[test]
        fn surge_percent_is_never_negative(
            values in prop::collection::vec(0u32..200, 30..120)
        ) {
            let series = hourly(values.into_iter().map(f64::from).collect());
            if let Ok(scan) = SpikeDetector::new(24, 1.8).unwrap().detect(&series) {
                for spike in &scan.spikes {
                    prop_assert!(spike.surge_percent >= 0.0);
                    prop_assert!(spike.z_score > 1.79);
                }
                prop_assert!(scan.spikes.len() <= scan.candidate_count);
            }
        }
    }
}
