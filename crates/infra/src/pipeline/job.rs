use thiserror::Error;
use tracing::warn;

use demandlens_analytics::stats::{self, round_to};
use demandlens_analytics::{AnalyticsError, AnalyticsJob, DemandForecaster, SpikeDetector};
use demandlens_core::{AlignedSeries, GroupKey};
use demandlens_inventory::{
    DemandStats, InventoryError, InventoryOptimizer, InventoryParams, ReplenishmentPolicy,
};

use crate::output::{ForecastRecord, InventorySuggestionRecord, SpikeRecord, SummaryRecord};

/// Why one group was left out of a run.
#[derive(Debug, Error)]
pub enum GroupError {
    #[error("spike detection failed: {0}")]
    Spike(#[source] AnalyticsError),

    #[error("forecast failed: {0}")]
    Forecast(#[source] AnalyticsError),

    #[error("replenishment failed: {0}")]
    Inventory(#[from] InventoryError),
}

/// Read-only components shared by every group of a run.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub detector: SpikeDetector,
    pub forecaster: DemandForecaster,
    pub optimizer: InventoryOptimizer,
    pub policy: ReplenishmentPolicy,
}

/// All output rows for one successfully analysed group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupReport {
    pub spikes: Vec<SpikeRecord>,
    pub summary: SummaryRecord,
    pub suggestions: Vec<InventorySuggestionRecord>,
    pub forecasts: Vec<ForecastRecord>,
    /// Fewer than two seasonal periods of history; spike scores are unreliable.
    pub low_confidence: bool,
}

/// Spike detection, forecasting and replenishment for one group.
///
/// The job either yields every row for its group or none of them.
#[derive(Debug, Clone)]
pub struct GroupAnalysisJob<'a> {
    key: GroupKey,
    hourly: AlignedSeries,
    daily: AlignedSeries,
    params: Option<&'a InventoryParams>,
    ctx: &'a AnalysisContext,
}

impl<'a> GroupAnalysisJob<'a> {
    pub fn new(
        key: GroupKey,
        hourly: AlignedSeries,
        daily: AlignedSeries,
        params: Option<&'a InventoryParams>,
        ctx: &'a AnalysisContext,
    ) -> Self {
        Self {
            key,
            hourly,
            daily,
            params,
            ctx,
        }
    }

    fn daily_stats(&self) -> DemandStats {
        let values = self.daily.values();
        DemandStats {
            avg_daily: stats::mean(values),
            std_daily: stats::stddev_sample(values).unwrap_or(f64::NAN),
        }
    }

    fn summary(&self, spike_count: usize) -> SummaryRecord {
        let values = self.hourly.values();
        SummaryRecord {
            product_id: self.key.product_id.clone(),
            product_name: self.key.product_name.clone(),
            location: self.key.location.clone(),
            avg_hourly: round_to(stats::mean(values), 2),
            max_hourly: stats::max(values).map(truncate).unwrap_or_default(),
            min_hourly: stats::min(values).map(truncate).unwrap_or_default(),
            var_hourly: stats::variance_sample(values).map(|v| round_to(v, 2)),
            spike_count,
        }
    }
}

impl AnalyticsJob for GroupAnalysisJob<'_> {
    type Output = GroupReport;
    type Error = GroupError;

    fn key(&self) -> &GroupKey {
        &self.key
    }

    fn run(&self) -> Result<GroupReport, GroupError> {
        let scan = self.ctx.detector.detect(&self.hourly).map_err(GroupError::Spike)?;
        if scan.low_confidence {
            warn!(
                product_id = %self.key.product_id,
                product_name = %self.key.product_name,
                location = %self.key.location,
                observations = self.hourly.len(),
                period = self.ctx.detector.period(),
                "short history; spike scores are low-confidence"
            );
        }

        let forecast = self
            .ctx
            .forecaster
            .forecast(&self.hourly)
            .map_err(GroupError::Forecast)?;

        let decision = self.ctx.optimizer.decide(self.daily_stats(), self.params)?;

        let spikes = scan
            .spikes
            .iter()
            .map(|s| SpikeRecord {
                timestamp: s.timestamp,
                product_id: self.key.product_id.clone(),
                product_name: self.key.product_name.clone(),
                location: self.key.location.clone(),
                z_score: s.z_score,
                quantity: truncate(s.quantity),
                surge_percent: s.surge_percent,
            })
            .collect();

        let mut suggestions = Vec::with_capacity(forecast.points.len());
        let mut forecasts = Vec::with_capacity(forecast.points.len());
        for point in &forecast.points {
            let suggestion = self.ctx.policy.suggest(point.quantity);
            suggestions.push(InventorySuggestionRecord {
                product_id: self.key.product_id.clone(),
                product_name: self.key.product_name.clone(),
                location: self.key.location.clone(),
                timestamp: point.timestamp,
                predicted_demand: suggestion.predicted_demand,
                suggested_stock: suggestion.suggested_stock,
                order_recommendation: decision.recommendation.as_str().to_string(),
                reorder_point: decision.reorder_point,
                eoq: decision.eoq,
            });
            forecasts.push(ForecastRecord {
                timestamp: point.timestamp,
                forecasted_quantity: point.quantity,
                product_id: self.key.product_id.clone(),
                product_name: self.key.product_name.clone(),
                location: self.key.location.clone(),
            });
        }

        Ok(GroupReport {
            spikes,
            summary: self.summary(scan.candidate_count),
            suggestions,
            forecasts,
            low_confidence: scan.low_confidence,
        })
    }
}

fn truncate(x: f64) -> i64 {
    if x.is_finite() { x.trunc() as i64 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use demandlens_core::Frequency;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn ctx() -> AnalysisContext {
        AnalysisContext {
            detector: SpikeDetector::new(24, 1.8).unwrap(),
            forecaster: DemandForecaster::hourly_default(),
            optimizer: InventoryOptimizer,
            policy: ReplenishmentPolicy::default(),
        }
    }

    fn hourly(days: usize) -> Vec<f64> {
        (0..days * 24)
            .map(|i| {
                let hour = (i % 24) as f64;
                10.0 + 4.0 * (hour / 24.0 * std::f64::consts::TAU).sin() + (i % 5) as f64 * 0.3
            })
            .collect()
    }

    fn daily_of(values: &[f64]) -> AlignedSeries {
        let days: Vec<f64> = values.chunks(24).map(|c| c.iter().sum()).collect();
        AlignedSeries::new(Frequency::Daily, start(), days).unwrap()
    }

    fn params(current_stock: f64) -> InventoryParams {
        InventoryParams {
            product_id: "P1".into(),
            location: "North".into(),
            current_stock,
            lead_time_days: 5.0,
            order_cost: 50.0,
            holding_cost_per_unit_per_year: 2.0,
            service_level: 0.95,
        }
    }

    fn key() -> GroupKey {
        GroupKey::new("P1", "Widget", "North")
    }

    #[test]
    fn produces_one_row_per_forecast_bucket() {
        let mut values = hourly(4);
        values[60] = 80.0;
        let ctx = ctx();
        let p = params(0.0);
        let job = GroupAnalysisJob::new(
            key(),
            AlignedSeries::new(Frequency::Hourly, start(), values.clone()).unwrap(),
            daily_of(&values),
            Some(&p),
            &ctx,
        );
        let report = job.run().unwrap();

        assert_eq!(report.forecasts.len(), 24);
        assert_eq!(report.suggestions.len(), 24);
        assert!(report.suggestions.iter().all(|s| s.order_recommendation == "ORDER"));
        assert!(report.spikes.iter().any(|s| s.quantity == 80));
        assert!(report.summary.spike_count >= report.spikes.len());
        assert_eq!(report.summary.max_hourly, 80);
        assert_eq!(report.forecasts[0].timestamp, start() + chrono::Duration::hours(96));
    }

    #[test]
    fn missing_inventory_row_is_unknown() {
        let values = hourly(3);
        let ctx = ctx();
        let job = GroupAnalysisJob::new(
            key(),
            AlignedSeries::new(Frequency::Hourly, start(), values.clone()).unwrap(),
            daily_of(&values),
            None,
            &ctx,
        );
        let report = job.run().unwrap();
        assert!(report.suggestions.iter().all(|s| {
            s.order_recommendation == "UNKNOWN" && s.reorder_point == 0 && s.eoq == 0
        }));
    }

    #[test]
    fn flat_series_fails_without_rows() {
        let values = vec![0.0; 72];
        let ctx = ctx();
        let job = GroupAnalysisJob::new(
            key(),
            AlignedSeries::new(Frequency::Hourly, start(), values.clone()).unwrap(),
            daily_of(&values),
            None,
            &ctx,
        );
        assert!(matches!(job.run(), Err(GroupError::Spike(_))));
    }

    #[test]
    fn invalid_parameters_fail_the_group() {
        let values = hourly(3);
        let ctx = ctx();
        let mut p = params(10.0);
        p.holding_cost_per_unit_per_year = 0.0;
        let job = GroupAnalysisJob::new(
            key(),
            AlignedSeries::new(Frequency::Hourly, start(), values.clone()).unwrap(),
            daily_of(&values),
            Some(&p),
            &ctx,
        );
        assert!(matches!(job.run(), Err(GroupError::Inventory(_))));
    }

    #[test]
    fn single_day_history_holds_with_zero_reorder_point() {
        let values: Vec<f64> = hourly(2).into_iter().take(30).collect();
        let total: f64 = values.iter().sum();
        let ctx = ctx();
        let p = params(0.0);
        let job = GroupAnalysisJob::new(
            key(),
            AlignedSeries::new(Frequency::Hourly, start(), values).unwrap(),
            AlignedSeries::new(Frequency::Daily, start(), vec![total]).unwrap(),
            Some(&p),
            &ctx,
        );
        let report = job.run().unwrap();
        let first = &report.suggestions[0];
        assert_eq!(first.order_recommendation, "HOLD");
        assert_eq!(first.reorder_point, 0);
        assert!(first.eoq > 0);
    }

    #[test]
    fn short_history_is_flagged_low_confidence() {
        let values: Vec<f64> = hourly(2).into_iter().take(30).collect();
        let ctx = ctx();
        let job = GroupAnalysisJob::new(
            key(),
            AlignedSeries::new(Frequency::Hourly, start(), values.clone()).unwrap(),
            daily_of(&values),
            None,
            &ctx,
        );
        assert!(job.run().unwrap().low_confidence);

        let values = hourly(3);
        let job = GroupAnalysisJob::new(
            key(),
            AlignedSeries::new(Frequency::Hourly, start(), values.clone()).unwrap(),
            daily_of(&values),
            None,
            &ctx,
        );
        assert!(!job.run().unwrap().low_confidence);
    }

    #[test]
    fn dip_candidates_count_in_summary_but_are_not_reported() {
        // Strong daily cycle; a bump at a trough hour is a large positive residual
        // while still sitting below the series mean.
        let mut values: Vec<f64> = (0..24 * 5)
            .map(|i| {
                let hour = (i % 24) as f64;
                let jitter = ((i * 7919) % 11) as f64 / 5.0 - 1.0;
                100.0 + 80.0 * (hour / 24.0 * std::f64::consts::TAU).sin() + jitter
            })
            .collect();
        let bump = 24 * 2 + 18;
        values[bump] += 45.0;

        let ctx = ctx();
        let job = GroupAnalysisJob::new(
            key(),
            AlignedSeries::new(Frequency::Hourly, start(), values.clone()).unwrap(),
            daily_of(&values),
            None,
            &ctx,
        );
        let report = job.run().unwrap();

        let bump_ts = start() + chrono::Duration::hours(bump as i64);
        assert!(report.spikes.iter().all(|s| s.timestamp != bump_ts));
        assert_eq!(report.summary.spike_count, report.spikes.len() + 1);
    }
}
