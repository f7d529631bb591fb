use std::path::Path;

use serde::Serialize;
use tracing::{info, info_span, warn};

use demandlens_analytics::{
    GroupFailure, GroupScheduler, LocalScheduler, SeriesAligner, ThreadedScheduler,
};
use demandlens_core::{RawSaleEvent, RunId};
use demandlens_inventory::{InventoryBook, InventoryOptimizer, InventoryParams};

use crate::error::PipelineError;
use crate::ingest::{load_inventory_file, load_sales_file};
use crate::output::{CsvDirectorySink, OutputLocations, ReportSink, ReportTables};
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::job::{AnalysisContext, GroupAnalysisJob};

/// Result descriptor of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastRunResult {
    #[serde(skip)]
    pub run_id: RunId,
    #[serde(flatten)]
    pub locations: OutputLocations,
    /// Spike rows emitted across all groups.
    pub spike_count: usize,
    /// Groups that produced output.
    pub products_analyzed: usize,
    #[serde(skip)]
    pub failures: Vec<GroupFailure>,
}

/// Drives one run: load, align, analyse every group, publish four tables.
///
/// Fatal errors (bad config, unreadable or malformed inputs) abort before the
/// sink sees anything. Per-group failures are logged and the group is left out.
#[derive(Debug, Clone)]
pub struct PipelineOrchestrator<S, K> {
    config: PipelineConfig,
    scheduler: S,
    sink: K,
}

impl<S: GroupScheduler, K: ReportSink> PipelineOrchestrator<S, K> {
    pub fn new(config: PipelineConfig, scheduler: S, sink: K) -> Self {
        Self {
            config,
            scheduler,
            sink,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Load both tables from disk, then run.
    pub fn run_files(
        &self,
        sales_path: &Path,
        inventory_path: &Path,
    ) -> Result<ForecastRunResult, PipelineError> {
        let run_id = RunId::new();
        let span = info_span!("pipeline_run", run_id = %run_id);
        let _guard = span.enter();

        self.config.validate()?;
        let sales = load_sales_file(sales_path)?;
        let inventory = load_inventory_file(inventory_path, &self.config.policy())?;
        self.execute(run_id, &sales.events, inventory)
    }

    /// Run over already-loaded records.
    pub fn run(
        &self,
        events: &[RawSaleEvent],
        inventory: Vec<InventoryParams>,
    ) -> Result<ForecastRunResult, PipelineError> {
        let run_id = RunId::new();
        let span = info_span!("pipeline_run", run_id = %run_id);
        let _guard = span.enter();

        self.config.validate()?;
        self.execute(run_id, events, inventory)
    }

    fn execute(
        &self,
        run_id: RunId,
        events: &[RawSaleEvent],
        inventory: Vec<InventoryParams>,
    ) -> Result<ForecastRunResult, PipelineError> {
        let ctx = AnalysisContext {
            detector: self.config.spike_detector()?,
            forecaster: self.config.forecaster()?,
            optimizer: InventoryOptimizer,
            policy: self.config.policy(),
        };

        let hourly = SeriesAligner::hourly().align(events)?;
        let mut daily = SeriesAligner::daily().align(events)?;

        let (book, duplicates) = InventoryBook::from_rows(inventory);
        for dup in &duplicates {
            warn!(
                product_id = %dup.product_id,
                location = %dup.location,
                "duplicate inventory row ignored; the first row for this product and location is used"
            );
        }
        info!(
            events = events.len(),
            groups = hourly.len(),
            inventory_rows = book.len(),
            workers = self.config.workers,
            "starting group analysis"
        );

        let mut jobs = Vec::with_capacity(hourly.len());
        for (key, hourly_series) in hourly {
            let Some(daily_series) = daily.remove(&key) else {
                warn!(group = %key, "no daily series for group; skipping");
                continue;
            };
            let params = book.for_group(&key);
            jobs.push(GroupAnalysisJob::new(key, hourly_series, daily_series, params, &ctx));
        }

        let mut tables = ReportTables::default();
        let mut failures = Vec::new();
        let mut products_analyzed = 0usize;
        let mut low_confidence_groups = 0usize;
        for outcome in self.scheduler.run_all(jobs) {
            match outcome {
                Ok(report) => {
                    products_analyzed += 1;
                    low_confidence_groups += usize::from(report.low_confidence);
                    tables.spikes.extend(report.spikes);
                    tables.summary.push(report.summary);
                    tables.suggestions.extend(report.suggestions);
                    tables.forecasts.extend(report.forecasts);
                }
                Err(failure) => {
                    warn!(
                        product_id = %failure.key.product_id,
                        product_name = %failure.key.product_name,
                        location = %failure.key.location,
                        error = %failure.reason,
                        panicked = failure.panicked,
                        "skipping group"
                    );
                    failures.push(failure);
                }
            }
        }

        let spike_count = tables.spikes.len();
        let locations = self.sink.publish(&tables)?;
        info!(
            spike_count,
            products_analyzed,
            groups_skipped = failures.len(),
            low_confidence_groups,
            "pipeline run complete"
        );

        Ok(ForecastRunResult {
            run_id,
            locations,
            spike_count,
            products_analyzed,
            failures,
        })
    }
}

/// Run the pipeline over two CSV files and write the four tables to `output_dir`.
pub fn run_forecast_pipeline(
    sales_path: &Path,
    inventory_path: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
) -> Result<ForecastRunResult, PipelineError> {
    let sink = CsvDirectorySink::new(output_dir);
    if config.workers > 1 {
        PipelineOrchestrator::new(config.clone(), ThreadedScheduler::new(config.workers), sink)
            .run_files(sales_path, inventory_path)
    } else {
        PipelineOrchestrator::new(config.clone(), LocalScheduler, sink)
            .run_files(sales_path, inventory_path)
    }
}
