//! Infrastructure layer: table ingestion, per-group orchestration and report output.
//!
//! The numeric work lives in `demandlens-analytics` and `demandlens-inventory`;
//! this crate owns everything that touches files, configuration and run wiring.

pub mod error;
pub mod ingest;
pub mod output;
pub mod pipeline;

#[cfg(test)]
mod integration_tests;

pub use error::{ConfigError, IngestError, PipelineError};
pub use output::{CsvDirectorySink, InMemoryReportSink, OutputLocations, ReportSink, ReportTables};
pub use pipeline::{run_forecast_pipeline, ForecastRunResult, PipelineConfig, PipelineOrchestrator};
