//! Run orchestration: configuration, the per-group job and the orchestrator.

pub mod config;
pub mod job;
pub mod runner;

pub use config::PipelineConfig;
pub use job::{AnalysisContext, GroupAnalysisJob, GroupError, GroupReport};
pub use runner::{run_forecast_pipeline, ForecastRunResult, PipelineOrchestrator};
