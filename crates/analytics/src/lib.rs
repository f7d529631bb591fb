//! `demandlens-analytics`
//!
//! **Responsibility:** per-series statistics for the demand pipeline.
//!
//! This crate is deliberately unaware of inventory policy and file formats:
//! - It turns sales events into aligned series and series into spikes/forecasts.
//! - It never performs IO.
//! - Replenishment math lives in `demandlens-inventory`; wiring lives in infra.

pub mod aligner;
pub mod error;
pub mod forecast;
pub mod job;
pub mod scheduler;
pub mod smoothing;
pub mod spike;
pub mod stats;
pub mod stl;

pub use aligner::SeriesAligner;
pub use error::AnalyticsError;
pub use forecast::{DemandForecaster, Forecast, ForecastModel, ForecastPoint};
pub use job::{AnalyticsJob, GroupFailure};
pub use scheduler::{GroupScheduler, LocalScheduler, ThreadedScheduler};
pub use smoothing::{FittedSmoothing, SmoothingParams};
pub use spike::{Spike, SpikeDetector, SpikeScan};
pub use stl::{Decomposition, Stl, StlConfig};
