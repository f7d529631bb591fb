use serde::Serialize;

use demandlens_infra::{ForecastRunResult, OutputLocations};

/// URL prefix the output tables are served under.
pub const OUTPUTS_PREFIX: &str = "/ml-outputs";

#[derive(Debug, Clone, Serialize)]
pub struct ForecastResponse {
    pub msg: String,
    pub spike_file: String,
    pub summary_file: String,
    pub suggestion_file: String,
    pub forecast_file: String,
    pub spike_count: usize,
    pub products_analyzed: usize,
}

impl From<&ForecastRunResult> for ForecastResponse {
    fn from(result: &ForecastRunResult) -> Self {
        let urls = OutputLocations::with_prefix(OUTPUTS_PREFIX);
        Self {
            msg: "Forecast complete".to_string(),
            spike_file: urls.spike_file,
            summary_file: urls.summary_file,
            suggestion_file: urls.suggestion_file,
            forecast_file: urls.forecast_file,
            spike_count: result.spike_count,
            products_analyzed: result.products_analyzed,
        }
    }
}
