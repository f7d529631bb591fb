use thiserror::Error;

use demandlens_core::DomainError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyticsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Zero-variance input or decomposition; z-scores are meaningless.
    #[error("degenerate series: {0}")]
    DegenerateSeries(String),

    #[error("model fit failed: {0}")]
    FitFailed(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl AnalyticsError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateSeries(msg.into())
    }

    pub fn fit_failed(msg: impl Into<String>) -> Self {
        Self::FitFailed(msg.into())
    }
}
