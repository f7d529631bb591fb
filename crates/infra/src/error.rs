//! Fatal (whole-run) error model.
//!
//! Anything here aborts a run before any output table is written. Per-group
//! failures are not errors at this level; see [`crate::pipeline::GroupError`].

use std::path::PathBuf;

use thiserror::Error;

use demandlens_analytics::AnalyticsError;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("missing {column} column in {table} table")]
    MissingColumn { table: &'static str, column: String },

    #[error("{table} table line {line}: {reason}")]
    Parse {
        table: &'static str,
        line: u64,
        reason: String,
    },

    #[error("failed to read {table} table: {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IngestError {
    pub fn missing(table: &'static str, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            table,
            column: column.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("series alignment failed: {0}")]
    Alignment(#[from] AnalyticsError),

    #[error("failed to write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {table}: {source}")]
    Encode {
        table: &'static str,
        #[source]
        source: csv::Error,
    },
}
