use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use tracing::debug;

use crate::error::PipelineError;
use crate::output::tables::{
    ForecastRecord, InventorySuggestionRecord, ReportTables, SpikeRecord, SummaryRecord, TableRow,
};

/// Where each of the four tables ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputLocations {
    pub spike_file: String,
    pub summary_file: String,
    pub suggestion_file: String,
    pub forecast_file: String,
}

impl OutputLocations {
    /// Locations as `<prefix>/<file name>` for each table.
    pub fn with_prefix(prefix: &str) -> Self {
        let at = |name: &str| format!("{}/{}", prefix.trim_end_matches('/'), name);
        Self {
            spike_file: at(SpikeRecord::FILE_NAME),
            summary_file: at(SummaryRecord::FILE_NAME),
            suggestion_file: at(InventorySuggestionRecord::FILE_NAME),
            forecast_file: at(ForecastRecord::FILE_NAME),
        }
    }

    pub fn file_names() -> [&'static str; 4] {
        [
            SpikeRecord::FILE_NAME,
            SummaryRecord::FILE_NAME,
            InventorySuggestionRecord::FILE_NAME,
            ForecastRecord::FILE_NAME,
        ]
    }
}

/// Destination for a finished run's tables.
pub trait ReportSink: Send + Sync {
    fn publish(&self, tables: &ReportTables) -> Result<OutputLocations, PipelineError>;
}

/// Writes the four tables as CSV files into one directory, overwriting
/// previous runs.
///
/// All four tables are first written to hidden staging files beside their
/// targets; only when every one of them is complete are they renamed into
/// place. A failed write leaves the previous run's tables untouched.
#[derive(Debug, Clone)]
pub struct CsvDirectorySink {
    dir: PathBuf,
}

/// A fully written table waiting to be renamed over its target.
#[derive(Debug)]
struct StagedTable {
    staging: PathBuf,
    target: PathBuf,
    rows: usize,
}

impl CsvDirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn staging_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(format!(".{file_name}.tmp"))
    }

    fn stage_table<T: TableRow>(&self, rows: &[T]) -> Result<StagedTable, PipelineError> {
        let staging = self.staging_path(T::FILE_NAME);

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&staging)
            .map_err(|source| encode_error(T::FILE_NAME, source))?;
        wtr.write_record(T::HEADERS)
            .map_err(|source| encode_error(T::FILE_NAME, source))?;
        for row in rows {
            wtr.serialize(row)
                .map_err(|source| encode_error(T::FILE_NAME, source))?;
        }
        wtr.flush().map_err(|source| PipelineError::Output {
            path: staging.clone(),
            source,
        })?;

        Ok(StagedTable {
            staging,
            target: self.dir.join(T::FILE_NAME),
            rows: rows.len(),
        })
    }

    fn stage_all(&self, tables: &ReportTables) -> Result<[StagedTable; 4], PipelineError> {
        Ok([
            self.stage_table(&tables.spikes)?,
            self.stage_table(&tables.summary)?,
            self.stage_table(&tables.suggestions)?,
            self.stage_table(&tables.forecasts)?,
        ])
    }

    fn discard_staging(&self) {
        for name in OutputLocations::file_names() {
            let _ = fs::remove_file(self.staging_path(name));
        }
    }
}

impl ReportSink for CsvDirectorySink {
    fn publish(&self, tables: &ReportTables) -> Result<OutputLocations, PipelineError> {
        fs::create_dir_all(&self.dir).map_err(|source| PipelineError::Output {
            path: self.dir.clone(),
            source,
        })?;

        let staged = match self.stage_all(tables) {
            Ok(staged) => staged,
            Err(e) => {
                self.discard_staging();
                return Err(e);
            }
        };

        for table in &staged {
            fs::rename(&table.staging, &table.target).map_err(|source| PipelineError::Output {
                path: table.target.clone(),
                source,
            })?;
            debug!(file = %table.target.display(), rows = table.rows, "wrote report table");
        }

        let [spikes, summary, suggestions, forecasts] = staged;
        Ok(OutputLocations {
            spike_file: spikes.target.display().to_string(),
            summary_file: summary.target.display().to_string(),
            suggestion_file: suggestions.target.display().to_string(),
            forecast_file: forecasts.target.display().to_string(),
        })
    }
}

fn encode_error(table: &'static str, source: csv::Error) -> PipelineError {
    PipelineError::Encode { table, source }
}

/// Keeps every published set of tables in memory (tests / embedding).
#[derive(Debug, Default)]
pub struct InMemoryReportSink {
    inner: Mutex<Vec<ReportTables>>,
}

impl InMemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<ReportTables> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn last(&self) -> Option<ReportTables> {
        self.all().pop()
    }
}

impl ReportSink for InMemoryReportSink {
    fn publish(&self, tables: &ReportTables) -> Result<OutputLocations, PipelineError> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(tables.clone());
        Ok(OutputLocations::with_prefix("memory:"))
    }
}
