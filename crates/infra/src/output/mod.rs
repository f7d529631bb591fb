//! The four report tables and where they get written.

pub mod sink;
pub mod tables;

pub use sink::{CsvDirectorySink, InMemoryReportSink, OutputLocations, ReportSink};
pub use tables::{
    ForecastRecord, InventorySuggestionRecord, ReportTables, SpikeRecord, SummaryRecord, TableRow,
};
