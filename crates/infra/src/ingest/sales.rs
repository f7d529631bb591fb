use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info};

use demandlens_core::RawSaleEvent;

use crate::error::IngestError;
use crate::ingest::schema::SalesSchema;
use crate::ingest::timestamp::parse_timestamp;
use crate::ingest::{open, SALES_TABLE};

/// Sales events plus the schema they were read with.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesTable {
    pub schema: SalesSchema,
    pub events: Vec<RawSaleEvent>,
    /// Rows dropped for a blank timestamp or a blank grouping cell.
    pub skipped_rows: usize,
}

pub fn load_sales_file(path: &Path) -> Result<SalesTable, IngestError> {
    load_sales(open(path)?)
}

/// Read a sales table.
///
/// Headers are resolved before any row is parsed. Rows with a blank timestamp
/// or blank grouping cell are skipped; a blank quantity counts as 0. An
/// unparseable timestamp or quantity aborts the load.
pub fn load_sales<R: Read>(reader: R) -> Result<SalesTable, IngestError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers().map_err(csv_error)?.clone();
    let schema = SalesSchema::resolve(&headers)?;
    debug!(
        timestamp_column = %schema.timestamp_column,
        quantity_column = %schema.quantity_column,
        "resolved sales schema"
    );

    let mut events = Vec::new();
    let mut skipped_rows = 0usize;
    let mut record = StringRecord::new();
    while rdr.read_record(&mut record).map_err(csv_error)? {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        match parse_row(&schema, &record, line)? {
            Some(event) => events.push(event),
            None => skipped_rows += 1,
        }
    }

    info!(rows = events.len(), skipped_rows, "loaded sales table");
    Ok(SalesTable {
        schema,
        events,
        skipped_rows,
    })
}

fn parse_row(
    schema: &SalesSchema,
    record: &StringRecord,
    line: u64,
) -> Result<Option<RawSaleEvent>, IngestError> {
    let cell = |i: usize| record.get(i).map(str::trim).unwrap_or("");

    let raw_ts = cell(schema.timestamp);
    let product_id = cell(schema.product_id);
    let product_name = cell(schema.product_name);
    let location = cell(schema.location);
    if raw_ts.is_empty() || product_id.is_empty() || product_name.is_empty() || location.is_empty() {
        return Ok(None);
    }

    let timestamp = parse_timestamp(raw_ts).ok_or_else(|| IngestError::Parse {
        table: SALES_TABLE,
        line,
        reason: format!("unrecognised timestamp '{raw_ts}' in column '{}'", schema.timestamp_column),
    })?;

    let raw_qty = cell(schema.quantity);
    let quantity = if raw_qty.is_empty() {
        0.0
    } else {
        match raw_qty.parse::<f64>() {
            Ok(q) if q.is_finite() => q,
            _ => {
                return Err(IngestError::Parse {
                    table: SALES_TABLE,
                    line,
                    reason: format!(
                        "non-numeric quantity '{raw_qty}' in column '{}'",
                        schema.quantity_column
                    ),
                });
            }
        }
    };

    Ok(Some(RawSaleEvent {
        timestamp,
        product_id: product_id.to_string(),
        product_name: product_name.to_string(),
        location: location.to_string(),
        quantity,
    }))
}

fn csv_error(source: csv::Error) -> IngestError {
    IngestError::Csv {
        table: SALES_TABLE,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_rows_and_trims_identifiers() {
        let csv = "\
timestamp,product_id,product_name,location,quantity
2024-01-01 00:15:00, P1 ,Widget,North,3
2024-01-01 01:00:00,P1,Widget,North,
2024-01-01 02:00:00,P1,Widget,North,2.5
";
        let table = load_sales(csv.as_bytes()).unwrap();
        assert_eq!(table.events.len(), 3);
        assert_eq!(table.events[0].product_id, "P1");
        assert_eq!(table.events[1].quantity, 0.0);
        assert_eq!(table.events[2].quantity, 2.5);
        assert_eq!(table.skipped_rows, 0);
    }

    #[test]
    fn rows_missing_a_key_or_timestamp_are_skipped() {
        let csv = "\
Date,qty,product_id,product_name,location
2024-01-01,1,P1,Widget,North
,1,P1,Widget,North
2024-01-02,1,,Widget,North
";
        let table = load_sales(csv.as_bytes()).unwrap();
        assert_eq!(table.events.len(), 1);
        assert_eq!(table.skipped_rows, 2);
    }

    #[test]
    fn bad_timestamp_reports_line() {
        let csv = "\
time,sales,product_id,product_name,location
2024-01-01 00:00:00,1,P1,Widget,North
not-a-date,1,P1,Widget,North
";
        let err = load_sales(csv.as_bytes()).unwrap_err();
        match err {
            IngestError::Parse { table, line, reason } => {
                assert_eq!(table, "sales");
                assert_eq!(line, 3);
                assert!(reason.contains("not-a-date"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_numeric_quantity_is_fatal() {
        let csv = "\
time,quantity,product_id,product_name,location
2024-01-01 00:00:00,lots,P1,Widget,North
";
        assert!(matches!(
            load_sales(csv.as_bytes()),
            Err(IngestError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn missing_time_column_fails_before_rows() {
        let csv = "quantity,product_id,product_name,location\n1,P1,Widget,North\n";
        assert!(matches!(
            load_sales(csv.as_bytes()),
            Err(IngestError::MissingColumn { table: "sales", .. })
        ));
    }
}
