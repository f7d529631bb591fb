use csv::StringRecord;
use tracing::warn;

use crate::error::IngestError;
use crate::ingest::{INVENTORY_TABLE, SALES_TABLE};

pub const PRODUCT_ID: &str = "product_id";
pub const PRODUCT_NAME: &str = "product_name";
pub const LOCATION: &str = "location";
pub const SERVICE_LEVEL: &str = "service_level";

const QUANTITY_SYNONYMS: [&str; 3] = ["quantity", "qty", "sales"];
const TIMESTAMP_MARKERS: [&str; 2] = ["date", "time"];

pub const INVENTORY_REQUIRED: [&str; 6] = [
    PRODUCT_ID,
    LOCATION,
    "current_stock",
    "lead_time_days",
    "order_cost",
    "holding_cost_per_unit_per_year",
];

/// Resolved column positions in the sales table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesSchema {
    pub timestamp: usize,
    pub quantity: usize,
    pub product_id: usize,
    pub product_name: usize,
    pub location: usize,
    pub timestamp_column: String,
    pub quantity_column: String,
}

impl SalesSchema {
    /// Resolve the sales header row.
    ///
    /// - timestamp: first header containing "date" or "time" (case-insensitive)
    /// - quantity: first header equal to "quantity", "qty" or "sales" (case-insensitive)
    /// - grouping columns: exact names
    pub fn resolve(headers: &StringRecord) -> Result<Self, IngestError> {
        let timestamp_candidates: Vec<usize> = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| {
                let lower = h.to_lowercase();
                TIMESTAMP_MARKERS.iter().any(|m| lower.contains(m))
            })
            .map(|(i, _)| i)
            .collect();
        let timestamp = *timestamp_candidates
            .first()
            .ok_or_else(|| IngestError::missing(SALES_TABLE, "date/time"))?;
        if timestamp_candidates.len() > 1 {
            warn!(
                chosen = &headers[timestamp],
                candidates = timestamp_candidates.len(),
                "several date/time-like columns in sales table; using the first"
            );
        }

        let quantity = headers
            .iter()
            .position(|h| {
                let lower = h.to_lowercase();
                QUANTITY_SYNONYMS.contains(&lower.as_str())
            })
            .ok_or_else(|| IngestError::missing(SALES_TABLE, "quantity"))?;

        Ok(Self {
            timestamp,
            quantity,
            product_id: exact(headers, SALES_TABLE, PRODUCT_ID)?,
            product_name: exact(headers, SALES_TABLE, PRODUCT_NAME)?,
            location: exact(headers, SALES_TABLE, LOCATION)?,
            timestamp_column: headers[timestamp].to_string(),
            quantity_column: headers[quantity].to_string(),
        })
    }
}

/// Header check for the inventory table. Row decoding is by name (serde), so
/// only presence matters here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventorySchema {
    pub has_service_level: bool,
}

impl InventorySchema {
    pub fn resolve(headers: &StringRecord) -> Result<Self, IngestError> {
        for column in INVENTORY_REQUIRED {
            exact(headers, INVENTORY_TABLE, column)?;
        }
        Ok(Self {
            has_service_level: headers.iter().any(|h| h == SERVICE_LEVEL),
        })
    }
}

fn exact(headers: &StringRecord, table: &'static str, column: &str) -> Result<usize, IngestError> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| IngestError::missing(table, format!("'{column}'")))
}
