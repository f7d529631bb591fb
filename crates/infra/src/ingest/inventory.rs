use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use tracing::info;

use demandlens_inventory::{InventoryParams, ReplenishmentPolicy};

use crate::error::IngestError;
use crate::ingest::schema::InventorySchema;
use crate::ingest::{open, INVENTORY_TABLE};

/// One inventory row as it appears on disk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InventoryRecord {
    pub product_id: String,
    pub location: String,
    pub current_stock: f64,
    pub lead_time_days: f64,
    pub order_cost: f64,
    pub holding_cost_per_unit_per_year: f64,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub service_level: Option<f64>,
}

impl InventoryRecord {
    pub fn into_params(self, policy: &ReplenishmentPolicy) -> InventoryParams {
        InventoryParams {
            service_level: policy.service_level_or_default(self.service_level),
            product_id: self.product_id,
            location: self.location,
            current_stock: self.current_stock,
            lead_time_days: self.lead_time_days,
            order_cost: self.order_cost,
            holding_cost_per_unit_per_year: self.holding_cost_per_unit_per_year,
        }
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<f64>().map(Some).map_err(serde::de::Error::custom),
    }
}

pub fn load_inventory_file(
    path: &Path,
    policy: &ReplenishmentPolicy,
) -> Result<Vec<InventoryParams>, IngestError> {
    load_inventory(open(path)?, policy)
}

/// Read the inventory table. Blank or absent `service_level` cells take the
/// policy's default. Parameter ranges are checked later, per group.
pub fn load_inventory<R: Read>(
    reader: R,
    policy: &ReplenishmentPolicy,
) -> Result<Vec<InventoryParams>, IngestError> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|source| IngestError::Csv {
            table: INVENTORY_TABLE,
            source,
        })?
        .clone();
    let schema = InventorySchema::resolve(&headers)?;

    let mut rows = Vec::new();
    for result in rdr.deserialize::<InventoryRecord>() {
        let record = result.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or_default();
            IngestError::Parse {
                table: INVENTORY_TABLE,
                line,
                reason: e.to_string(),
            }
        })?;
        rows.push(record.into_params(policy));
    }

    info!(
        rows = rows.len(),
        has_service_level = schema.has_service_level,
        "loaded inventory table"
    );
    Ok(rows)
}
