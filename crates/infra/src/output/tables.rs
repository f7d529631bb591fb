use chrono::NaiveDateTime;
use serde::Serialize;

/// A row type with a fixed file name and column order.
pub trait TableRow: Serialize {
    const FILE_NAME: &'static str;
    const HEADERS: &'static [&'static str];
}

pub(crate) mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::Serializer;

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format(FORMAT))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpikeRecord {
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub product_id: String,
    pub product_name: String,
    pub location: String,
    pub z_score: f64,
    pub quantity: i64,
    pub surge_percent: f64,
}

impl TableRow for SpikeRecord {
    const FILE_NAME: &'static str = "detected_spikes.csv";
    const HEADERS: &'static [&'static str] = &[
        "timestamp",
        "product_id",
        "product_name",
        "location",
        "z_score",
        "quantity",
        "surge_percent",
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRecord {
    pub product_id: String,
    pub product_name: String,
    pub location: String,
    pub avg_hourly: f64,
    pub max_hourly: i64,
    pub min_hourly: i64,
    /// Sample variance; empty for single-bucket series.
    pub var_hourly: Option<f64>,
    pub spike_count: usize,
}

impl TableRow for SummaryRecord {
    const FILE_NAME: &'static str = "demand_summary.csv";
    const HEADERS: &'static [&'static str] = &[
        "product_id",
        "product_name",
        "location",
        "avg_hourly",
        "max_hourly",
        "min_hourly",
        "var_hourly",
        "spike_count",
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySuggestionRecord {
    pub product_id: String,
    pub product_name: String,
    pub location: String,
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub predicted_demand: f64,
    pub suggested_stock: i64,
    pub order_recommendation: String,
    pub reorder_point: i64,
    #[serde(rename = "EOQ")]
    pub eoq: i64,
}

impl TableRow for InventorySuggestionRecord {
    const FILE_NAME: &'static str = "inventory_suggestions.csv";
    const HEADERS: &'static [&'static str] = &[
        "product_id",
        "product_name",
        "location",
        "timestamp",
        "predicted_demand",
        "suggested_stock",
        "order_recommendation",
        "reorder_point",
        "EOQ",
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRecord {
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    /// Empty when the model produced an unrepresentable value.
    pub forecasted_quantity: Option<f64>,
    pub product_id: String,
    pub product_name: String,
    pub location: String,
}

impl TableRow for ForecastRecord {
    const FILE_NAME: &'static str = "forecasted_sales.csv";
    const HEADERS: &'static [&'static str] = &[
        "timestamp",
        "forecasted_quantity",
        "product_id",
        "product_name",
        "location",
    ];
}

/// Everything one run produces, in emission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportTables {
    pub spikes: Vec<SpikeRecord>,
    pub summary: Vec<SummaryRecord>,
    pub suggestions: Vec<InventorySuggestionRecord>,
    pub forecasts: Vec<ForecastRecord>,
}

impl ReportTables {
    pub fn is_empty(&self) -> bool {
        self.spikes.is_empty()
            && self.summary.is_empty()
            && self.suggestions.is_empty()
            && self.forecasts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn encode<T: TableRow>(row: &T) -> String {
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        wtr.serialize(row).unwrap();
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap()
    }

    #[test]
    fn forecast_rows_keep_missing_values_blank() {
        let row = ForecastRecord {
            timestamp: ts(),
            forecasted_quantity: None,
            product_id: "P1".into(),
            product_name: "Widget".into(),
            location: "North".into(),
        };
        assert_eq!(encode(&row), "2024-05-06 07:00:00,,P1,Widget,North\n");
    }

    #[test]
    fn suggestion_header_uses_eoq_spelling() {
        assert_eq!(InventorySuggestionRecord::HEADERS.last(), Some(&"EOQ"));
        let row = InventorySuggestionRecord {
            product_id: "P1".into(),
            product_name: "Widget".into(),
            location: "North".into(),
            timestamp: ts(),
            predicted_demand: 4.25,
            suggested_stock: 6,
            order_recommendation: "ORDER".into(),
            reorder_point: 58,
            eoq: 428,
        };
        assert_eq!(
            encode(&row),
            "P1,Widget,North,2024-05-06 07:00:00,4.25,6,ORDER,58,428\n"
        );
    }
}
