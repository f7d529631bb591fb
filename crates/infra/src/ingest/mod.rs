//! Input table loading.
//!
//! Header resolution happens once, up front, producing typed schemas; row parsing
//! then works on column indices only. Any failure here is fatal for the run.

pub mod inventory;
pub mod sales;
pub mod schema;
pub mod timestamp;

pub use inventory::{load_inventory, load_inventory_file, InventoryRecord};
pub use sales::{load_sales, load_sales_file, SalesTable};
pub use schema::{InventorySchema, SalesSchema};
pub use timestamp::parse_timestamp;

pub(crate) const SALES_TABLE: &str = "sales";
pub(crate) const INVENTORY_TABLE: &str = "inventory";

fn open(path: &std::path::Path) -> Result<std::fs::File, crate::error::IngestError> {
    std::fs::File::open(path).map_err(|source| crate::error::IngestError::Io {
        path: path.to_path_buf(),
        source,
    })
}
