use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::group::GroupKey;

/// One sales event as ingested from the sales table. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSaleEvent {
    pub timestamp: NaiveDateTime,
    pub product_id: String,
    pub product_name: String,
    pub location: String,
    pub quantity: f64,
}

impl RawSaleEvent {
    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(
            self.product_id.clone(),
            self.product_name.clone(),
            self.location.clone(),
        )
    }
}
