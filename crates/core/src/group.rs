//! Analysis-unit identity.

use serde::{Deserialize, Serialize};

/// Identifies one analysis unit: a product sold at a location.
///
/// Ordering is lexicographic over `(product_id, product_name, location)`; the
/// pipeline processes and emits groups in that order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub product_id: String,
    pub product_name: String,
    pub location: String,
}

impl GroupKey {
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            location: location.into(),
        }
    }

    /// Key used to look up inventory parameters (the inventory table has no product name).
    pub fn stock_key(&self) -> (&str, &str) {
        (&self.product_id, &self.location)
    }
}

impl core::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}@{} ({})", self.product_name, self.location, self.product_id)
    }
}
