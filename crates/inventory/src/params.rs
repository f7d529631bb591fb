use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use demandlens_core::GroupKey;

use crate::error::InventoryError;

/// Replenishment inputs for one (product, location).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryParams {
    pub product_id: String,
    pub location: String,
    pub current_stock: f64,
    pub lead_time_days: f64,
    pub order_cost: f64,
    pub holding_cost_per_unit_per_year: f64,
    /// Target probability of not stocking out during lead time, in (0, 1).
    pub service_level: f64,
}

impl InventoryParams {
    /// Checks the contract the optimizer relies on.
    pub fn validate(&self) -> Result<(), InventoryError> {
        if !(self.service_level > 0.0 && self.service_level < 1.0) {
            return Err(InventoryError::invalid(
                "service_level",
                format!("must be in (0, 1), got {}", self.service_level),
            ));
        }
        if !(self.holding_cost_per_unit_per_year.is_finite()
            && self.holding_cost_per_unit_per_year > 0.0)
        {
            return Err(InventoryError::invalid(
                "holding_cost_per_unit_per_year",
                format!("must be > 0, got {}", self.holding_cost_per_unit_per_year),
            ));
        }
        if !(self.order_cost.is_finite() && self.order_cost >= 0.0) {
            return Err(InventoryError::invalid(
                "order_cost",
                format!("must be >= 0, got {}", self.order_cost),
            ));
        }
        if !(self.lead_time_days.is_finite() && self.lead_time_days >= 0.0) {
            return Err(InventoryError::invalid(
                "lead_time_days",
                format!("must be >= 0, got {}", self.lead_time_days),
            ));
        }
        Ok(())
    }
}

/// Read-only lookup of inventory parameters by (product_id, location).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryBook {
    rows: BTreeMap<(String, String), InventoryParams>,
}

impl InventoryBook {
    /// Index rows; the first row for a key wins. Returns the book plus every
    /// row that was shadowed by an earlier one.
    pub fn from_rows(rows: impl IntoIterator<Item = InventoryParams>) -> (Self, Vec<InventoryParams>) {
        let mut book = Self::default();
        let mut duplicates = Vec::new();
        for row in rows {
            let key = (row.product_id.clone(), row.location.clone());
            if book.rows.contains_key(&key) {
                duplicates.push(row);
            } else {
                book.rows.insert(key, row);
            }
        }
        (book, duplicates)
    }

    pub fn get(&self, product_id: &str, location: &str) -> Option<&InventoryParams> {
        self.rows
            .get(&(product_id.to_string(), location.to_string()))
    }

    pub fn for_group(&self, key: &GroupKey) -> Option<&InventoryParams> {
        let (product_id, location) = key.stock_key();
        self.get(product_id, location)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pid: &str, loc: &str, stock: f64) -> InventoryParams {
        InventoryParams {
            product_id: pid.to_string(),
            location: loc.to_string(),
            current_stock: stock,
            lead_time_days: 5.0,
            order_cost: 50.0,
            holding_cost_per_unit_per_year: 2.0,
            service_level: 0.95,
        }
    }

    #[test]
    fn first_row_wins_and_duplicates_are_reported() {
        let (book, dups) = InventoryBook::from_rows(vec![
            params("1", "A", 10.0),
            params("1", "A", 99.0),
            params("1", "B", 5.0),
        ]);
        assert_eq!(book.len(), 2);
        assert_eq!(book.get("1", "A").unwrap().current_stock, 10.0);
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].current_stock, 99.0);
    }

    #[test]
    fn lookup_ignores_product_name() {
        let (book, _) = InventoryBook::from_rows(vec![params("7", "Pune", 1.0)]);
        assert!(book.for_group(&GroupKey::new("7", "Anything", "Pune")).is_some());
        assert!(book.for_group(&GroupKey::new("7", "Anything", "Delhi")).is_none());
    }

    #[test]
    fn validation_guards_the_eoq_denominator() {
        let mut p = params("1", "A", 0.0);
        assert!(p.validate().is_ok());
        p.holding_cost_per_unit_per_year = 0.0;
        assert!(matches!(
            p.validate(),
            Err(InventoryError::InvalidParameter { name: "holding_cost_per_unit_per_year", .. })
        ));
    }

    #[test]
    fn validation_rejects_degenerate_service_levels() {
        for sl in [0.0, 1.0, 1.5, f64::NAN] {
            let mut p = params("1", "A", 0.0);
            p.service_level = sl;
            assert!(p.validate().is_err(), "service level {sl} accepted");
        }
    }
}
