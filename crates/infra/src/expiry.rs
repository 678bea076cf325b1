//! Perishables nearing expiry.

use chrono::{NaiveDate, Utc};

use reliefstock_inventory::ExpiringItem;

use crate::error::ServiceError;
use crate::store::WarehouseStore;

/// Stateless read-side view over the inventory. Nothing is flagged or
/// mutated; the window is recomputed per query.
pub struct ExpiryMonitor<S> {
    store: S,
}

impl<S: WarehouseStore> ExpiryMonitor<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Perishable items expiring within the alert window as of `as_of`
    /// (default: today), soonest expiry first.
    pub async fn expiring_soon(
        &self,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<ExpiringItem>, ServiceError> {
        let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
        let mut expiring: Vec<ExpiringItem> = self
            .store
            .list_items()
            .await?
            .iter()
            .filter_map(|item| ExpiringItem::from_item(item, as_of))
            .collect();
        expiring.sort_by_key(|e| e.expiry_date);
        Ok(expiring)
    }
}
