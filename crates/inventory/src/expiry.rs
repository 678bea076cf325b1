//! Perishables expiry window.
//!
//! Calendar-date arithmetic only (UTC, no time-of-day component), so the
//! window does not drift across timezones or DST changes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use reliefstock_core::{InventoryId, Uid};

use crate::item::InventoryItem;

/// Items expiring within this many days are flagged for urgent redirection.
pub const EXPIRY_WINDOW_DAYS: i64 = 30;

/// Whole days from `as_of` to `expiry`. Negative when already expired.
pub fn days_to_expiry(expiry: NaiveDate, as_of: NaiveDate) -> i64 {
    (expiry - as_of).num_days()
}

/// Summary row for the expiry view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiringItem {
    pub inventory_id: InventoryId,
    pub uid: Uid,
    pub product_name: Option<String>,
    pub quantity: Option<i64>,
    pub unit: Option<String>,
    pub manufacture_date: Option<NaiveDate>,
    pub expiry_date: NaiveDate,
    pub days_left: i64,
}

impl ExpiringItem {
    /// Project an item into the expiry view when it falls inside the
    /// `[0, EXPIRY_WINDOW_DAYS]` window; `None` otherwise.
    ///
    /// Non-perishable items never appear, regardless of any expiry date on
    /// the row.
    pub fn from_item(item: &InventoryItem, as_of: NaiveDate) -> Option<Self> {
        if !item.perishable {
            return None;
        }
        let expiry = item.expiry_date?;
        let days_left = days_to_expiry(expiry, as_of);
        if !(0..=EXPIRY_WINDOW_DAYS).contains(&days_left) {
            return None;
        }
        Some(Self {
            inventory_id: item.inventory_id,
            uid: item.uid.clone(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit: item.unit.clone(),
            manufacture_date: item.manufacture_date,
            expiry_date: expiry,
            days_left,
        })
    }
}
