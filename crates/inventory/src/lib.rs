//! `reliefstock-inventory`
//!
//! **Responsibility:** the canonical warehouse record: `InventoryItem`, the
//! per-variant projection from an approved contribution, and the perishables
//! expiry-window calculation.

pub mod expiry;
pub mod item;

pub use expiry::{days_to_expiry, ExpiringItem, EXPIRY_WINDOW_DAYS};
pub use item::{InventoryItem, ItemStatus, SourceType, MAIN_WAREHOUSE};
