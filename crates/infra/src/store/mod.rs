//! Repository boundary for contributions, inventory items and tracking events.
//!
//! The trait is deliberately coarse: every mutating method is one atomic unit
//! of work, so an implementation backed by a database runs each of them in a
//! single transaction and the in-memory implementation mutates under a single
//! write lock. Callers never see half-applied state.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use reliefstock_contributions::{Contribution, ContributionStatus};
use reliefstock_core::{ContributionId, TrackId, Uid};
use reliefstock_inventory::{InventoryItem, ItemStatus};
use reliefstock_tracking::{EventPatch, NewTrackingEvent, TrackingEvent};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// The record exists but is not in a state that permits the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller acted on an outdated view of the tracking ledger.
    #[error("stale write: {0}")]
    StaleWrite(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn stale_write(msg: impl Into<String>) -> Self {
        Self::StaleWrite(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

/// Inventory item fields a ledger write is allowed to touch, applied in the
/// same unit of work as the event append or correction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemStateUpdate {
    pub status: Option<ItemStatus>,
    pub location: Option<String>,
}

impl ItemStateUpdate {
    pub fn status(status: ItemStatus) -> Self {
        Self {
            status: Some(status),
            location: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.location.is_none()
    }
}

#[async_trait]
pub trait WarehouseStore: Send + Sync {
    // -- contributions --------------------------------------------------

    async fn insert_contribution(&self, contribution: Contribution) -> Result<(), StoreError>;

    async fn get_contribution(
        &self,
        id: ContributionId,
    ) -> Result<Option<Contribution>, StoreError>;

    async fn list_contributions(
        &self,
        status: Option<ContributionStatus>,
    ) -> Result<Vec<Contribution>, StoreError>;

    /// Marks a pending contribution rejected.
    ///
    /// The status check and the write are one compare-and-set: a contribution
    /// that is no longer pending yields `Conflict`, a missing one `NotFound`.
    async fn reject_contribution(
        &self,
        id: ContributionId,
        remark: Option<String>,
    ) -> Result<Uid, StoreError>;

    /// Approves a pending contribution and materializes it in one transaction:
    /// status flip, inventory item insert and seed tracking event insert all
    /// commit together or not at all.
    async fn approve_and_materialize(
        &self,
        id: ContributionId,
        item: InventoryItem,
        seed: NewTrackingEvent,
        remark: Option<String>,
    ) -> Result<TrackingEvent, StoreError>;

    // -- inventory ------------------------------------------------------

    async fn get_item_by_uid(&self, uid: &Uid) -> Result<Option<InventoryItem>, StoreError>;

    async fn list_items(&self) -> Result<Vec<InventoryItem>, StoreError>;

    // -- tracking ledger ------------------------------------------------

    /// Latest event for a shipment, decided by highest `track_id`.
    async fn latest_event(&self, uid: &Uid) -> Result<Option<TrackingEvent>, StoreError>;

    /// Appends a new event, guarded by the `track_id` the caller believes is
    /// latest. A mismatch means someone else wrote in between: `StaleWrite`,
    /// nothing applied. `item_update` lands in the same unit of work.
    async fn append_event(
        &self,
        event: NewTrackingEvent,
        expected_latest: TrackId,
        item_update: Option<ItemStateUpdate>,
    ) -> Result<TrackingEvent, StoreError>;

    /// Patches the latest event in place under the same `expected_latest`
    /// guard as [`append_event`](WarehouseStore::append_event).
    async fn correct_latest(
        &self,
        uid: &Uid,
        expected_latest: TrackId,
        patch: EventPatch,
        item_update: Option<ItemStateUpdate>,
    ) -> Result<TrackingEvent, StoreError>;

    /// Full ledger for a shipment, ordered oldest first.
    async fn timeline(&self, uid: &Uid) -> Result<Vec<TrackingEvent>, StoreError>;

    /// Latest event of every shipment, most recently written first.
    async fn latest_per_uid(&self) -> Result<Vec<TrackingEvent>, StoreError>;
}

#[async_trait]
impl<S: WarehouseStore + ?Sized> WarehouseStore for Arc<S> {
    async fn insert_contribution(&self, contribution: Contribution) -> Result<(), StoreError> {
        (**self).insert_contribution(contribution).await
    }

    async fn get_contribution(
        &self,
        id: ContributionId,
    ) -> Result<Option<Contribution>, StoreError> {
        (**self).get_contribution(id).await
    }

    async fn list_contributions(
        &self,
        status: Option<ContributionStatus>,
    ) -> Result<Vec<Contribution>, StoreError> {
        (**self).list_contributions(status).await
    }

    async fn reject_contribution(
        &self,
        id: ContributionId,
        remark: Option<String>,
    ) -> Result<Uid, StoreError> {
        (**self).reject_contribution(id, remark).await
    }

    async fn approve_and_materialize(
        &self,
        id: ContributionId,
        item: InventoryItem,
        seed: NewTrackingEvent,
        remark: Option<String>,
    ) -> Result<TrackingEvent, StoreError> {
        (**self).approve_and_materialize(id, item, seed, remark).await
    }

    async fn get_item_by_uid(&self, uid: &Uid) -> Result<Option<InventoryItem>, StoreError> {
        (**self).get_item_by_uid(uid).await
    }

    async fn list_items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        (**self).list_items().await
    }

    async fn latest_event(&self, uid: &Uid) -> Result<Option<TrackingEvent>, StoreError> {
        (**self).latest_event(uid).await
    }

    async fn append_event(
        &self,
        event: NewTrackingEvent,
        expected_latest: TrackId,
        item_update: Option<ItemStateUpdate>,
    ) -> Result<TrackingEvent, StoreError> {
        (**self).append_event(event, expected_latest, item_update).await
    }

    async fn correct_latest(
        &self,
        uid: &Uid,
        expected_latest: TrackId,
        patch: EventPatch,
        item_update: Option<ItemStateUpdate>,
    ) -> Result<TrackingEvent, StoreError> {
        (**self)
            .correct_latest(uid, expected_latest, patch, item_update)
            .await
    }

    async fn timeline(&self, uid: &Uid) -> Result<Vec<TrackingEvent>, StoreError> {
        (**self).timeline(uid).await
    }

    async fn latest_per_uid(&self) -> Result<Vec<TrackingEvent>, StoreError> {
        (**self).latest_per_uid().await
    }
}
