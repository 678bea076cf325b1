//! Shipment tracking operations.
//!
//! Every mutation is guarded by the `track_id` of the entry it believes is
//! latest. Callers that observed the ledger earlier may pass that `track_id`
//! explicitly; otherwise the guard is the latest entry read just before the
//! write, which still surfaces a concurrent writer as `StaleWrite` instead of
//! silently reordering history.

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument};

use reliefstock_core::{TrackId, Uid};
use reliefstock_inventory::ItemStatus;
use reliefstock_tracking::{
    DestinationKind, EventPatch, NewTrackingEvent, TrackingEvent, STATUS_DELIVERED,
};

use crate::error::ServiceError;
use crate::registry::RegistryLookup;
use crate::store::{ItemStateUpdate, WarehouseStore};

/// Fields a dispatch request carries besides the destination.
#[derive(Debug, Clone, Default)]
pub struct DispatchDetails {
    pub dispatched_by: Option<String>,
    pub remarks: Option<String>,
}

pub struct TrackingLedger<S, R> {
    store: S,
    registry: R,
}

impl<S: WarehouseStore, R: RegistryLookup> TrackingLedger<S, R> {
    pub fn new(store: S, registry: R) -> Self {
        Self { store, registry }
    }

    async fn guard(&self, uid: &Uid, expected: Option<TrackId>) -> Result<TrackingEvent, ServiceError> {
        let latest = self
            .store
            .latest_event(uid)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("no tracking ledger for {uid}")))?;
        if let Some(expected) = expected {
            if latest.track_id != expected {
                return Err(ServiceError::StaleWrite(format!(
                    "latest entry for {uid} is {}, caller expected {}",
                    latest.track_id.value(),
                    expected.value()
                )));
            }
        }
        Ok(latest)
    }

    /// Records a dispatch out of the item's current location and flips the
    /// inventory status to `dispatched` in the same unit of work.
    #[instrument(skip_all, fields(uid = %uid, to = ?to_type, to_id))]
    pub async fn dispatch(
        &self,
        uid: &Uid,
        to_type: DestinationKind,
        to_id: i64,
        dispatch_date: NaiveDate,
        details: DispatchDetails,
        expected: Option<TrackId>,
    ) -> Result<TrackingEvent, ServiceError> {
        let item = self
            .store
            .get_item_by_uid(uid)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("no inventory item for {uid}")))?;
        let latest = self.guard(uid, expected).await?;
        let to_name = self
            .registry
            .resolve_destination_name(to_type, to_id)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found(format!("unknown {} {to_id}", to_type.as_str()))
            })?;

        let event = NewTrackingEvent::dispatch(
            uid.clone(),
            item.location.clone(),
            to_type,
            to_name,
            details.dispatched_by.unwrap_or_else(|| "Admin".to_string()),
            dispatch_date,
            details.remarks,
            Utc::now(),
        );
        let stored = self
            .store
            .append_event(
                event,
                latest.track_id,
                Some(ItemStateUpdate::status(ItemStatus::Dispatched)),
            )
            .await?;
        info!(uid = %uid, track_id = stored.track_id.value(), "shipment dispatched");
        Ok(stored)
    }

    /// Confirms delivery by patching the latest entry in place. The optional
    /// `location` records where the item physically ended up.
    #[instrument(skip_all, fields(uid = %uid))]
    pub async fn mark_delivered(
        &self,
        uid: &Uid,
        delivered_date: NaiveDate,
        location: Option<String>,
        remarks: Option<String>,
        expected: Option<TrackId>,
    ) -> Result<TrackingEvent, ServiceError> {
        let latest = self.guard(uid, expected).await?;
        let patch = EventPatch {
            status: Some(STATUS_DELIVERED.to_string()),
            delivered_date: Some(delivered_date),
            remarks,
        };
        let update = ItemStateUpdate {
            status: Some(ItemStatus::Delivered),
            location,
        };
        let patched = self
            .store
            .correct_latest(uid, latest.track_id, patch, Some(update))
            .await?;
        info!(uid = %uid, track_id = patched.track_id.value(), "delivery confirmed");
        Ok(patched)
    }

    /// Corrects the latest entry in place. Omitted fields keep their value;
    /// a `location` updates the inventory item, never the event history.
    #[instrument(skip_all, fields(uid = %uid))]
    pub async fn edit_latest(
        &self,
        uid: &Uid,
        patch: EventPatch,
        location: Option<String>,
        expected: Option<TrackId>,
    ) -> Result<TrackingEvent, ServiceError> {
        let latest = self.guard(uid, expected).await?;
        let update = location.map(|location| ItemStateUpdate {
            status: None,
            location: Some(location),
        });
        Ok(self
            .store
            .correct_latest(uid, latest.track_id, patch, update)
            .await?)
    }

    /// Appends a manual milestone, carrying the shipment identity fields
    /// forward from the latest entry so history is never destroyed.
    #[instrument(skip_all, fields(uid = %uid))]
    pub async fn add_timeline_entry(
        &self,
        uid: &Uid,
        status: String,
        location: Option<String>,
        remarks: Option<String>,
        expected: Option<TrackId>,
    ) -> Result<TrackingEvent, ServiceError> {
        if status.trim().is_empty() {
            return Err(ServiceError::validation("status must not be blank"));
        }
        let latest = self.guard(uid, expected).await?;
        let event = latest.carry_forward(status, remarks, Utc::now());
        let update = location.map(|location| ItemStateUpdate {
            status: None,
            location: Some(location),
        });
        Ok(self
            .store
            .append_event(event, latest.track_id, update)
            .await?)
    }

    /// Full timeline, oldest first. A shipment with no ledger is `NotFound`.
    pub async fn timeline(&self, uid: &Uid) -> Result<Vec<TrackingEvent>, ServiceError> {
        let events = self.store.timeline(uid).await?;
        if events.is_empty() {
            return Err(ServiceError::not_found(format!(
                "no tracking ledger for {uid}"
            )));
        }
        Ok(events)
    }

    /// Current position of every shipment (latest entry per UID).
    pub async fn overview(&self) -> Result<Vec<TrackingEvent>, ServiceError> {
        Ok(self.store.latest_per_uid().await?)
    }
}
