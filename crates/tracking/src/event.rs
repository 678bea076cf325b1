use chrono::{DateTime, NaiveDate, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use reliefstock_core::{DomainError, TrackId, Uid};

/// Conventional milestone statuses. `status` stays free-form so manual
/// timeline entries can record anything ("In transit", "Held at customs").
pub const STATUS_CREATED: &str = "Created";
pub const STATUS_DISPATCHED: &str = "Dispatched";
pub const STATUS_DELIVERED: &str = "Delivered";

/// Destination registry kind for a dispatch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    Orphanage,
    Disaster,
}

impl DestinationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationKind::Orphanage => "orphanage",
            DestinationKind::Disaster => "disaster",
        }
    }
}

impl FromStr for DestinationKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "orphanage" => Ok(DestinationKind::Orphanage),
            "disaster" => Ok(DestinationKind::Disaster),
            other => Err(DomainError::validation(format!(
                "destination must be 'orphanage' or 'disaster', got '{other}'"
            ))),
        }
    }
}

/// A ledger entry ready to be appended (not yet assigned a `TrackId`).
///
/// The store assigns `TrackId`s during append, strictly increasing per store
/// instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTrackingEvent {
    pub uid: Uid,
    pub status: String,
    pub from_location: Option<String>,
    pub to_type: Option<DestinationKind>,
    pub to_name: Option<String>,
    pub dispatched_by: Option<String>,
    pub dispatch_date: Option<NaiveDate>,
    pub delivered_date: Option<NaiveDate>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewTrackingEvent {
    /// The first ledger entry, inserted in the same transaction that
    /// materializes the inventory item.
    pub fn seed(uid: Uid, created_at: DateTime<Utc>) -> Self {
        Self {
            uid,
            status: STATUS_CREATED.to_string(),
            from_location: Some("Donor".to_string()),
            to_type: None,
            to_name: Some("Admin".to_string()),
            dispatched_by: None,
            dispatch_date: None,
            delivered_date: None,
            remarks: None,
            created_at,
        }
    }

    /// A dispatch milestone out of the item's current location.
    #[allow(clippy::too_many_arguments)]
    pub fn dispatch(
        uid: Uid,
        from_location: String,
        to_type: DestinationKind,
        to_name: String,
        dispatched_by: String,
        dispatch_date: NaiveDate,
        remarks: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            uid,
            status: STATUS_DISPATCHED.to_string(),
            from_location: Some(from_location),
            to_type: Some(to_type),
            to_name: Some(to_name),
            dispatched_by: Some(dispatched_by),
            dispatch_date: Some(dispatch_date),
            delivered_date: None,
            remarks,
            created_at,
        }
    }
}

/// A stored ledger entry (assigned a `TrackId`).
///
/// Events for a UID, ordered by `TrackId`, form the canonical timeline. The
/// latest event is the one with the maximum `TrackId`, never the newest
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub track_id: TrackId,
    pub uid: Uid,
    pub status: String,
    pub from_location: Option<String>,
    pub to_type: Option<DestinationKind>,
    pub to_name: Option<String>,
    pub dispatched_by: Option<String>,
    pub dispatch_date: Option<NaiveDate>,
    pub delivered_date: Option<NaiveDate>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TrackingEvent {
    /// Clone this event into a new appendable milestone, carrying forward the
    /// identity fields (`from_location`, destination, dispatcher, dates) and
    /// overriding status/remarks.
    ///
    /// This is the only way to record a new real-world milestone after
    /// dispatch without destroying prior history.
    pub fn carry_forward(
        &self,
        status: String,
        remarks: Option<String>,
        created_at: DateTime<Utc>,
    ) -> NewTrackingEvent {
        NewTrackingEvent {
            uid: self.uid.clone(),
            status,
            from_location: self.from_location.clone(),
            to_type: self.to_type,
            to_name: self.to_name.clone(),
            dispatched_by: self.dispatched_by.clone(),
            dispatch_date: self.dispatch_date,
            delivered_date: self.delivered_date,
            remarks,
            created_at,
        }
    }

    /// In-place correction. Omitted (`None`) fields keep their prior value.
    pub fn apply_patch(&mut self, patch: &EventPatch) {
        if let Some(status) = &patch.status {
            self.status = status.clone();
        }
        if let Some(date) = patch.delivered_date {
            self.delivered_date = Some(date);
        }
        if let Some(remarks) = &patch.remarks {
            self.remarks = Some(remarks.clone());
        }
    }
}

/// Partial update for the two in-place correction operations (delivery
/// confirmation, inline edit). `None` means "keep the existing value".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPatch {
    pub status: Option<String>,
    pub delivered_date: Option<NaiveDate>,
    pub remarks: Option<String>,
}

/// Latest event = maximum `TrackId`. Ties cannot occur by construction
/// (monotonic assignment).
pub fn latest_by_track_id(events: &[TrackingEvent]) -> Option<&TrackingEvent> {
    events.iter().max_by_key(|e| e.track_id)
}

/// Timeline presentation order: ascending `created_at`, `TrackId` as the
/// tie-break.
pub fn sort_timeline(events: &mut [TrackingEvent]) {
    events.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then(a.track_id.cmp(&b.track_id))
    });
}
