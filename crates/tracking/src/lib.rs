//! `reliefstock-tracking`
//!
//! **Responsibility:** the shipment tracking ledger's event model: the
//! mostly-append-only timeline of an item's dispatch/delivery milestones,
//! keyed by UID and ordered by store-assigned `TrackId`.

pub mod event;

pub use event::{
    latest_by_track_id, sort_timeline, DestinationKind, EventPatch, NewTrackingEvent,
    TrackingEvent, STATUS_CREATED, STATUS_DELIVERED, STATUS_DISPATCHED,
};
