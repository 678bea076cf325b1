//! Request DTOs and JSON mapping helpers.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use reliefstock_contributions::Contribution;
use reliefstock_infra::DecisionOutcome;
use reliefstock_inventory::{days_to_expiry, ExpiringItem, InventoryItem};
use reliefstock_tracking::TrackingEvent;

#[derive(Debug, Deserialize)]
pub struct ListContributionsParams {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: String,
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExpiringParams {
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    pub to_type: String,
    pub to_id: i64,
    pub dispatch_date: NaiveDate,
    pub dispatched_by: Option<String>,
    pub remarks: Option<String>,
    pub expected_track_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DeliveredRequest {
    pub delivered_date: NaiveDate,
    pub location: Option<String>,
    pub remarks: Option<String>,
    pub expected_track_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct EditLatestRequest {
    pub status: Option<String>,
    pub delivered_date: Option<NaiveDate>,
    pub remarks: Option<String>,
    pub location: Option<String>,
    pub expected_track_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TimelineEntryRequest {
    pub status: String,
    pub location: Option<String>,
    pub remarks: Option<String>,
    pub expected_track_id: Option<i64>,
}

pub fn contribution_to_json(c: &Contribution) -> Value {
    json!({
        "id": c.id.to_string(),
        "uid": c.uid.as_str(),
        "status": c.status.as_str(),
        "kind": c.kind,
        "admin_remark": c.admin_remark,
        "submitted_at": c.submitted_at,
    })
}

pub fn decision_to_json(outcome: &DecisionOutcome) -> Value {
    json!({
        "uid": outcome.uid.as_str(),
        "status": outcome.status.as_str(),
        "inventory_id": outcome.inventory_id.map(|id| id.to_string()),
        "advisory": outcome.advisory,
    })
}

pub fn item_to_json(item: &InventoryItem) -> Value {
    json!({
        "inventory_id": item.inventory_id.to_string(),
        "source_type": item.source_type.as_str(),
        "source_id": item.source_id.to_string(),
        "uid": item.uid.as_str(),
        "product_name": item.product_name,
        "quantity": item.quantity,
        "unit": item.unit,
        "location": item.location,
        "status": item.status.as_str(),
        "perishable": item.perishable,
        "manufacture_date": item.manufacture_date,
        "expiry_date": item.expiry_date,
        "amount": item.amount,
        "method": item.method,
        "created_at": item.created_at,
        "days_to_expiry": item
            .expiry_date
            .map(|expiry| days_to_expiry(expiry, Utc::now().date_naive())),
    })
}

pub fn expiring_to_json(e: &ExpiringItem) -> Value {
    json!({
        "inventory_id": e.inventory_id.to_string(),
        "uid": e.uid.as_str(),
        "product_name": e.product_name,
        "quantity": e.quantity,
        "unit": e.unit,
        "manufacture_date": e.manufacture_date,
        "expiry_date": e.expiry_date,
        "days_left": e.days_left,
    })
}

pub fn event_to_json(event: &TrackingEvent) -> Value {
    json!({
        "track_id": event.track_id.value(),
        "uid": event.uid.as_str(),
        "status": event.status,
        "from_location": event.from_location,
        "to_type": event.to_type.map(|t| t.as_str()),
        "to_name": event.to_name,
        "dispatched_by": event.dispatched_by,
        "dispatch_date": event.dispatch_date,
        "delivered_date": event.delivered_date,
        "remarks": event.remarks,
        "created_at": event.created_at,
    })
}
