#![cfg(test)]

//! End-to-end service tests against the in-memory store: intake, decision,
//! materialization atomicity, ledger writes and the expiry view.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};

use reliefstock_contributions::{ContributionKind, ContributionStatus, Decision};
use reliefstock_core::TrackId;
use reliefstock_inventory::{ItemStatus, EXPIRY_WINDOW_DAYS, MAIN_WAREHOUSE};
use reliefstock_risk::RuleBasedAssessor;
use reliefstock_tracking::{DestinationKind, EventPatch, STATUS_CREATED, STATUS_DISPATCHED};

use crate::error::ServiceError;
use crate::expiry::ExpiryMonitor;
use crate::ledger::{DispatchDetails, TrackingLedger};
use crate::materializer::Materializer;
use crate::registry::InMemoryRegistry;
use crate::store::{InMemoryStore, WarehouseStore};

type Store = Arc<InMemoryStore>;
type Registry = Arc<InMemoryRegistry>;

struct Harness {
    store: Store,
    materializer: Materializer<Store>,
    ledger: TrackingLedger<Store, Registry>,
    monitor: ExpiryMonitor<Store>,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let registry = Arc::new(InMemoryRegistry::new());
    registry.register(DestinationKind::Orphanage, 1, "Sunrise Home");
    registry.register(DestinationKind::Disaster, 7, "Cyclone Relief Camp");
    Harness {
        store: store.clone(),
        materializer: Materializer::new(store.clone())
            .with_assessor(Arc::new(RuleBasedAssessor::new())),
        ledger: TrackingLedger::new(store.clone(), registry),
        monitor: ExpiryMonitor::new(store),
    }
}

fn product(perishable: bool, expiry: Option<NaiveDate>) -> ContributionKind {
    ContributionKind::PhysicalProduct {
        product_name: "Rice".to_string(),
        category: "food".to_string(),
        quantity: 25,
        unit: "kg".to_string(),
        perishable,
        manufacture_date: None,
        expiry_date: expiry,
    }
}

fn money() -> ContributionKind {
    ContributionKind::MoneyDonation {
        amount: 5000,
        method: "upi".to_string(),
    }
}

/// Submits and approves a durable product, returning its UID.
async fn approved_shipment(h: &Harness) -> reliefstock_core::Uid {
    let c = h.materializer.submit(product(false, None)).await.unwrap();
    h.materializer
        .decide(c.id, Decision::Approved, None)
        .await
        .unwrap();
    c.uid
}

#[tokio::test]
async fn approval_materializes_item_and_seed_event() {
    let h = harness();
    let c = h.materializer.submit(money()).await.unwrap();
    assert!(c.uid.as_str().starts_with("DON-"));

    let outcome = h
        .materializer
        .decide(c.id, Decision::Approved, Some("ok".to_string()))
        .await
        .unwrap();
    assert_eq!(outcome.status, ContributionStatus::Approved);
    assert!(outcome.inventory_id.is_some());

    let item = h.store.get_item_by_uid(&c.uid).await.unwrap().unwrap();
    assert_eq!(item.location, MAIN_WAREHOUSE);
    assert_eq!(item.status, ItemStatus::Received);
    assert_eq!(item.amount, Some(5000));

    let seed = h.store.latest_event(&c.uid).await.unwrap().unwrap();
    assert_eq!(seed.status, STATUS_CREATED);
    assert_eq!(seed.from_location.as_deref(), Some("Donor"));
    assert_eq!(seed.to_name.as_deref(), Some("Admin"));

    let stored = h.store.get_contribution(c.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ContributionStatus::Approved);
    assert_eq!(stored.admin_remark.as_deref(), Some("ok"));
}

#[tokio::test]
async fn decision_applies_exactly_once() {
    let h = harness();
    let c = h.materializer.submit(money()).await.unwrap();
    h.materializer
        .decide(c.id, Decision::Approved, None)
        .await
        .unwrap();

    let err = h
        .materializer
        .decide(c.id, Decision::Approved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    // Still exactly one item and one seed event.
    assert_eq!(h.store.list_items().await.unwrap().len(), 1);
    assert_eq!(h.store.timeline(&c.uid).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_decisions_apply_at_most_once() {
    let h = harness();
    let c = h.materializer.submit(money()).await.unwrap();
    let m = Arc::new(Materializer::new(h.store.clone()));

    let (a, b) = tokio::join!(
        m.decide(c.id, Decision::Approved, None),
        m.decide(c.id, Decision::Approved, None),
    );
    let wins = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(wins, 1);
    assert_eq!(h.store.list_items().await.unwrap().len(), 1);
    assert_eq!(h.store.timeline(&c.uid).await.unwrap().len(), 1);
}

#[tokio::test]
async fn rejection_is_terminal() {
    let h = harness();
    let c = h.materializer.submit(money()).await.unwrap();
    let outcome = h
        .materializer
        .decide(c.id, Decision::Rejected, Some("suspicious".to_string()))
        .await
        .unwrap();
    assert_eq!(outcome.status, ContributionStatus::Rejected);
    assert!(outcome.inventory_id.is_none());

    let err = h
        .materializer
        .decide(c.id, Decision::Approved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
    assert!(h.store.list_items().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_materialization_leaves_no_partial_state() {
    let h = harness();
    let c = h.materializer.submit(money()).await.unwrap();

    h.store
        .fail_before_seed
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let err = h
        .materializer
        .decide(c.id, Decision::Approved, Some("looks good".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Storage(_)));

    // Nothing applied: no item, no event, contribution still pending with no
    // remark, even though the item and status writes happened before the
    // failure point.
    assert!(h.store.get_item_by_uid(&c.uid).await.unwrap().is_none());
    assert!(h.store.latest_event(&c.uid).await.unwrap().is_none());
    let stored = h.store.get_contribution(c.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ContributionStatus::Pending);
    assert!(stored.admin_remark.is_none());

    // And the retry succeeds.
    h.materializer
        .decide(c.id, Decision::Approved, None)
        .await
        .unwrap();
    assert!(h.store.get_item_by_uid(&c.uid).await.unwrap().is_some());
}

#[tokio::test]
async fn perishable_without_expiry_fails_before_any_mutation() {
    let h = harness();
    let err = h.materializer.submit(product(true, None)).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert!(h
        .materializer
        .list(Some(ContributionStatus::Pending))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn listing_filters_by_status() {
    let h = harness();
    let a = h.materializer.submit(money()).await.unwrap();
    let _b = h.materializer.submit(product(false, None)).await.unwrap();
    h.materializer
        .decide(a.id, Decision::Rejected, None)
        .await
        .unwrap();

    assert_eq!(
        h.materializer
            .list(Some(ContributionStatus::Pending))
            .await
            .unwrap()
            .len(),
        1
    );
    assert_eq!(
        h.materializer
            .list(Some(ContributionStatus::Rejected))
            .await
            .unwrap()
            .len(),
        1
    );
    assert_eq!(h.materializer.list(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn dispatch_records_origin_and_flips_item_status() {
    let h = harness();
    let uid = approved_shipment(&h).await;
    let date = NaiveDate::from_ymd_opt(2026, 8, 20).unwrap();

    let event = h
        .ledger
        .dispatch(
            &uid,
            DestinationKind::Orphanage,
            1,
            date,
            DispatchDetails::default(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(event.status, STATUS_DISPATCHED);
    assert_eq!(event.from_location.as_deref(), Some(MAIN_WAREHOUSE));
    assert_eq!(event.to_name.as_deref(), Some("Sunrise Home"));
    assert_eq!(event.dispatched_by.as_deref(), Some("Admin"));
    assert_eq!(event.dispatch_date, Some(date));

    let item = h.store.get_item_by_uid(&uid).await.unwrap().unwrap();
    assert_eq!(item.status, ItemStatus::Dispatched);
    // Dispatch does not move the item; delivery does.
    assert_eq!(item.location, MAIN_WAREHOUSE);
}

#[tokio::test]
async fn dispatch_to_unknown_destination_appends_nothing() {
    let h = harness();
    let uid = approved_shipment(&h).await;

    let err = h
        .ledger
        .dispatch(
            &uid,
            DestinationKind::Disaster,
            999,
            NaiveDate::from_ymd_opt(2026, 8, 20).unwrap(),
            DispatchDetails::default(),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    assert_eq!(h.ledger.timeline(&uid).await.unwrap().len(), 1);
}

#[tokio::test]
async fn delivery_patches_latest_in_place() {
    let h = harness();
    let uid = approved_shipment(&h).await;
    let dispatch_date = NaiveDate::from_ymd_opt(2026, 8, 20).unwrap();
    h.ledger
        .dispatch(
            &uid,
            DestinationKind::Orphanage,
            1,
            dispatch_date,
            DispatchDetails::default(),
            None,
        )
        .await
        .unwrap();

    let delivered_date = NaiveDate::from_ymd_opt(2026, 8, 22).unwrap();
    let patched = h
        .ledger
        .mark_delivered(
            &uid,
            delivered_date,
            Some("Sunrise Home".to_string()),
            Some("signed by warden".to_string()),
            None,
        )
        .await
        .unwrap();

    assert_eq!(patched.status, "Delivered");
    assert_eq!(patched.delivered_date, Some(delivered_date));
    // Identity fields from the dispatch survive the patch.
    assert_eq!(patched.dispatch_date, Some(dispatch_date));
    assert_eq!(patched.to_name.as_deref(), Some("Sunrise Home"));

    // In place: seed + dispatch only, no third entry.
    assert_eq!(h.ledger.timeline(&uid).await.unwrap().len(), 2);

    let item = h.store.get_item_by_uid(&uid).await.unwrap().unwrap();
    assert_eq!(item.status, ItemStatus::Delivered);
    assert_eq!(item.location, "Sunrise Home");
}

#[tokio::test]
async fn manual_milestone_appends_with_carried_identity() {
    let h = harness();
    let uid = approved_shipment(&h).await;
    h.ledger
        .dispatch(
            &uid,
            DestinationKind::Orphanage,
            1,
            NaiveDate::from_ymd_opt(2026, 8, 20).unwrap(),
            DispatchDetails::default(),
            None,
        )
        .await
        .unwrap();

    let entry = h
        .ledger
        .add_timeline_entry(
            &uid,
            "In transit".to_string(),
            Some("Highway checkpoint".to_string()),
            None,
            None,
        )
        .await
        .unwrap();

    assert_eq!(entry.status, "In transit");
    assert_eq!(entry.to_name.as_deref(), Some("Sunrise Home"));
    assert_eq!(h.ledger.timeline(&uid).await.unwrap().len(), 3);

    // Location went to the item, not into the ledger's remarks.
    let item = h.store.get_item_by_uid(&uid).await.unwrap().unwrap();
    assert_eq!(item.location, "Highway checkpoint");
    assert!(entry.remarks.is_none());
}

#[tokio::test]
async fn stale_expected_track_id_is_rejected() {
    let h = harness();
    let uid = approved_shipment(&h).await;
    let seed = h.store.latest_event(&uid).await.unwrap().unwrap();
    h.ledger
        .add_timeline_entry(&uid, "Packed".to_string(), None, None, None)
        .await
        .unwrap();

    // Another writer moved the ledger past the seed entry.
    let err = h
        .ledger
        .add_timeline_entry(&uid, "Repacked".to_string(), None, None, Some(seed.track_id))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::StaleWrite(_)));
    assert_eq!(h.ledger.timeline(&uid).await.unwrap().len(), 2);

    let err = h
        .ledger
        .mark_delivered(
            &uid,
            NaiveDate::from_ymd_opt(2026, 8, 22).unwrap(),
            None,
            None,
            Some(TrackId::new(seed.track_id.value())),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::StaleWrite(_)));
}

#[tokio::test]
async fn edit_latest_keeps_omitted_fields() {
    let h = harness();
    let uid = approved_shipment(&h).await;

    let patched = h
        .ledger
        .edit_latest(
            &uid,
            EventPatch {
                status: None,
                delivered_date: None,
                remarks: Some("double-checked".to_string()),
            },
            None,
            None,
        )
        .await
        .unwrap();

    assert_eq!(patched.status, STATUS_CREATED);
    assert_eq!(patched.remarks.as_deref(), Some("double-checked"));
}

#[tokio::test]
async fn timeline_for_unknown_uid_is_not_found() {
    let h = harness();
    let uid = reliefstock_core::Uid::new("PROD-missing").unwrap();
    let err = h.ledger.timeline(&uid).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn overview_returns_latest_entry_per_shipment() {
    let h = harness();
    let a = approved_shipment(&h).await;
    let b = approved_shipment(&h).await;
    h.ledger
        .add_timeline_entry(&a, "Packed".to_string(), None, None, None)
        .await
        .unwrap();

    let overview = h.ledger.overview().await.unwrap();
    assert_eq!(overview.len(), 2);
    let entry_a = overview.iter().find(|e| e.uid == a).unwrap();
    let entry_b = overview.iter().find(|e| e.uid == b).unwrap();
    assert_eq!(entry_a.status, "Packed");
    assert_eq!(entry_b.status, STATUS_CREATED);
}

#[tokio::test]
async fn expiry_window_includes_today_and_day_thirty_only() {
    let h = harness();
    let as_of = Utc::now().date_naive();

    let in_window = [as_of, as_of + Duration::days(EXPIRY_WINDOW_DAYS)];
    let out_of_window = [
        as_of - Duration::days(1),
        as_of + Duration::days(EXPIRY_WINDOW_DAYS + 1),
    ];
    for expiry in in_window.iter().chain(out_of_window.iter()) {
        let c = h
            .materializer
            .submit(product(true, Some(*expiry)))
            .await
            .unwrap();
        h.materializer
            .decide(c.id, Decision::Approved, None)
            .await
            .unwrap();
    }
    // Durable item, never listed.
    let c = h.materializer.submit(product(false, None)).await.unwrap();
    h.materializer
        .decide(c.id, Decision::Approved, None)
        .await
        .unwrap();

    let expiring = h.monitor.expiring_soon(Some(as_of)).await.unwrap();
    let days: Vec<i64> = expiring.iter().map(|e| e.days_left).collect();
    assert_eq!(days, vec![0, EXPIRY_WINDOW_DAYS]);
}
