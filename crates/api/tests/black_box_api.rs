//! Black-box tests against a real HTTP server on an ephemeral port.

use std::sync::Arc;

use serde_json::{json, Value};

use reliefstock_api::app::services::{AppServices, DynRegistry, DynStore};
use reliefstock_api::app::build_app_from;
use reliefstock_infra::{InMemoryRegistry, InMemoryStore};
use reliefstock_tracking::DestinationKind;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
}

impl TestServer {
    async fn spawn() -> Self {
        let store: DynStore = Arc::new(InMemoryStore::new());
        let registry = Arc::new(InMemoryRegistry::new());
        registry.register(DestinationKind::Orphanage, 1, "Sunrise Home");
        registry.register(DestinationKind::Disaster, 7, "Cyclone Relief Camp");
        let registry: DynRegistry = registry;

        let app = build_app_from(Arc::new(AppServices::new(store, registry)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server run");
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
        }
    }

    async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .expect("request failed")
    }

    async fn put(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .put(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .expect("request failed")
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .expect("request failed")
    }

    /// Submits a durable product and approves it, returning `(id, uid)`.
    async fn approved_product(&self) -> (String, String) {
        let resp = self
            .post(
                "/contributions",
                &json!({
                    "type": "physical_product",
                    "product_name": "Blankets",
                    "category": "clothing",
                    "quantity": 40,
                    "unit": "pcs",
                    "perishable": false,
                    "manufacture_date": null,
                    "expiry_date": null,
                }),
            )
            .await;
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.unwrap();
        let id = body["id"].as_str().unwrap().to_string();
        let uid = body["uid"].as_str().unwrap().to_string();

        let resp = self
            .post(
                &format!("/contributions/{id}/decision"),
                &json!({ "decision": "approved" }),
            )
            .await;
        assert_eq!(resp.status(), 200);
        (id, uid)
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let server = TestServer::spawn().await;
    let resp = server.get("/health").await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn contribution_lifecycle_over_http() {
    let server = TestServer::spawn().await;

    let resp = server
        .post(
            "/contributions",
            &json!({ "type": "money_donation", "amount": 2500, "method": "upi" }),
        )
        .await;
    assert_eq!(resp.status(), 201);
    let contribution: Value = resp.json().await.unwrap();
    let id = contribution["id"].as_str().unwrap();
    let uid = contribution["uid"].as_str().unwrap().to_string();
    assert!(uid.starts_with("DON-"));
    assert_eq!(contribution["status"], "pending");

    let resp = server.get("/contributions?status=pending").await;
    let pending: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(pending.len(), 1);

    let resp = server
        .post(
            &format!("/contributions/{id}/decision"),
            &json!({ "decision": "approved", "remark": "verified" }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let outcome: Value = resp.json().await.unwrap();
    assert_eq!(outcome["status"], "approved");
    assert!(outcome["inventory_id"].is_string());
    assert!(outcome["advisory"]["verdict"].is_string());

    let resp = server.get(&format!("/inventory/{uid}")).await;
    assert_eq!(resp.status(), 200);
    let item: Value = resp.json().await.unwrap();
    assert_eq!(item["status"], "received");
    assert_eq!(item["location"], "Main Warehouse");
    assert_eq!(item["amount"], 2500);

    let resp = server.get(&format!("/tracking/{uid}")).await;
    assert_eq!(resp.status(), 200);
    let timeline: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0]["status"], "Created");
    assert_eq!(timeline[0]["from_location"], "Donor");
    assert_eq!(timeline[0]["to_name"], "Admin");
}

#[tokio::test]
async fn dispatch_and_delivery_over_http() {
    let server = TestServer::spawn().await;
    let (_, uid) = server.approved_product().await;

    let resp = server
        .post(
            &format!("/tracking/{uid}/dispatch"),
            &json!({
                "to_type": "orphanage",
                "to_id": 1,
                "dispatch_date": "2026-08-20",
            }),
        )
        .await;
    assert_eq!(resp.status(), 201);
    let event: Value = resp.json().await.unwrap();
    assert_eq!(event["status"], "Dispatched");
    assert_eq!(event["from_location"], "Main Warehouse");
    assert_eq!(event["to_name"], "Sunrise Home");

    let resp = server
        .post(
            &format!("/tracking/{uid}/delivered"),
            &json!({
                "delivered_date": "2026-08-22",
                "location": "Sunrise Home",
                "remarks": "signed by warden",
            }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let event: Value = resp.json().await.unwrap();
    assert_eq!(event["status"], "Delivered");
    assert_eq!(event["dispatch_date"], "2026-08-20");

    // Patched in place, not appended.
    let resp = server.get(&format!("/tracking/{uid}")).await;
    let timeline: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(timeline.len(), 2);

    let resp = server.get(&format!("/inventory/{uid}")).await;
    let item: Value = resp.json().await.unwrap();
    assert_eq!(item["status"], "delivered");
    assert_eq!(item["location"], "Sunrise Home");
}

#[tokio::test]
async fn manual_entries_and_overview() {
    let server = TestServer::spawn().await;
    let (_, uid) = server.approved_product().await;

    let resp = server
        .post(
            &format!("/tracking/{uid}/entries"),
            &json!({ "status": "Packed", "location": "Loading bay" }),
        )
        .await;
    assert_eq!(resp.status(), 201);

    let resp = server.get("/tracking").await;
    assert_eq!(resp.status(), 200);
    let overview: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(overview.len(), 1);
    assert_eq!(overview[0]["status"], "Packed");
}

#[tokio::test]
async fn decision_error_statuses() {
    let server = TestServer::spawn().await;
    let (id, _) = server.approved_product().await;

    // Already decided.
    let resp = server
        .post(
            &format!("/contributions/{id}/decision"),
            &json!({ "decision": "approved" }),
        )
        .await;
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "conflict");

    // Garbage decision verb.
    let resp = server
        .post(
            &format!("/contributions/{id}/decision"),
            &json!({ "decision": "maybe" }),
        )
        .await;
    assert_eq!(resp.status(), 400);

    // Unknown contribution.
    let resp = server
        .post(
            "/contributions/00000000-0000-0000-0000-000000000000/decision",
            &json!({ "decision": "approved" }),
        )
        .await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn stale_track_id_is_a_conflict() {
    let server = TestServer::spawn().await;
    let (_, uid) = server.approved_product().await;

    let resp = server.get(&format!("/tracking/{uid}")).await;
    let timeline: Vec<Value> = resp.json().await.unwrap();
    let seed_track_id = timeline[0]["track_id"].as_i64().unwrap();

    // Move the ledger forward, then write against the stale track id.
    let resp = server
        .post(
            &format!("/tracking/{uid}/entries"),
            &json!({ "status": "Packed" }),
        )
        .await;
    assert_eq!(resp.status(), 201);

    let resp = server
        .put(
            &format!("/tracking/{uid}/latest"),
            &json!({ "remarks": "late note", "expected_track_id": seed_track_id }),
        )
        .await;
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "stale_write");
}

#[tokio::test]
async fn expiring_view_over_http() {
    let server = TestServer::spawn().await;

    let resp = server
        .post(
            "/contributions",
            &json!({
                "type": "physical_product",
                "product_name": "Rice",
                "category": "food",
                "quantity": 25,
                "unit": "kg",
                "perishable": true,
                "manufacture_date": null,
                "expiry_date": "2026-09-05",
            }),
        )
        .await;
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    let id = body["id"].as_str().unwrap();
    let resp = server
        .post(
            &format!("/contributions/{id}/decision"),
            &json!({ "decision": "approved" }),
        )
        .await;
    assert_eq!(resp.status(), 200);

    // In window as of Aug 28, out of window a year later.
    let resp = server.get("/inventory/expiring?as_of=2026-08-28").await;
    assert_eq!(resp.status(), 200);
    let expiring: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(expiring.len(), 1);
    assert_eq!(expiring[0]["days_left"], 8);

    let resp = server.get("/inventory/expiring?as_of=2027-08-28").await;
    let expiring: Vec<Value> = resp.json().await.unwrap();
    assert!(expiring.is_empty());

    // Unknown tracking uid is a 404.
    let resp = server.get("/tracking/PROD-missing").await;
    assert_eq!(resp.status(), 404);
}
