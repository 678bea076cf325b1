use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use reliefstock_core::{TrackId, Uid};
use reliefstock_infra::ledger::DispatchDetails;
use reliefstock_tracking::{DestinationKind, EventPatch};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(overview))
        .route("/:uid", get(timeline))
        .route("/:uid/dispatch", post(dispatch))
        .route("/:uid/delivered", post(delivered))
        .route("/:uid/latest", put(edit_latest))
        .route("/:uid/entries", post(add_entry))
}

fn parse_uid(raw: String) -> Result<Uid, axum::response::Response> {
    Uid::new(raw)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_uid", e.to_string()))
}

pub async fn overview(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.ledger.overview().await {
        Ok(events) => {
            let body: Vec<_> = events.iter().map(dto::event_to_json).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn timeline(
    Extension(services): Extension<Arc<AppServices>>,
    Path(uid): Path<String>,
) -> axum::response::Response {
    let uid = match parse_uid(uid) {
        Ok(uid) => uid,
        Err(resp) => return resp,
    };
    match services.ledger.timeline(&uid).await {
        Ok(events) => {
            let body: Vec<_> = events.iter().map(dto::event_to_json).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn dispatch(
    Extension(services): Extension<Arc<AppServices>>,
    Path(uid): Path<String>,
    Json(body): Json<dto::DispatchRequest>,
) -> axum::response::Response {
    let uid = match parse_uid(uid) {
        Ok(uid) => uid,
        Err(resp) => return resp,
    };
    let to_type: DestinationKind = match body.to_type.parse() {
        Ok(to_type) => to_type,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_destination", e.to_string())
        }
    };

    let details = DispatchDetails {
        dispatched_by: body.dispatched_by,
        remarks: body.remarks,
    };
    match services
        .ledger
        .dispatch(
            &uid,
            to_type,
            body.to_id,
            body.dispatch_date,
            details,
            body.expected_track_id.map(TrackId::new),
        )
        .await
    {
        Ok(event) => (StatusCode::CREATED, Json(dto::event_to_json(&event))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delivered(
    Extension(services): Extension<Arc<AppServices>>,
    Path(uid): Path<String>,
    Json(body): Json<dto::DeliveredRequest>,
) -> axum::response::Response {
    let uid = match parse_uid(uid) {
        Ok(uid) => uid,
        Err(resp) => return resp,
    };
    match services
        .ledger
        .mark_delivered(
            &uid,
            body.delivered_date,
            body.location,
            body.remarks,
            body.expected_track_id.map(TrackId::new),
        )
        .await
    {
        Ok(event) => (StatusCode::OK, Json(dto::event_to_json(&event))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn edit_latest(
    Extension(services): Extension<Arc<AppServices>>,
    Path(uid): Path<String>,
    Json(body): Json<dto::EditLatestRequest>,
) -> axum::response::Response {
    let uid = match parse_uid(uid) {
        Ok(uid) => uid,
        Err(resp) => return resp,
    };
    let patch = EventPatch {
        status: body.status,
        delivered_date: body.delivered_date,
        remarks: body.remarks,
    };
    match services
        .ledger
        .edit_latest(
            &uid,
            patch,
            body.location,
            body.expected_track_id.map(TrackId::new),
        )
        .await
    {
        Ok(event) => (StatusCode::OK, Json(dto::event_to_json(&event))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn add_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Path(uid): Path<String>,
    Json(body): Json<dto::TimelineEntryRequest>,
) -> axum::response::Response {
    let uid = match parse_uid(uid) {
        Ok(uid) => uid,
        Err(resp) => return resp,
    };
    match services
        .ledger
        .add_timeline_entry(
            &uid,
            body.status,
            body.location,
            body.remarks,
            body.expected_track_id.map(TrackId::new),
        )
        .await
    {
        Ok(event) => (StatusCode::CREATED, Json(dto::event_to_json(&event))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
