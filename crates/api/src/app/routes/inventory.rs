use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use reliefstock_core::Uid;
use reliefstock_infra::ServiceError;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list))
        .route("/expiring", get(expiring))
        .route("/:uid", get(get_by_uid))
}

pub async fn list(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.store.list_items().await {
        Ok(items) => {
            let body: Vec<_> = items.iter().map(dto::item_to_json).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::service_error_to_response(e.into()),
    }
}

/// Perishables expiring within the alert window, judged as of `as_of`
/// (default: today).
pub async fn expiring(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::ExpiringParams>,
) -> axum::response::Response {
    match services.monitor.expiring_soon(params.as_of).await {
        Ok(expiring) => {
            let body: Vec<_> = expiring.iter().map(dto::expiring_to_json).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_by_uid(
    Extension(services): Extension<Arc<AppServices>>,
    Path(uid): Path<String>,
) -> axum::response::Response {
    let uid = match Uid::new(uid) {
        Ok(uid) => uid,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_uid", e.to_string()),
    };
    match services.store.get_item_by_uid(&uid).await {
        Ok(Some(item)) => (StatusCode::OK, Json(dto::item_to_json(&item))).into_response(),
        Ok(None) => errors::service_error_to_response(ServiceError::not_found(format!(
            "no inventory item for {uid}"
        ))),
        Err(e) => errors::service_error_to_response(e.into()),
    }
}
