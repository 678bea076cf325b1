use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use reliefstock_contributions::{ContributionKind, ContributionStatus, Decision};
use reliefstock_core::ContributionId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(submit).get(list))
        .route("/:id", get(get_one))
        .route("/:id/decision", post(decide))
}

pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    Json(kind): Json<ContributionKind>,
) -> axum::response::Response {
    match services.materializer.submit(kind).await {
        Ok(contribution) => (
            StatusCode::CREATED,
            Json(dto::contribution_to_json(&contribution)),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::ListContributionsParams>,
) -> axum::response::Response {
    let status = match params.status.as_deref() {
        Some(raw) => match raw.parse::<ContributionStatus>() {
            Ok(status) => Some(status),
            Err(e) => {
                return errors::json_error(StatusCode::BAD_REQUEST, "invalid_status", e.to_string())
            }
        },
        None => None,
    };

    match services.materializer.list(status).await {
        Ok(contributions) => {
            let body: Vec<_> = contributions.iter().map(dto::contribution_to_json).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_one(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ContributionId = match id.parse() {
        Ok(id) => id,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid contribution id")
        }
    };
    match services.materializer.get(id).await {
        Ok(contribution) => {
            (StatusCode::OK, Json(dto::contribution_to_json(&contribution))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn decide(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::DecisionRequest>,
) -> axum::response::Response {
    let id: ContributionId = match id.parse() {
        Ok(id) => id,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid contribution id")
        }
    };
    let decision: Decision = match body.decision.parse() {
        Ok(decision) => decision,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_decision", e.to_string())
        }
    };

    match services.materializer.decide(id, decision, body.remark).await {
        Ok(outcome) => (StatusCode::OK, Json(dto::decision_to_json(&outcome))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
