use axum::Router;

pub mod contributions;
pub mod inventory;
pub mod system;
pub mod tracking;

/// Router for all service endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/contributions", contributions::router())
        .nest("/inventory", inventory::router())
        .nest("/tracking", tracking::router())
}
