//! Health check handlers.

use axum::{routing::get, Router};

use crate::api::state::AppState;

/// Create health routes.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/healthcheck", get(healthcheck))
}

/// Liveness probe. Always answers `OK`, regardless of backend state.
#[utoipa::path(
    get,
    path = "/healthcheck",
    tag = "Health",
    responses(
        (status = 200, description = "Service is running", body = String)
    )
)]
pub async fn healthcheck() -> &'static str {
    "OK"
}
