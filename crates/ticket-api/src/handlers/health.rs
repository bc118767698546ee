//! Health check handler

use axum::{extract::State, http::StatusCode, Json};
use ticket_service::dto::HealthResponse;

use crate::state::AppState;

/// Liveness plus database reachability
///
/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match state.pool() {
        Some(pool) => Some(pool.acquire().await.is_ok()),
        None => None,
    };
    let healthy = database.unwrap_or(true);

    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_watchers: state.controller().watchers().active_count(),
        database: database.map(|up| if up { "up" } else { "down" }.to_string()),
    };
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
