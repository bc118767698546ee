//! Route definitions
//!
//! Interaction and ticket routes are mounted under /api/v1; health sits at
//! the root.

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{health, interactions, tickets};
use crate::state::AppState;

/// Create the main router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", api_v1_routes())
        .merge(health_routes())
}

/// Health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health::health_check))
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/interactions", post(interactions::handle_interaction))
        .route("/tickets/:ticket_id", get(tickets::get_ticket))
}
