//! Ticket handlers

use axum::extract::State;
use ticket_service::dto::TicketResponse;

use crate::extractors::{InteractionAuth, SnowflakePath, TicketIdPath};
use crate::response::{ApiJson, ApiResult};
use crate::state::AppState;

/// Get a ticket by id
///
/// GET /api/v1/tickets/:ticket_id
pub async fn get_ticket(
    State(state): State<AppState>,
    _auth: InteractionAuth,
    SnowflakePath(path): SnowflakePath<TicketIdPath>,
) -> ApiResult<ApiJson<TicketResponse>> {
    let ticket_id = path.ticket_id()?;
    let ticket = state.controller().get_ticket(ticket_id).await?;
    Ok(ApiJson(TicketResponse::from(ticket)))
}
