//! Interaction handler
//!
//! Single endpoint for every forwarded platform interaction. User-facing
//! refusals (duplicate ticket, self-claim, expired buttons) come back as
//! `200` with an ephemeral message; only genuine failures map to error
//! statuses.

use axum::extract::State;
use ticket_service::dto::{Interaction, InteractionReply};

use crate::extractors::{InteractionAuth, ValidatedJson};
use crate::response::{ApiJson, ApiResult};
use crate::state::AppState;

/// Dispatch a forwarded interaction
///
/// POST /api/v1/interactions
pub async fn handle_interaction(
    State(state): State<AppState>,
    _auth: InteractionAuth,
    ValidatedJson(interaction): ValidatedJson<Interaction>,
) -> ApiResult<ApiJson<InteractionReply>> {
    let reply = state.dispatcher().dispatch(interaction).await?;
    Ok(ApiJson(reply))
}
