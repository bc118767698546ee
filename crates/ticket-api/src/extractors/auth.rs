//! Forwarder authentication extractor
//!
//! The interaction forwarder authenticates with a shared bearer token.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::response::ApiError;
use crate::state::AppState;

/// Proof that the request carried the configured interaction token
#[derive(Debug, Clone, Copy)]
pub struct InteractionAuth;

#[async_trait]
impl<S> FromRequestParts<S> for InteractionAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::MissingAuth)?;

        let app_state = AppState::from_ref(state);
        if !tokens_match(bearer.token(), app_state.interaction_token()) {
            tracing::warn!("Rejected interaction with a bad token");
            return Err(ApiError::InvalidToken);
        }

        Ok(Self)
    }
}

/// Compare without short-circuiting on the first differing byte
fn tokens_match(given: &str, expected: &str) -> bool {
    let (given, expected) = (given.as_bytes(), expected.as_bytes());
    if given.len() != expected.len() {
        return false;
    }
    given
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
