//! Path parameter extractors
//!
//! Type-safe extraction of Snowflake IDs from path parameters.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use ticket_core::Snowflake;

use crate::response::ApiError;

/// Path parameters, with rejections mapped to `ApiError`
#[derive(Debug, Clone)]
pub struct SnowflakePath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for SnowflakePath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(inner) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_path(e.to_string()))?;

        Ok(SnowflakePath(inner))
    }
}

/// Path parameters with ticket_id
#[derive(Debug, serde::Deserialize)]
pub struct TicketIdPath {
    pub ticket_id: String,
}

impl TicketIdPath {
    /// Parse ticket_id as Snowflake
    pub fn ticket_id(&self) -> Result<Snowflake, ApiError> {
        self.ticket_id
            .parse()
            .map_err(|_| ApiError::invalid_path("Invalid ticket_id format"))
    }
}
