//! Axum extractors for request handling
//!
//! Custom extractors for forwarder authentication, validation, and path ids.

mod auth;
mod path;
mod validated;

pub use auth::InteractionAuth;
pub use path::{SnowflakePath, TicketIdPath};
pub use validated::ValidatedJson;
