//! # ticket-api
//!
//! HTTP front door for the ticket lifecycle, built with Axum.
//!
//! An interaction forwarder posts platform events (slash commands, panel
//! selections, modal submits, button presses) to `/api/v1/interactions`;
//! replies go back as JSON for the forwarder to render. Outbound platform
//! calls go through [`platform::RestPlatform`].

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod platform;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{create_app, create_app_state, run};
pub use state::AppState;
