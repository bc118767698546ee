//! Database models - SQLx-compatible structs for PostgreSQL tables

mod settings;
mod ticket;

pub use settings::TicketSettingsModel;
pub use ticket::TicketModel;
