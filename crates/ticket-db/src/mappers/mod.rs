//! Entity to model mappers
//!
//! - `TryFrom<TicketModel> for Ticket`: text columns are parsed back into enums
//! - `From<TicketSettingsModel> for TicketSettings`
//! - `TicketInsert`: entity data prepared for binding

mod settings;
mod ticket;

pub use ticket::TicketInsert;
