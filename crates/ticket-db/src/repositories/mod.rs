//! Repository implementations
//!
//! PostgreSQL and in-memory implementations of the repository traits
//! defined in ticket-core.

mod error;
mod memory;
mod settings;
mod ticket;

pub use memory::{MemorySettingsRepository, MemoryTicketRepository};
pub use settings::PgSettingsRepository;
pub use ticket::PgTicketRepository;
