//! # ticket-db
//!
//! Persistence layer implementing the ticket repository traits.
//!
//! ## Overview
//!
//! - Connection pool management and schema migrations
//! - Database models with SQLx `FromRow` derives
//! - Entity ↔ Model mappers
//! - PostgreSQL repositories, where a partial unique index enforces one
//!   active ticket per user and `UPDATE .. WHERE status = $expected`
//!   implements compare-and-update
//! - In-memory repositories with the same guarantees, for tests and
//!   single-process development runs
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ticket_db::pool::{create_pool, run_migrations, DatabaseConfig};
//! use ticket_db::repositories::PgTicketRepository;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&DatabaseConfig::from_env()).await?;
//!     run_migrations(&pool, "./migrations").await?;
//!     let tickets = PgTicketRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, create_pool_from_env, run_migrations, DatabaseConfig, PgPool};
pub use repositories::{
    MemorySettingsRepository, MemoryTicketRepository, PgSettingsRepository, PgTicketRepository,
};
