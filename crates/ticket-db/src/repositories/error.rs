//! Error handling utilities for repositories

use sqlx::Error as SqlxError;
use ticket_core::DomainError;

/// Name of the partial unique index guarding one active ticket per user
pub const ACTIVE_TICKET_INDEX: &str = "tickets_one_active_per_user";

/// Convert SQLx error to DomainError
pub fn map_db_error(e: SqlxError) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}

/// True when `e` violated the one-active-ticket index
pub fn is_active_ticket_violation(e: &SqlxError) -> bool {
    e.as_database_error().is_some_and(|db_err| {
        db_err.is_unique_violation() && db_err.constraint() == Some(ACTIVE_TICKET_INDEX)
    })
}
