//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation (Postgres or in-memory).

use async_trait::async_trait;

use crate::entities::{Ticket, TicketMutation, TicketSettings, TicketStatus};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Ticket Repository
// ============================================================================

#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Insert a new ticket
    ///
    /// Fails with `DuplicateTicket` if the user already has an open or
    /// claimed ticket in the guild. The store enforces this atomically.
    async fn create(&self, ticket: &Ticket) -> RepoResult<()>;

    /// Find ticket by id (channel id)
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Ticket>>;

    /// The user's open or claimed ticket in a guild, if any
    async fn find_open_by_user(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<Ticket>>;

    /// All open or claimed tickets, oldest first
    async fn find_active(&self) -> RepoResult<Vec<Ticket>>;

    /// Closed tickets whose channel deletion was never recorded
    async fn find_awaiting_channel_deletion(&self) -> RepoResult<Vec<Ticket>>;

    /// Apply `mutation` only if the stored status equals `expected`
    ///
    /// Returns the updated record. Fails with `Conflict` when the status
    /// (or the mutation's own precondition) no longer holds, and with
    /// `TicketNotFound` when the record is gone.
    async fn compare_and_update(
        &self,
        id: Snowflake,
        expected: TicketStatus,
        mutation: TicketMutation,
    ) -> RepoResult<Ticket>;

    /// Remove a ticket record (rollback of a failed create)
    async fn delete(&self, id: Snowflake) -> RepoResult<()>;
}

// ============================================================================
// Settings Repository
// ============================================================================

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Find the ticket settings for a guild
    async fn find(&self, guild_id: Snowflake) -> RepoResult<Option<TicketSettings>>;

    /// Create or replace the settings for a guild
    async fn upsert(&self, settings: &TicketSettings) -> RepoResult<()>;
}
