//! In-memory repositories
//!
//! Same guarantees as the PostgreSQL implementations: one active ticket per
//! user, and compare-and-update checked and applied under a single write lock.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use ticket_core::{
    DomainError, RepoResult, SettingsRepository, Snowflake, Ticket, TicketMutation,
    TicketRepository, TicketSettings, TicketStatus,
};

#[derive(Default)]
pub struct MemoryTicketRepository {
    tickets: RwLock<HashMap<Snowflake, Ticket>>,
}

impl MemoryTicketRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tickets, active or not
    pub fn len(&self) -> usize {
        self.tickets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.read().is_empty()
    }

    /// Insert or replace a record without any checks
    pub fn insert_raw(&self, ticket: Ticket) {
        self.tickets.write().insert(ticket.id, ticket);
    }
}

fn active_for(
    tickets: &HashMap<Snowflake, Ticket>,
    guild_id: Snowflake,
    user_id: Snowflake,
) -> Option<&Ticket> {
    tickets
        .values()
        .find(|t| t.guild_id == guild_id && t.user_id == user_id && t.status.is_active())
}

#[async_trait]
impl TicketRepository for MemoryTicketRepository {
    async fn create(&self, ticket: &Ticket) -> RepoResult<()> {
        let mut tickets = self.tickets.write();

        if ticket.status.is_active() {
            if let Some(existing) = active_for(&tickets, ticket.guild_id, ticket.user_id) {
                return Err(DomainError::DuplicateTicket {
                    existing: existing.id,
                });
            }
        }
        if tickets.contains_key(&ticket.id) {
            return Err(DomainError::DatabaseError(format!(
                "Ticket {} already exists",
                ticket.id
            )));
        }

        tickets.insert(ticket.id, ticket.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Ticket>> {
        Ok(self.tickets.read().get(&id).cloned())
    }

    async fn find_open_by_user(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<Ticket>> {
        Ok(active_for(&self.tickets.read(), guild_id, user_id).cloned())
    }

    async fn find_active(&self) -> RepoResult<Vec<Ticket>> {
        let mut active: Vec<Ticket> = self
            .tickets
            .read()
            .values()
            .filter(|t| t.status.is_active())
            .cloned()
            .collect();
        active.sort_by_key(|t| (t.created_at, t.id));
        Ok(active)
    }

    async fn find_awaiting_channel_deletion(&self) -> RepoResult<Vec<Ticket>> {
        let mut pending: Vec<Ticket> = self
            .tickets
            .read()
            .values()
            .filter(|t| t.awaits_channel_deletion())
            .cloned()
            .collect();
        pending.sort_by_key(|t| (t.closed_at, t.id));
        Ok(pending)
    }

    async fn compare_and_update(
        &self,
        id: Snowflake,
        expected: TicketStatus,
        mutation: TicketMutation,
    ) -> RepoResult<Ticket> {
        let mut tickets = self.tickets.write();
        let ticket = tickets
            .get_mut(&id)
            .ok_or(DomainError::TicketNotFound(id))?;

        if ticket.status != expected || !mutation.precondition_holds(ticket) {
            return Err(DomainError::conflict(expected, ticket));
        }

        ticket.apply(&mutation);
        Ok(ticket.clone())
    }

    async fn delete(&self, id: Snowflake) -> RepoResult<()> {
        self.tickets
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(DomainError::TicketNotFound(id))
    }
}

#[derive(Default)]
pub struct MemorySettingsRepository {
    settings: RwLock<HashMap<Snowflake, TicketSettings>>,
}

impl MemorySettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove(&self, guild_id: Snowflake) -> Option<TicketSettings> {
        self.settings.write().remove(&guild_id)
    }
}

#[async_trait]
impl SettingsRepository for MemorySettingsRepository {
    async fn find(&self, guild_id: Snowflake) -> RepoResult<Option<TicketSettings>> {
        Ok(self.settings.read().get(&guild_id).cloned())
    }

    async fn upsert(&self, settings: &TicketSettings) -> RepoResult<()> {
        self.settings
            .write()
            .insert(settings.guild_id, settings.clone());
        Ok(())
    }
}
