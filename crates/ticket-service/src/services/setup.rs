//! Guild setup and ticket type selection
//!
//! Handles the `ticket-setup` command and the pending selections made on
//! the panel for types that need a details form before creation.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info, instrument};
use validator::Validate;

use ticket_core::{DomainError, Permissions, Snowflake, TicketSettings, TicketType};

use crate::dto::TicketSetupRequest;

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy)]
struct PendingSelection {
    ticket_type: TicketType,
    expires_at: DateTime<Utc>,
}

/// Setup service
pub struct SetupService {
    ctx: ServiceContext,
    /// `(guild, user)` -> type chosen on the panel, awaiting the details form
    pending: DashMap<(Snowflake, Snowflake), PendingSelection>,
}

impl SetupService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            ctx,
            pending: DashMap::new(),
        }
    }

    /// Create or update the guild's ticket settings
    ///
    /// Options left out keep their stored value.
    #[instrument(skip(self, request))]
    pub async fn configure(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        member_permissions: Permissions,
        request: TicketSetupRequest,
    ) -> ServiceResult<TicketSettings> {
        if !member_permissions.has(Permissions::MANAGE_GUILD) {
            return Err(ServiceError::permission_denied("MANAGE_GUILD"));
        }
        request.validate()?;

        let mut settings = match self.ctx.settings_repo().find(guild_id).await? {
            Some(existing) => existing,
            None => TicketSettings::new(
                guild_id,
                request.category,
                self.ctx.timings().inactivity_hours,
            ),
        };

        settings.category_id = request.category;
        if let Some(channel) = request.transcript {
            settings.transcript_channel_id = Some(channel);
        }
        if let Some(role) = request.staff_role {
            settings.staff_role_id = Some(role);
        }
        if let Some(enabled) = request.auto_close_enabled {
            settings.auto_close_enabled = enabled;
        }
        if let Some(hours) = request.auto_close_hours {
            settings.auto_close_hours = hours;
        }
        if let Some(message) = request.welcome_message {
            settings.welcome_message = message;
        }
        settings.updated_at = self.ctx.now();

        self.ctx.settings_repo().upsert(&settings).await?;

        info!(
            guild_id = %guild_id,
            category_id = %settings.category_id,
            auto_close = settings.auto_close_enabled,
            "Ticket system configured"
        );
        Ok(settings)
    }

    /// Remember a panel choice until the details form comes back
    pub fn remember_selection(&self, guild_id: Snowflake, user_id: Snowflake, ticket_type: TicketType) {
        let expires_at = self.ctx.now() + self.ctx.interaction_timeout();
        self.pending.insert(
            (guild_id, user_id),
            PendingSelection {
                ticket_type,
                expires_at,
            },
        );
        debug!(guild_id = %guild_id, user_id = %user_id, %ticket_type, "Selection pending details");
    }

    /// Consume a pending selection
    ///
    /// Missing, expired or mismatched selections yield `InteractionExpired`.
    pub fn take_selection(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        ticket_type: TicketType,
    ) -> ServiceResult<()> {
        let now = self.ctx.now();
        match self.pending.remove(&(guild_id, user_id)) {
            Some((_, pending)) if pending.ticket_type == ticket_type && now < pending.expires_at => {
                Ok(())
            }
            _ => Err(DomainError::InteractionExpired.into()),
        }
    }

    /// Drop expired selections; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.ctx.now();
        let before = self.pending.len();
        self.pending.retain(|_, pending| now < pending.expires_at);
        before.saturating_sub(self.pending.len())
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
