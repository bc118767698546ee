//! Ticket lifecycle controller
//!
//! Owns every state transition of a ticket: create, claim and close. Each
//! transition is a single compare-and-update against the store; whoever
//! wins that write performs the side effects, so a manual close racing an
//! auto-close archives and deletes exactly once.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use ticket_core::{
    ticket_channel_name, ChannelSpec, ClaimCheck, DomainError, Permissions, Rating, Snowflake,
    Ticket, TicketMutation, TicketType,
};

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::feedback::FeedbackCollector;
use super::interactions::InteractionRegistry;
use super::notices;
use super::transcript::TranscriptArchiver;
use super::watcher::{self, WatcherRegistry};

/// Input for [`LifecycleController::create`]
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    /// Used for the channel name
    pub username: String,
    pub ticket_type: TicketType,
    pub reason: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed(Ticket),
    /// Someone else got there first; the record is returned unchanged
    AlreadyClaimed(Ticket),
}

impl ClaimOutcome {
    pub fn ticket(&self) -> &Ticket {
        match self {
            Self::Claimed(t) | Self::AlreadyClaimed(t) => t,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed(Ticket),
    /// Lost the race to a concurrent close; no side effects were run
    AlreadyClosed(Ticket),
}

impl CloseOutcome {
    pub fn ticket(&self) -> &Ticket {
        match self {
            Self::Closed(t) | Self::AlreadyClosed(t) => t,
        }
    }
}

pub struct LifecycleController {
    ctx: ServiceContext,
    watchers: WatcherRegistry,
    interactions: Arc<InteractionRegistry>,
}

impl LifecycleController {
    pub fn new(ctx: ServiceContext) -> Self {
        Self::with_interactions(ctx, Arc::new(InteractionRegistry::new()))
    }

    pub fn with_interactions(ctx: ServiceContext, interactions: Arc<InteractionRegistry>) -> Self {
        Self {
            ctx,
            watchers: WatcherRegistry::new(),
            interactions,
        }
    }

    pub fn context(&self) -> &ServiceContext {
        &self.ctx
    }

    pub fn watchers(&self) -> &WatcherRegistry {
        &self.watchers
    }

    pub fn interactions(&self) -> &Arc<InteractionRegistry> {
        &self.interactions
    }

    /// Fetch a ticket record
    #[instrument(skip(self))]
    pub async fn get_ticket(&self, ticket_id: Snowflake) -> ServiceResult<Ticket> {
        self.ctx
            .ticket_repo()
            .find_by_id(ticket_id)
            .await?
            .ok_or_else(|| DomainError::TicketNotFound(ticket_id).into())
    }

    /// Reject when the user already has an open or claimed ticket in the guild
    pub async fn ensure_no_open_ticket(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<()> {
        match self.ctx.ticket_repo().find_open_by_user(guild_id, user_id).await? {
            Some(existing) => Err(DomainError::DuplicateTicket {
                existing: existing.id,
            }
            .into()),
            None => Ok(()),
        }
    }

    /// Open a ticket: allocate the channel, persist the record, welcome the
    /// owner and start the inactivity watcher
    #[instrument(skip(self, request), fields(guild_id = %request.guild_id, user_id = %request.user_id))]
    pub async fn create(self: &Arc<Self>, request: NewTicket) -> ServiceResult<Ticket> {
        let settings = self
            .ctx
            .settings_repo()
            .find(request.guild_id)
            .await?
            .ok_or(DomainError::SettingsNotFound(request.guild_id))?;

        self.ensure_no_open_ticket(request.guild_id, request.user_id)
            .await?;

        let spec = ChannelSpec::private_ticket(
            request.guild_id,
            ticket_channel_name(request.ticket_type, &request.username),
            settings.category_id,
            request.user_id,
            self.ctx.bot_user_id(),
            settings.staff_role_id,
        );
        let channel_id = self.ctx.platform().create_channel(&spec).await?;

        let now = self.ctx.now();
        let mut ticket = Ticket::new(
            channel_id,
            request.guild_id,
            request.user_id,
            request.ticket_type,
            now,
        )
        .with_details(request.reason, request.description);
        if settings.auto_close_enabled {
            ticket = ticket.with_next_check(now + self.ctx.poll_interval());
        }

        // A lost duplicate race surfaces here through the store's uniqueness rule
        if let Err(e) = self.ctx.ticket_repo().create(&ticket).await {
            self.discard_channel(channel_id, "Ticket record could not be saved")
                .await;
            return Err(e.into());
        }

        if let Err(e) = self
            .ctx
            .platform()
            .send_message(channel_id, &notices::welcome(&ticket, &settings))
            .await
        {
            warn!(ticket_id = %channel_id, error = %e, "Welcome notice failed; rolling back ticket");
            if let Err(del) = self.ctx.ticket_repo().delete(channel_id).await {
                warn!(ticket_id = %channel_id, error = %del, "Failed to remove ticket record");
            }
            self.discard_channel(channel_id, "Ticket welcome could not be delivered")
                .await;
            return Err(match e {
                DomainError::Delivery(_) => e,
                other => DomainError::Delivery(other.to_string()),
            }
            .into());
        }

        self.interactions.register_controls(channel_id);
        if let Some(first_check) = ticket.next_check_at {
            self.spawn_watcher(channel_id, first_check);
        }

        info!(
            ticket_id = %channel_id,
            ticket_type = %ticket.ticket_type,
            "Ticket created"
        );
        Ok(ticket)
    }

    /// Assign a staff member; first claimer wins
    #[instrument(skip(self))]
    pub async fn claim(&self, ticket_id: Snowflake, staff_id: Snowflake) -> ServiceResult<ClaimOutcome> {
        loop {
            let ticket = self.get_ticket(ticket_id).await?;

            if let ClaimCheck::AlreadyClaimed(existing) = ticket.check_claim(staff_id)? {
                debug!(claimed_by = %existing, "Ticket already claimed");
                return Ok(ClaimOutcome::AlreadyClaimed(ticket));
            }

            let result = self
                .ctx
                .ticket_repo()
                .compare_and_update(ticket_id, ticket.status, TicketMutation::Claim { staff_id })
                .await;

            match result {
                Ok(claimed) => {
                    self.announce_claim(&claimed, staff_id).await;
                    info!(staff_id = %staff_id, "Ticket claimed");
                    return Ok(ClaimOutcome::Claimed(claimed));
                }
                Err(DomainError::Conflict { expected, actual }) => {
                    debug!(%expected, %actual, "Claim lost a race; re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn announce_claim(&self, ticket: &Ticket, staff_id: Snowflake) {
        if let Err(e) = self
            .ctx
            .platform()
            .grant_member(ticket.id, staff_id, Permissions::TICKET_STAFF)
            .await
        {
            warn!(ticket_id = %ticket.id, error = %e, "Failed to grant claimer channel access");
        }
        if let Err(e) = self
            .ctx
            .platform()
            .send_message(ticket.id, &notices::claimed(staff_id))
            .await
        {
            warn!(ticket_id = %ticket.id, error = %e, "Failed to post claim notice");
        }
    }

    /// Close a ticket
    ///
    /// Already-terminal tickets are rejected with `InvalidTransition`. Losing
    /// a close race after the first read returns `AlreadyClosed` without
    /// running any side effect.
    #[instrument(skip(self))]
    pub async fn close(
        &self,
        ticket_id: Snowflake,
        closed_by: Snowflake,
        auto: bool,
    ) -> ServiceResult<CloseOutcome> {
        let mut first_read = true;

        loop {
            let ticket = self.get_ticket(ticket_id).await?;

            if ticket.is_terminal() {
                if first_read {
                    ticket.check_close()?;
                }
                info!(status = %ticket.status, "Ticket closed concurrently");
                return Ok(CloseOutcome::AlreadyClosed(ticket));
            }

            let mutation = TicketMutation::Close {
                auto,
                closed_by,
                closed_at: self.ctx.now(),
            };
            match self
                .ctx
                .ticket_repo()
                .compare_and_update(ticket_id, ticket.status, mutation)
                .await
            {
                Ok(closed) => {
                    info!(status = %closed.status, closed_by = %closed_by, "Ticket closed");
                    self.after_close(&closed, auto).await;
                    return Ok(CloseOutcome::Closed(closed));
                }
                Err(DomainError::Conflict { expected, actual }) => {
                    debug!(%expected, %actual, "Close lost a race; re-reading");
                    first_read = false;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Side effects owned by the close winner
    async fn after_close(&self, ticket: &Ticket, auto: bool) {
        let delete_delay = self.ctx.timings().delete_delay;

        self.watchers.cancel(ticket.id);
        self.interactions.remove_controls(ticket.id);
        self.schedule_channel_deletion(ticket, delete_delay);

        if let Err(e) = self
            .ctx
            .platform()
            .send_message(ticket.id, &notices::closing(auto, delete_delay))
            .await
        {
            warn!(ticket_id = %ticket.id, error = %e, "Failed to post closing notice");
        }

        match self.ctx.settings_repo().find(ticket.guild_id).await {
            Ok(Some(settings)) => {
                if let Err(e) = TranscriptArchiver::new(&self.ctx)
                    .archive(ticket, &settings)
                    .await
                {
                    warn!(ticket_id = %ticket.id, error = %e, "Transcript archival failed");
                }
            }
            Ok(None) => debug!(ticket_id = %ticket.id, "Guild settings missing; no transcript"),
            Err(e) => warn!(ticket_id = %ticket.id, error = %e, "Failed to load settings for archival"),
        }

        let ctx = self.ctx.clone();
        let interactions = Arc::clone(&self.interactions);
        let closed = ticket.clone();
        tokio::spawn(async move {
            if let Err(e) = FeedbackCollector::new(&ctx, &interactions).offer(&closed).await {
                info!(ticket_id = %closed.id, error = %e, "Feedback request not delivered");
            }
        });
    }

    /// Record the owner's rating for a closed ticket
    pub async fn submit_feedback(
        &self,
        ticket_id: Snowflake,
        user_id: Snowflake,
        rating: Rating,
        comment: Option<String>,
    ) -> ServiceResult<Ticket> {
        FeedbackCollector::new(&self.ctx, &self.interactions)
            .submit(ticket_id, user_id, rating, comment)
            .await
    }

    /// Rebuild watchers and claim/close routing for every active ticket
    ///
    /// Also reschedules deletion of closed channels the previous run never
    /// got to. Returns the number of watchers started.
    #[instrument(skip(self))]
    pub async fn restore(self: &Arc<Self>) -> ServiceResult<usize> {
        let now = self.ctx.now();

        let pending = self.ctx.ticket_repo().find_awaiting_channel_deletion().await?;
        for ticket in &pending {
            let due = ticket.closed_at.unwrap_or(now) + self.ctx.delete_delay();
            self.schedule_channel_deletion(ticket, (due - now).to_std().unwrap_or_default());
        }
        if !pending.is_empty() {
            info!(pending = pending.len(), "Rescheduled ticket channel deletions");
        }

        let active = self.ctx.ticket_repo().find_active().await?;
        let mut auto_close: HashMap<Snowflake, bool> = HashMap::new();
        let mut watched = 0;

        for ticket in &active {
            self.interactions.register_controls(ticket.id);

            let enabled = match auto_close.get(&ticket.guild_id) {
                Some(enabled) => *enabled,
                None => {
                    let enabled = self
                        .ctx
                        .settings_repo()
                        .find(ticket.guild_id)
                        .await?
                        .is_some_and(|s| s.auto_close_enabled);
                    auto_close.insert(ticket.guild_id, enabled);
                    enabled
                }
            };

            if enabled {
                self.spawn_watcher(ticket.id, ticket.next_check_at.unwrap_or(now));
                watched += 1;
            }
        }

        info!(active = active.len(), watched, "Restored active tickets");
        Ok(watched)
    }

    /// Stop every watcher
    pub fn shutdown(&self) {
        self.watchers.cancel_all();
        info!("Lifecycle controller stopped");
    }

    fn spawn_watcher(self: &Arc<Self>, ticket_id: Snowflake, first_check: DateTime<Utc>) {
        let generation = self.watchers.next_generation();
        let token = CancellationToken::new();

        let controller = Arc::clone(self);
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            watcher::run(Arc::clone(&controller), ticket_id, first_check, task_token).await;
            controller.watchers.finish(ticket_id, generation);
        });

        self.watchers.insert(ticket_id, generation, token, handle);
        debug!(ticket_id = %ticket_id, first_check = %first_check, "Watcher started");
    }

    /// Delete a closed ticket's channel after `delay` and record it
    fn schedule_channel_deletion(&self, ticket: &Ticket, delay: std::time::Duration) {
        let ctx = self.ctx.clone();
        let channel_id = ticket.id;
        let status = ticket.status;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = ctx.platform().delete_channel(channel_id, "Ticket closed").await {
                warn!(ticket_id = %channel_id, error = %e, "Failed to delete ticket channel");
                return;
            }
            info!(ticket_id = %channel_id, "Ticket channel deleted");

            let recorded = ctx
                .ticket_repo()
                .compare_and_update(
                    channel_id,
                    status,
                    TicketMutation::ChannelDeleted {
                        deleted_at: ctx.now(),
                    },
                )
                .await;
            if let Err(e) = recorded {
                warn!(ticket_id = %channel_id, error = %e, "Failed to record channel deletion");
            }
        });
    }

    async fn discard_channel(&self, channel_id: Snowflake, reason: &str) {
        if let Err(e) = self.ctx.platform().delete_channel(channel_id, reason).await {
            warn!(channel_id = %channel_id, error = %e, "Failed to delete orphaned channel");
        }
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("watchers", &self.watchers.active_count())
            .field("interactions", &self.interactions.len())
            .finish()
    }
}

