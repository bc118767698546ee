//! Post-close feedback collection
//!
//! The owner gets a direct message with three rating buttons. Delivery is
//! best-effort. A rating is accepted once, from the owner, within the
//! feedback window.

use tracing::{info, instrument};

use ticket_core::{DomainError, Feedback, Rating, Snowflake, Ticket, TicketMutation};

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::interactions::{InteractionKind, InteractionRegistry, Registration};
use super::notices;

pub struct FeedbackCollector<'a> {
    ctx: &'a ServiceContext,
    interactions: &'a InteractionRegistry,
}

impl<'a> FeedbackCollector<'a> {
    pub fn new(ctx: &'a ServiceContext, interactions: &'a InteractionRegistry) -> Self {
        Self { ctx, interactions }
    }

    /// DM the owner a rating request and open the feedback key
    #[instrument(skip(self, ticket), fields(ticket_id = %ticket.id))]
    pub async fn offer(&self, ticket: &Ticket) -> ServiceResult<()> {
        let now = self.ctx.now();
        let request = notices::feedback_request(ticket, ticket.duration(now));

        self.ctx
            .platform()
            .send_direct(ticket.user_id, &request)
            .await?;

        self.interactions.register(
            InteractionKind::Feedback,
            ticket.id,
            Registration::for_user(ticket.user_id, now + self.ctx.feedback_window()),
        );
        info!(user_id = %ticket.user_id, "Feedback requested");
        Ok(())
    }

    /// Record a rating
    ///
    /// The registry key is checked first. When it is gone (for example after
    /// a restart) the record decides: the ticket must be closed, the user
    /// must be its owner and the window must still be open.
    #[instrument(skip(self, comment))]
    pub async fn submit(
        &self,
        ticket_id: Snowflake,
        user_id: Snowflake,
        rating: Rating,
        comment: Option<String>,
    ) -> ServiceResult<Ticket> {
        let now = self.ctx.now();

        match self
            .interactions
            .resolve(InteractionKind::Feedback, ticket_id, user_id, now)
        {
            Ok(_) | Err(DomainError::UnknownInteraction(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let ticket = self
            .ctx
            .ticket_repo()
            .find_by_id(ticket_id)
            .await?
            .ok_or(DomainError::TicketNotFound(ticket_id))?;

        if !ticket.is_terminal() {
            return Err(DomainError::InvalidTransition {
                status: ticket.status,
                action: "rate",
            }
            .into());
        }
        if ticket.user_id != user_id {
            return Err(DomainError::MissingPermission("ticket owner".to_string()).into());
        }
        if ticket.feedback.is_some() {
            return Err(DomainError::FeedbackClosed.into());
        }
        let closed_at = ticket.closed_at.unwrap_or(ticket.created_at);
        if now >= closed_at + self.ctx.feedback_window() {
            self.interactions.remove(InteractionKind::Feedback, ticket_id);
            return Err(DomainError::InteractionExpired.into());
        }

        let feedback = Feedback {
            rating,
            comment: comment.filter(|c| !c.trim().is_empty()),
            submitted_at: now,
        };
        let rated = self
            .ctx
            .ticket_repo()
            .compare_and_update(ticket_id, ticket.status, TicketMutation::Feedback(feedback))
            .await
            .map_err(|e| match e {
                DomainError::Conflict { .. } => DomainError::FeedbackClosed,
                other => other,
            })?;

        self.interactions.remove(InteractionKind::Feedback, ticket_id);
        info!(rating = rating.value(), "Feedback recorded");
        Ok(rated)
    }
}
