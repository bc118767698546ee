//! Ticket entity <-> model mapper

use ticket_core::{DomainError, Feedback, Rating, Snowflake, Ticket};

use crate::models::TicketModel;

/// Convert TicketModel to Ticket entity
impl TryFrom<TicketModel> for Ticket {
    type Error = DomainError;

    fn try_from(model: TicketModel) -> Result<Self, Self::Error> {
        let feedback = match (model.feedback_rating, model.feedback_submitted_at) {
            (Some(value), Some(submitted_at)) => Some(Feedback {
                rating: Rating::from_value(value).ok_or_else(|| {
                    DomainError::InternalError(format!("Invalid stored rating: {value}"))
                })?,
                comment: model.feedback_comment,
                submitted_at,
            }),
            _ => None,
        };

        Ok(Ticket {
            id: Snowflake::new(model.id),
            guild_id: Snowflake::new(model.guild_id),
            user_id: Snowflake::new(model.user_id),
            ticket_type: model.ticket_type.parse()?,
            status: model.status.parse()?,
            priority: model.priority.parse()?,
            claimed_by: model.claimed_by.map(Snowflake::new),
            reason: model.reason,
            description: model.description,
            created_at: model.created_at,
            closed_at: model.closed_at,
            closed_by: model.closed_by.map(Snowflake::new),
            feedback,
            next_check_at: model.next_check_at,
            warned_at: model.warned_at,
            channel_deleted_at: model.channel_deleted_at,
        })
    }
}

/// Ticket values for the INSERT statement
pub struct TicketInsert<'a> {
    pub id: i64,
    pub guild_id: i64,
    pub user_id: i64,
    pub ticket_type: &'static str,
    pub status: &'static str,
    pub priority: &'static str,
    pub reason: Option<&'a str>,
    pub description: Option<&'a str>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub next_check_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl<'a> TicketInsert<'a> {
    pub fn new(ticket: &'a Ticket) -> Self {
        Self {
            id: ticket.id.into_inner(),
            guild_id: ticket.guild_id.into_inner(),
            user_id: ticket.user_id.into_inner(),
            ticket_type: ticket.ticket_type.as_str(),
            status: ticket.status.as_str(),
            priority: ticket.priority.as_str(),
            reason: ticket.reason.as_deref(),
            description: ticket.description.as_deref(),
            created_at: ticket.created_at,
            next_check_at: ticket.next_check_at,
        }
    }
}
