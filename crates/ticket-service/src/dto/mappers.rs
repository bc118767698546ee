//! Entity to DTO mappers
//!
//! Implements `From` conversions from domain entities to response DTOs.

use ticket_core::{Feedback, Ticket, TicketSettings, TicketType};

use super::responses::{
    FeedbackResponse, ModalField, PanelOption, PanelResponse, SettingsResponse, TicketResponse,
};

// ============================================================================
// Ticket Mappers
// ============================================================================

impl From<&Feedback> for FeedbackResponse {
    fn from(feedback: &Feedback) -> Self {
        Self {
            rating: feedback.rating.value(),
            comment: feedback.comment.clone(),
            submitted_at: feedback.submitted_at,
        }
    }
}

impl From<&Ticket> for TicketResponse {
    fn from(ticket: &Ticket) -> Self {
        Self {
            id: ticket.id.to_string(),
            guild_id: ticket.guild_id.to_string(),
            user_id: ticket.user_id.to_string(),
            ticket_type: ticket.ticket_type.as_str().to_string(),
            status: ticket.status.as_str().to_string(),
            priority: ticket.priority.as_str().to_string(),
            claimed_by: ticket.claimed_by.map(|id| id.to_string()),
            reason: ticket.reason.clone(),
            description: ticket.description.clone(),
            created_at: ticket.created_at,
            closed_at: ticket.closed_at,
            closed_by: ticket.closed_by.map(|id| id.to_string()),
            feedback: ticket.feedback.as_ref().map(FeedbackResponse::from),
            next_check_at: ticket.next_check_at,
            warned_at: ticket.warned_at,
        }
    }
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        Self::from(&ticket)
    }
}

// ============================================================================
// Setup Mappers
// ============================================================================

impl From<&TicketSettings> for SettingsResponse {
    fn from(settings: &TicketSettings) -> Self {
        Self {
            guild_id: settings.guild_id.to_string(),
            category_id: settings.category_id.to_string(),
            transcript_channel_id: settings.transcript_channel_id.map(|id| id.to_string()),
            staff_role_id: settings.staff_role_id.map(|id| id.to_string()),
            auto_close_enabled: settings.auto_close_enabled,
            auto_close_hours: settings.auto_close_hours,
            welcome_message: settings.welcome_message.clone(),
            updated_at: settings.updated_at,
        }
    }
}

impl From<TicketType> for PanelOption {
    fn from(ticket_type: TicketType) -> Self {
        Self {
            label: ticket_type.label().to_string(),
            value: ticket_type.as_str().to_string(),
        }
    }
}

impl PanelResponse {
    /// Selection panel offering every ticket type
    pub fn ticket_panel(custom_id: impl Into<String>) -> Self {
        Self {
            title: "Support Tickets".to_string(),
            description: "Need help? Select a category below to open a private ticket."
                .to_string(),
            custom_id: custom_id.into(),
            placeholder: "Select ticket type".to_string(),
            options: TicketType::ALL.into_iter().map(PanelOption::from).collect(),
        }
    }
}

impl ModalField {
    /// Reason and description fields for a report/application form
    pub fn details_form(ticket_type: TicketType) -> Vec<Self> {
        vec![
            Self {
                custom_id: "reason".to_string(),
                label: ticket_type.reason_label().to_string(),
                style: "short".to_string(),
                max_length: 100,
                required: true,
            },
            Self {
                custom_id: "description".to_string(),
                label: "Description".to_string(),
                style: "paragraph".to_string(),
                max_length: 1000,
                required: true,
            },
        ]
    }
}
