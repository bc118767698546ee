//! Request DTOs for forwarded platform interactions
//!
//! All request DTOs implement `Deserialize` and `Validate` for input validation.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::{Validate, ValidationErrors};

use ticket_core::{Permissions, Snowflake};

// ============================================================================
// Setup
// ============================================================================

/// Options of the `ticket-setup` command
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TicketSetupRequest {
    /// Category new ticket channels are created under
    pub category: Snowflake,

    /// Channel receiving transcripts
    pub transcript: Option<Snowflake>,

    pub staff_role: Option<Snowflake>,

    pub auto_close_enabled: Option<bool>,

    #[validate(range(min = 1, max = 720, message = "Auto-close hours must be 1-720"))]
    pub auto_close_hours: Option<i32>,

    #[validate(length(min = 1, max = 2000, message = "Welcome message must be 1-2000 characters"))]
    pub welcome_message: Option<String>,
}

// ============================================================================
// Ticket creation
// ============================================================================

/// Fields of the report/application details form
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TicketDetailsRequest {
    #[validate(length(min = 1, max = 100, message = "Reason must be 1-100 characters"))]
    pub reason: String,

    #[validate(length(min = 1, max = 1000, message = "Description must be 1-1000 characters"))]
    pub description: String,
}

/// Optional comment sent with a rating
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct FeedbackRequest {
    #[validate(length(max = 500, message = "Comment must be at most 500 characters"))]
    pub comment: Option<String>,
}

// ============================================================================
// Interactions
// ============================================================================

/// Slash command invocation
#[derive(Debug, Clone, Deserialize)]
pub struct CommandInteraction {
    pub name: String,
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    #[serde(default)]
    pub member_permissions: Permissions,
    pub options: TicketSetupRequest,
}

/// Select menu choice
#[derive(Debug, Clone, Deserialize)]
pub struct SelectInteraction {
    pub custom_id: String,
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    pub username: String,
    #[serde(default)]
    pub values: Vec<String>,
    pub issued_at: Option<DateTime<Utc>>,
}

/// Submitted details form
#[derive(Debug, Clone, Deserialize)]
pub struct ModalSubmitInteraction {
    pub custom_id: String,
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    pub username: String,
    pub reason: String,
    pub description: String,
    pub issued_at: Option<DateTime<Utc>>,
}

impl ModalSubmitInteraction {
    pub fn details(&self) -> TicketDetailsRequest {
        TicketDetailsRequest {
            reason: self.reason.trim().to_string(),
            description: self.description.trim().to_string(),
        }
    }
}

/// Button click
#[derive(Debug, Clone, Deserialize)]
pub struct ButtonInteraction {
    pub custom_id: String,
    pub user_id: Snowflake,
    pub issued_at: Option<DateTime<Utc>>,
    pub comment: Option<String>,
}

impl ButtonInteraction {
    pub fn feedback(&self) -> FeedbackRequest {
        FeedbackRequest {
            comment: self.comment.clone(),
        }
    }
}

/// An interaction forwarded from the chat platform
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Interaction {
    Command(CommandInteraction),
    Select(SelectInteraction),
    ModalSubmit(ModalSubmitInteraction),
    Button(ButtonInteraction),
}

impl Interaction {
    /// When the platform issued the interaction, if forwarded
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Command(_) => None,
            Self::Select(i) => i.issued_at,
            Self::ModalSubmit(i) => i.issued_at,
            Self::Button(i) => i.issued_at,
        }
    }

    pub fn user_id(&self) -> Snowflake {
        match self {
            Self::Command(i) => i.user_id,
            Self::Select(i) => i.user_id,
            Self::ModalSubmit(i) => i.user_id,
            Self::Button(i) => i.user_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Command(_) => "command",
            Self::Select(_) => "select",
            Self::ModalSubmit(_) => "modal_submit",
            Self::Button(_) => "button",
        }
    }
}

impl Validate for Interaction {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            Self::Command(i) => i.options.validate(),
            Self::ModalSubmit(i) => i.details().validate(),
            Self::Button(i) => i.feedback().validate(),
            Self::Select(_) => Ok(()),
        }
    }
}
