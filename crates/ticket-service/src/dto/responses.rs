//! Response DTOs for API endpoints
//!
//! All response DTOs implement `Serialize` for JSON output.
//! Snowflake IDs are serialized as strings for JavaScript compatibility.

use chrono::{DateTime, Utc};
use serde::Serialize;

// ============================================================================
// Common Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

// ============================================================================
// Ticket Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackResponse {
    pub rating: i16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// Ticket record
#[derive(Debug, Clone, Serialize)]
pub struct TicketResponse {
    pub id: String,
    pub guild_id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub ticket_type: String,
    pub status: String,
    pub priority: String,
    pub claimed_by: Option<String>,
    pub reason: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<String>,
    pub feedback: Option<FeedbackResponse>,
    pub next_check_at: Option<DateTime<Utc>>,
    pub warned_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Setup Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SettingsResponse {
    pub guild_id: String,
    pub category_id: String,
    pub transcript_channel_id: Option<String>,
    pub staff_role_id: Option<String>,
    pub auto_close_enabled: bool,
    pub auto_close_hours: i32,
    pub welcome_message: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelOption {
    pub label: String,
    pub value: String,
}

/// Ticket type selection panel posted after setup
#[derive(Debug, Clone, Serialize)]
pub struct PanelResponse {
    pub title: String,
    pub description: String,
    pub custom_id: String,
    pub placeholder: String,
    pub options: Vec<PanelOption>,
}

// ============================================================================
// Interaction Responses
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModalField {
    pub custom_id: String,
    pub label: String,
    /// `short` or `paragraph`
    pub style: String,
    pub max_length: u16,
    pub required: bool,
}

/// Reply to a forwarded interaction
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionReply {
    Message {
        content: String,
        ephemeral: bool,
    },
    Modal {
        custom_id: String,
        title: String,
        fields: Vec<ModalField>,
    },
    Setup {
        content: String,
        settings: SettingsResponse,
        panel: PanelResponse,
    },
}

impl InteractionReply {
    /// Reply only the acting user sees
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self::Message {
            content: content.into(),
            ephemeral: true,
        }
    }

    /// Message text, if this is a message reply
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Message { content, .. } | Self::Setup { content, .. } => Some(content),
            Self::Modal { .. } => None,
        }
    }
}

// ============================================================================
// Health Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_watchers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}
