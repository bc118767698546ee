//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::entities::{Ticket, TicketStatus};
use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Ticket not found: {0}")]
    TicketNotFound(Snowflake),

    #[error("Ticket system is not configured for guild {0}")]
    SettingsNotFound(Snowflake),

    #[error("Unknown interaction: {0}")]
    UnknownInteraction(String),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    #[error("Missing permission: {0}")]
    MissingPermission(String),

    #[error("Ticket owners cannot claim their own ticket")]
    SelfClaim,

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("User already has an active ticket: {existing}")]
    DuplicateTicket { existing: Snowflake },

    #[error("Status changed concurrently: expected {expected}, found {actual}")]
    Conflict {
        expected: TicketStatus,
        actual: TicketStatus,
    },

    // =========================================================================
    // Business Rule Violations
    // =========================================================================
    #[error("Cannot {action} a ticket that is {status}")]
    InvalidTransition {
        status: TicketStatus,
        action: &'static str,
    },

    #[error("Feedback already recorded or window closed")]
    FeedbackClosed,

    #[error("Interaction has expired")]
    InteractionExpired,

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Conflict error for a compare-and-update that found `current`
    pub fn conflict(expected: TicketStatus, current: &Ticket) -> Self {
        Self::Conflict {
            expected,
            actual: current.status,
        }
    }

    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::TicketNotFound(_) => "UNKNOWN_TICKET",
            Self::SettingsNotFound(_) => "TICKETS_NOT_CONFIGURED",
            Self::UnknownInteraction(_) => "UNKNOWN_INTERACTION",

            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",

            // Authorization
            Self::MissingPermission(_) => "MISSING_PERMISSIONS",
            Self::SelfClaim => "SELF_CLAIM",

            // Conflict
            Self::DuplicateTicket { .. } => "DUPLICATE_TICKET",
            Self::Conflict { .. } => "STATUS_CONFLICT",

            // Business Rules
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::FeedbackClosed => "FEEDBACK_CLOSED",
            Self::InteractionExpired => "INTERACTION_EXPIRED",

            // Infrastructure
            Self::Delivery(_) => "DELIVERY_FAILED",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TicketNotFound(_) | Self::SettingsNotFound(_) | Self::UnknownInteraction(_)
        )
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_))
    }

    /// Check if this is an authorization error
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::MissingPermission(_) | Self::SelfClaim)
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::DuplicateTicket { .. } | Self::Conflict { .. })
    }

    /// Errors that are answered to the user rather than treated as failures
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::SettingsNotFound(_)
                | Self::ValidationError(_)
                | Self::MissingPermission(_)
                | Self::SelfClaim
                | Self::DuplicateTicket { .. }
                | Self::InvalidTransition { .. }
                | Self::FeedbackClosed
                | Self::InteractionExpired
        )
    }

    /// Text shown to the user who triggered the failing action
    pub fn user_message(&self) -> String {
        match self {
            Self::DuplicateTicket { existing } => {
                format!("❌ You already have an open ticket: {}", existing.mention_channel())
            }
            Self::SettingsNotFound(_) => {
                "❌ Ticket system is not set up! Please contact an administrator.".to_string()
            }
            Self::SelfClaim => "❌ You cannot claim your own ticket!".to_string(),
            Self::InvalidTransition { status, action } => {
                format!("❌ Cannot {action} this ticket, it is already {}.", status.label())
            }
            Self::MissingPermission(permission) => {
                format!("❌ You need the {permission} permission to do that.")
            }
            Self::InteractionExpired => "❌ This interaction has expired.".to_string(),
            Self::FeedbackClosed => "❌ Feedback already recorded or window closed.".to_string(),
            Self::ValidationError(msg) => format!("❌ {msg}"),
            _ => "❌ Something went wrong. Please try again later.".to_string(),
        }
    }
}
