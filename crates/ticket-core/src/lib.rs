//! # ticket-core
//!
//! Domain layer for the support-ticket lifecycle: entities, value objects,
//! the storage and chat-platform ports, and the domain error taxonomy.
//! This crate has zero dependencies on infrastructure (database, web framework, HTTP client).

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    ticket_channel_name, Attachment, Button, ButtonStyle, ChannelMessage, ChannelSpec,
    ClaimCheck, Feedback, MessageField, OutgoingMessage, OverwriteKind, PermissionOverwrite,
    Rating, Ticket, TicketMutation, TicketPriority, TicketSettings, TicketStatus, TicketType,
    DEFAULT_WELCOME_MESSAGE,
};
pub use error::DomainError;
pub use traits::{
    ChatPlatform, Clock, PlatformResult, RepoResult, SettingsRepository, SystemClock,
    TicketRepository, ACTIVITY_SCAN,
};
pub use value_objects::{Permissions, Snowflake, SnowflakeParseError};
