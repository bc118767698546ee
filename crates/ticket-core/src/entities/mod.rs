//! Domain entities - core business objects

mod channel;
mod message;
mod settings;
mod ticket;

pub use channel::{ticket_channel_name, ChannelSpec, OverwriteKind, PermissionOverwrite};
pub use message::{Attachment, Button, ButtonStyle, ChannelMessage, MessageField, OutgoingMessage};
pub use settings::{TicketSettings, DEFAULT_WELCOME_MESSAGE};
pub use ticket::{
    ClaimCheck, Feedback, Rating, Ticket, TicketMutation, TicketPriority, TicketStatus, TicketType,
};
