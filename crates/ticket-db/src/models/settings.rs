//! Ticket settings database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for ticket_settings table
#[derive(Debug, Clone, FromRow)]
pub struct TicketSettingsModel {
    pub guild_id: i64,
    pub category_id: i64,
    pub transcript_channel_id: Option<i64>,
    pub staff_role_id: Option<i64>,
    pub auto_close_enabled: bool,
    pub auto_close_hours: i32,
    pub welcome_message: String,
    pub updated_at: DateTime<Utc>,
}
