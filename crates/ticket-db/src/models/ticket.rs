//! Ticket database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for tickets table
#[derive(Debug, Clone, FromRow)]
pub struct TicketModel {
    pub id: i64,
    pub guild_id: i64,
    pub user_id: i64,
    pub ticket_type: String,
    pub status: String,
    pub priority: String,
    pub claimed_by: Option<i64>,
    pub reason: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<i64>,
    pub feedback_rating: Option<i16>,
    pub feedback_comment: Option<String>,
    pub feedback_submitted_at: Option<DateTime<Utc>>,
    pub next_check_at: Option<DateTime<Utc>>,
    pub warned_at: Option<DateTime<Utc>>,
    pub channel_deleted_at: Option<DateTime<Utc>>,
}
