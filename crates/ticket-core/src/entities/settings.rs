//! Per-guild ticket configuration

use chrono::{DateTime, Duration, Utc};

use crate::value_objects::Snowflake;

pub const DEFAULT_WELCOME_MESSAGE: &str =
    "Support will be with you shortly. Please describe your issue.";

/// Ticket settings for one guild, written by the setup command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketSettings {
    pub guild_id: Snowflake,
    /// Category new ticket channels are created under
    pub category_id: Snowflake,
    /// Where transcripts are posted; archival is skipped when unset
    pub transcript_channel_id: Option<Snowflake>,
    pub staff_role_id: Option<Snowflake>,
    pub auto_close_enabled: bool,
    pub auto_close_hours: i32,
    pub welcome_message: String,
    pub updated_at: DateTime<Utc>,
}

impl TicketSettings {
    pub fn new(guild_id: Snowflake, category_id: Snowflake, auto_close_hours: i32) -> Self {
        Self {
            guild_id,
            category_id,
            transcript_channel_id: None,
            staff_role_id: None,
            auto_close_enabled: true,
            auto_close_hours,
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            updated_at: Utc::now(),
        }
    }

    pub fn with_transcript_channel(mut self, channel_id: Snowflake) -> Self {
        self.transcript_channel_id = Some(channel_id);
        self
    }

    pub fn with_staff_role(mut self, role_id: Snowflake) -> Self {
        self.staff_role_id = Some(role_id);
        self
    }

    pub fn with_auto_close(mut self, enabled: bool) -> Self {
        self.auto_close_enabled = enabled;
        self
    }

    /// Inactivity span after which a warning is issued
    pub fn inactivity_threshold(&self) -> Duration {
        Duration::hours(i64::from(self.auto_close_hours.max(1)))
    }
}
