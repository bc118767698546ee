//! TicketSettings entity <-> model mapper

use ticket_core::{Snowflake, TicketSettings};

use crate::models::TicketSettingsModel;

impl From<TicketSettingsModel> for TicketSettings {
    fn from(model: TicketSettingsModel) -> Self {
        TicketSettings {
            guild_id: Snowflake::new(model.guild_id),
            category_id: Snowflake::new(model.category_id),
            transcript_channel_id: model.transcript_channel_id.map(Snowflake::new),
            staff_role_id: model.staff_role_id.map(Snowflake::new),
            auto_close_enabled: model.auto_close_enabled,
            auto_close_hours: model.auto_close_hours,
            welcome_message: model.welcome_message,
            updated_at: model.updated_at,
        }
    }
}
