//! PostgreSQL implementation of SettingsRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use ticket_core::{RepoResult, SettingsRepository, Snowflake, TicketSettings};

use crate::models::TicketSettingsModel;

use super::error::map_db_error;

/// PostgreSQL implementation of SettingsRepository
#[derive(Clone)]
pub struct PgSettingsRepository {
    pool: PgPool,
}

impl PgSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    #[instrument(skip(self))]
    async fn find(&self, guild_id: Snowflake) -> RepoResult<Option<TicketSettings>> {
        let result = sqlx::query_as::<_, TicketSettingsModel>(
            r#"
            SELECT guild_id, category_id, transcript_channel_id, staff_role_id,
                   auto_close_enabled, auto_close_hours, welcome_message, updated_at
            FROM ticket_settings
            WHERE guild_id = $1
            "#,
        )
        .bind(guild_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(TicketSettings::from))
    }

    #[instrument(skip(self, settings), fields(guild_id = %settings.guild_id))]
    async fn upsert(&self, settings: &TicketSettings) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ticket_settings (guild_id, category_id, transcript_channel_id, staff_role_id,
                                         auto_close_enabled, auto_close_hours, welcome_message, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (guild_id) DO UPDATE
            SET category_id = EXCLUDED.category_id,
                transcript_channel_id = EXCLUDED.transcript_channel_id,
                staff_role_id = EXCLUDED.staff_role_id,
                auto_close_enabled = EXCLUDED.auto_close_enabled,
                auto_close_hours = EXCLUDED.auto_close_hours,
                welcome_message = EXCLUDED.welcome_message,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(settings.guild_id.into_inner())
        .bind(settings.category_id.into_inner())
        .bind(settings.transcript_channel_id.map(Snowflake::into_inner))
        .bind(settings.staff_role_id.map(Snowflake::into_inner))
        .bind(settings.auto_close_enabled)
        .bind(settings.auto_close_hours)
        .bind(&settings.welcome_message)
        .bind(settings.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }
}
