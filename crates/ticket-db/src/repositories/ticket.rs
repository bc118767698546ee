//! PostgreSQL implementation of TicketRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use ticket_core::{
    DomainError, RepoResult, Snowflake, Ticket, TicketMutation, TicketRepository, TicketStatus,
};

use crate::mappers::TicketInsert;
use crate::models::TicketModel;

use super::error::{is_active_ticket_violation, map_db_error};

/// PostgreSQL implementation of TicketRepository
#[derive(Clone)]
pub struct PgTicketRepository {
    pool: PgPool,
}

impl PgTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Explain a compare-and-update that matched no row
    async fn conflict_for(&self, id: Snowflake, expected: TicketStatus) -> DomainError {
        match self.find_by_id(id).await {
            Ok(Some(current)) => DomainError::conflict(expected, &current),
            Ok(None) => DomainError::TicketNotFound(id),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl TicketRepository for PgTicketRepository {
    #[instrument(skip(self, ticket), fields(ticket_id = %ticket.id, user_id = %ticket.user_id))]
    async fn create(&self, ticket: &Ticket) -> RepoResult<()> {
        let insert = TicketInsert::new(ticket);

        let result = sqlx::query(
            r#"
            INSERT INTO tickets (id, guild_id, user_id, ticket_type, status, priority,
                                 reason, description, created_at, next_check_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(insert.id)
        .bind(insert.guild_id)
        .bind(insert.user_id)
        .bind(insert.ticket_type)
        .bind(insert.status)
        .bind(insert.priority)
        .bind(insert.reason)
        .bind(insert.description)
        .bind(insert.created_at)
        .bind(insert.next_check_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_active_ticket_violation(&e) => {
                // Lost the race: report the ticket that won
                let existing = self
                    .find_open_by_user(ticket.guild_id, ticket.user_id)
                    .await?
                    .map_or(ticket.id, |t| t.id);
                Err(DomainError::DuplicateTicket { existing })
            }
            Err(e) => Err(map_db_error(e)),
        }
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Ticket>> {
        let result = sqlx::query_as::<_, TicketModel>(
            r#"
            SELECT id, guild_id, user_id, ticket_type, status, priority, claimed_by,
                   reason, description, created_at, closed_at, closed_by,
                   feedback_rating, feedback_comment, feedback_submitted_at,
                   next_check_at, warned_at, channel_deleted_at
            FROM tickets
            WHERE id = $1
            "#,
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Ticket::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_open_by_user(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<Ticket>> {
        let result = sqlx::query_as::<_, TicketModel>(
            r#"
            SELECT id, guild_id, user_id, ticket_type, status, priority, claimed_by,
                   reason, description, created_at, closed_at, closed_by,
                   feedback_rating, feedback_comment, feedback_submitted_at,
                   next_check_at, warned_at, channel_deleted_at
            FROM tickets
            WHERE guild_id = $1 AND user_id = $2 AND status IN ('open', 'claimed')
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Ticket::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_active(&self) -> RepoResult<Vec<Ticket>> {
        let results = sqlx::query_as::<_, TicketModel>(
            r#"
            SELECT id, guild_id, user_id, ticket_type, status, priority, claimed_by,
                   reason, description, created_at, closed_at, closed_by,
                   feedback_rating, feedback_comment, feedback_submitted_at,
                   next_check_at, warned_at, channel_deleted_at
            FROM tickets
            WHERE status IN ('open', 'claimed')
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results.into_iter().map(Ticket::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn find_awaiting_channel_deletion(&self) -> RepoResult<Vec<Ticket>> {
        let results = sqlx::query_as::<_, TicketModel>(
            r#"
            SELECT id, guild_id, user_id, ticket_type, status, priority, claimed_by,
                   reason, description, created_at, closed_at, closed_by,
                   feedback_rating, feedback_comment, feedback_submitted_at,
                   next_check_at, warned_at, channel_deleted_at
            FROM tickets
            WHERE status IN ('closed', 'auto_closed') AND channel_deleted_at IS NULL
            ORDER BY closed_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results.into_iter().map(Ticket::try_from).collect()
    }

    #[instrument(skip(self, mutation), fields(mutation = mutation.name()))]
    async fn compare_and_update(
        &self,
        id: Snowflake,
        expected: TicketStatus,
        mutation: TicketMutation,
    ) -> RepoResult<Ticket> {
        let query = match &mutation {
            TicketMutation::Claim { staff_id } => sqlx::query_as::<_, TicketModel>(
                r#"
                UPDATE tickets
                SET status = 'claimed', claimed_by = $3
                WHERE id = $1 AND status = $2 AND claimed_by IS NULL
                RETURNING *
                "#,
            )
            .bind(id.into_inner())
            .bind(expected.as_str())
            .bind(staff_id.into_inner()),

            TicketMutation::Close {
                auto,
                closed_by,
                closed_at,
            } => {
                let status = if *auto {
                    TicketStatus::AutoClosed
                } else {
                    TicketStatus::Closed
                };
                sqlx::query_as::<_, TicketModel>(
                    r#"
                    UPDATE tickets
                    SET status = $3, closed_by = $4, closed_at = $5, next_check_at = NULL
                    WHERE id = $1 AND status = $2
                    RETURNING *
                    "#,
                )
                .bind(id.into_inner())
                .bind(expected.as_str())
                .bind(status.as_str())
                .bind(closed_by.into_inner())
                .bind(*closed_at)
            }

            TicketMutation::Watch {
                next_check_at,
                warned_at,
            } => sqlx::query_as::<_, TicketModel>(
                r#"
                UPDATE tickets
                SET next_check_at = $3, warned_at = $4
                WHERE id = $1 AND status = $2
                RETURNING *
                "#,
            )
            .bind(id.into_inner())
            .bind(expected.as_str())
            .bind(*next_check_at)
            .bind(*warned_at),

            TicketMutation::Feedback(feedback) => sqlx::query_as::<_, TicketModel>(
                r#"
                UPDATE tickets
                SET feedback_rating = $3, feedback_comment = $4, feedback_submitted_at = $5
                WHERE id = $1 AND status = $2 AND feedback_rating IS NULL
                RETURNING *
                "#,
            )
            .bind(id.into_inner())
            .bind(expected.as_str())
            .bind(feedback.rating.value())
            .bind(feedback.comment.clone())
            .bind(feedback.submitted_at),

            TicketMutation::ChannelDeleted { deleted_at } => sqlx::query_as::<_, TicketModel>(
                r#"
                UPDATE tickets
                SET channel_deleted_at = $3
                WHERE id = $1 AND status = $2
                  AND status IN ('closed', 'auto_closed') AND channel_deleted_at IS NULL
                RETURNING *
                "#,
            )
            .bind(id.into_inner())
            .bind(expected.as_str())
            .bind(*deleted_at),
        };

        let updated = query
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        match updated {
            Some(model) => Ticket::try_from(model),
            None => {
                debug!(ticket_id = %id, %expected, "Compare-and-update matched no row");
                Err(self.conflict_for(id, expected).await)
            }
        }
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Snowflake) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id.into_inner())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::TicketNotFound(id));
        }

        Ok(())
    }
}
