//! Chat platform and clock ports
//!
//! The lifecycle never talks to the platform API directly; everything goes
//! through `ChatPlatform` so tests can substitute a recording fake.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{ChannelMessage, ChannelSpec, OutgoingMessage};
use crate::error::DomainError;
use crate::value_objects::{Permissions, Snowflake};

/// Result type for platform calls; failures are `DomainError::Delivery`
pub type PlatformResult<T> = Result<T, DomainError>;

/// How many recent messages are scanned for the last human message; one
/// full history page
pub const ACTIVITY_SCAN: u8 = 100;

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Create a text channel and return its id
    async fn create_channel(&self, spec: &ChannelSpec) -> PlatformResult<Snowflake>;

    async fn delete_channel(&self, channel_id: Snowflake, reason: &str) -> PlatformResult<()>;

    /// Add a member overwrite on an existing channel
    async fn grant_member(
        &self,
        channel_id: Snowflake,
        member_id: Snowflake,
        allow: Permissions,
    ) -> PlatformResult<()>;

    /// Post a message and return its id
    async fn send_message(
        &self,
        channel_id: Snowflake,
        message: &OutgoingMessage,
    ) -> PlatformResult<Snowflake>;

    /// Direct-message a user; fails when their DMs are closed
    async fn send_direct(
        &self,
        user_id: Snowflake,
        message: &OutgoingMessage,
    ) -> PlatformResult<Snowflake>;

    /// Up to `limit` most recent messages, newest first
    async fn fetch_recent_messages(
        &self,
        channel_id: Snowflake,
        limit: u8,
    ) -> PlatformResult<Vec<ChannelMessage>>;

    /// Timestamp of the most recent message from a non-bot author
    ///
    /// Only the last [`ACTIVITY_SCAN`] messages are looked at. A channel
    /// whose last page is all bot messages reports `None`, and the watcher
    /// then measures from the ticket's creation.
    async fn last_activity(&self, channel_id: Snowflake) -> PlatformResult<Option<DateTime<Utc>>> {
        let messages = self.fetch_recent_messages(channel_id, ACTIVITY_SCAN).await?;
        Ok(messages
            .iter()
            .filter(|m| !m.author_bot)
            .map(|m| m.created_at)
            .max())
    }
}

/// Wall-clock source, injected so time can be controlled in tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
