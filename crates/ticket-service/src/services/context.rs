//! Service context - dependency container for services
//!
//! Holds the repositories, the chat platform client, the clock and the
//! lifecycle timings. Cloning is cheap; everything heavy sits behind `Arc`.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use ticket_common::TicketTimings;
use ticket_core::{ChatPlatform, Clock, SettingsRepository, Snowflake, SystemClock, TicketRepository};

use super::error::{ServiceError, ServiceResult};

#[derive(Clone)]
pub struct ServiceContext {
    // Repositories
    ticket_repo: Arc<dyn TicketRepository>,
    settings_repo: Arc<dyn SettingsRepository>,

    // Chat platform
    platform: Arc<dyn ChatPlatform>,
    bot_user_id: Snowflake,

    clock: Arc<dyn Clock>,
    timings: TicketTimings,
}

impl ServiceContext {
    pub fn new(
        ticket_repo: Arc<dyn TicketRepository>,
        settings_repo: Arc<dyn SettingsRepository>,
        platform: Arc<dyn ChatPlatform>,
        bot_user_id: Snowflake,
        clock: Arc<dyn Clock>,
        timings: TicketTimings,
    ) -> Self {
        Self {
            ticket_repo,
            settings_repo,
            platform,
            bot_user_id,
            clock,
            timings,
        }
    }

    pub fn builder() -> ServiceContextBuilder {
        ServiceContextBuilder::new()
    }

    // === Repositories ===

    pub fn ticket_repo(&self) -> &dyn TicketRepository {
        self.ticket_repo.as_ref()
    }

    pub fn settings_repo(&self) -> &dyn SettingsRepository {
        self.settings_repo.as_ref()
    }

    // === Platform ===

    pub fn platform(&self) -> &dyn ChatPlatform {
        self.platform.as_ref()
    }

    /// The bot's own user id; recorded as closer on auto-close
    pub fn bot_user_id(&self) -> Snowflake {
        self.bot_user_id
    }

    // === Time ===

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn timings(&self) -> &TicketTimings {
        &self.timings
    }

    /// Watcher poll interval as a calendar span
    pub fn poll_interval(&self) -> Duration {
        span(self.timings.poll_interval)
    }

    pub fn grace_period(&self) -> Duration {
        span(self.timings.grace_period)
    }

    pub fn feedback_window(&self) -> Duration {
        span(self.timings.feedback_window)
    }

    pub fn interaction_timeout(&self) -> Duration {
        span(self.timings.interaction_timeout)
    }

    pub fn delete_delay(&self) -> Duration {
        span(self.timings.delete_delay)
    }
}

/// Convert a configured std duration; absurdly large values saturate at a year
fn span(d: std::time::Duration) -> Duration {
    Duration::from_std(d).unwrap_or_else(|_| Duration::days(365))
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("repositories", &"...")
            .field("platform", &"...")
            .field("bot_user_id", &self.bot_user_id)
            .field("timings", &self.timings)
            .finish()
    }
}

/// Builder for creating ServiceContext with custom configuration
///
/// The clock defaults to the system clock and timings to their defaults.
#[derive(Default)]
pub struct ServiceContextBuilder {
    ticket_repo: Option<Arc<dyn TicketRepository>>,
    settings_repo: Option<Arc<dyn SettingsRepository>>,
    platform: Option<Arc<dyn ChatPlatform>>,
    bot_user_id: Option<Snowflake>,
    clock: Option<Arc<dyn Clock>>,
    timings: Option<TicketTimings>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticket_repo(mut self, repo: Arc<dyn TicketRepository>) -> Self {
        self.ticket_repo = Some(repo);
        self
    }

    pub fn settings_repo(mut self, repo: Arc<dyn SettingsRepository>) -> Self {
        self.settings_repo = Some(repo);
        self
    }

    pub fn platform(mut self, platform: Arc<dyn ChatPlatform>) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn bot_user_id(mut self, id: Snowflake) -> Self {
        self.bot_user_id = Some(id);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn timings(mut self, timings: TicketTimings) -> Self {
        self.timings = Some(timings);
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any required dependency is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext::new(
            self.ticket_repo
                .ok_or_else(|| ServiceError::validation("ticket_repo is required"))?,
            self.settings_repo
                .ok_or_else(|| ServiceError::validation("settings_repo is required"))?,
            self.platform
                .ok_or_else(|| ServiceError::validation("platform is required"))?,
            self.bot_user_id
                .ok_or_else(|| ServiceError::validation("bot_user_id is required"))?,
            self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            self.timings.unwrap_or_default(),
        ))
    }
}
