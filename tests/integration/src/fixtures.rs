//! Test fixtures
//!
//! A recording chat platform, a clock driven by tokio time, and a harness
//! wiring the lifecycle controller over in-memory stores.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use ticket_common::TicketTimings;
use ticket_core::{
    ChannelMessage, ChannelSpec, ChatPlatform, Clock, DomainError, OutgoingMessage, Permissions,
    PlatformResult, RepoResult, SettingsRepository, Snowflake, Ticket, TicketMutation,
    TicketRepository, TicketSettings, TicketStatus, TicketType,
};
use ticket_db::{MemorySettingsRepository, MemoryTicketRepository};
use ticket_service::{InteractionDispatcher, LifecycleController, NewTicket, ServiceContextBuilder};

pub const GUILD: Snowflake = Snowflake::new(100);
pub const CATEGORY: Snowflake = Snowflake::new(200);
pub const TRANSCRIPTS: Snowflake = Snowflake::new(300);
pub const STAFF_ROLE: Snowflake = Snowflake::new(400);
pub const BOT: Snowflake = Snowflake::new(999);
pub const OWNER: Snowflake = Snowflake::new(1);
pub const STAFF: Snowflake = Snowflake::new(2);
pub const OTHER_STAFF: Snowflake = Snowflake::new(3);

// ============================================================================
// Clock
// ============================================================================

/// Wall clock that advances with tokio time, so paused tests control it
pub struct TokioClock {
    base: DateTime<Utc>,
    start: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            base: Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
            start: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.start.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.base + elapsed
    }
}

// ============================================================================
// Recording platform
// ============================================================================

#[derive(Default)]
struct Recorded {
    channels: Vec<(Snowflake, ChannelSpec)>,
    deleted: Vec<(Snowflake, String)>,
    grants: Vec<(Snowflake, Snowflake, Permissions)>,
    sent: Vec<(Snowflake, OutgoingMessage)>,
    direct: Vec<(Snowflake, OutgoingMessage)>,
    history: HashMap<Snowflake, Vec<ChannelMessage>>,
}

/// In-process platform that records every call
pub struct RecordingPlatform {
    clock: Arc<dyn Clock>,
    bot_id: Snowflake,
    next_id: AtomicI64,
    recorded: Mutex<Recorded>,
    fail_create_channel: AtomicBool,
    fail_send: AtomicBool,
    fail_direct: AtomicBool,
}

impl RecordingPlatform {
    pub fn new(clock: Arc<dyn Clock>, bot_id: Snowflake) -> Self {
        Self {
            clock,
            bot_id,
            next_id: AtomicI64::new(10_000),
            recorded: Mutex::new(Recorded::default()),
            fail_create_channel: AtomicBool::new(false),
            fail_send: AtomicBool::new(false),
            fail_direct: AtomicBool::new(false),
        }
    }

    fn allocate(&self) -> Snowflake {
        Snowflake::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    pub fn fail_channel_creation(&self, fail: bool) {
        self.fail_create_channel.store(fail, Ordering::SeqCst);
    }

    pub fn fail_channel_messages(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    pub fn fail_direct_messages(&self, fail: bool) {
        self.fail_direct.store(fail, Ordering::SeqCst);
    }

    /// A human message in a ticket channel, timestamped now
    pub fn post_user_message(&self, channel_id: Snowflake, author_id: Snowflake, content: &str) {
        let message = ChannelMessage {
            id: self.allocate(),
            channel_id,
            author_id,
            author_tag: format!("user{author_id}"),
            author_bot: false,
            content: content.to_string(),
            created_at: self.clock.now(),
        };
        self.recorded
            .lock()
            .history
            .entry(channel_id)
            .or_default()
            .push(message);
    }

    pub fn created_channels(&self) -> Vec<(Snowflake, ChannelSpec)> {
        self.recorded.lock().channels.clone()
    }

    pub fn deleted_channels(&self) -> Vec<Snowflake> {
        self.recorded.lock().deleted.iter().map(|(id, _)| *id).collect()
    }

    pub fn grants(&self) -> Vec<(Snowflake, Snowflake, Permissions)> {
        self.recorded.lock().grants.clone()
    }

    pub fn messages_in(&self, channel_id: Snowflake) -> Vec<OutgoingMessage> {
        self.recorded
            .lock()
            .sent
            .iter()
            .filter(|(id, _)| *id == channel_id)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Channel messages whose text contains `needle`
    pub fn count_in(&self, channel_id: Snowflake, needle: &str) -> usize {
        self.messages_in(channel_id)
            .iter()
            .filter(|m| m.plain_text().contains(needle))
            .count()
    }

    pub fn direct_messages(&self, user_id: Snowflake) -> Vec<OutgoingMessage> {
        self.recorded
            .lock()
            .direct
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[async_trait]
impl ChatPlatform for RecordingPlatform {
    async fn create_channel(&self, spec: &ChannelSpec) -> PlatformResult<Snowflake> {
        if self.fail_create_channel.load(Ordering::SeqCst) {
            return Err(DomainError::Delivery("channel creation refused".to_string()));
        }
        let id = self.allocate();
        self.recorded.lock().channels.push((id, spec.clone()));
        Ok(id)
    }

    async fn delete_channel(&self, channel_id: Snowflake, reason: &str) -> PlatformResult<()> {
        self.recorded
            .lock()
            .deleted
            .push((channel_id, reason.to_string()));
        Ok(())
    }

    async fn grant_member(
        &self,
        channel_id: Snowflake,
        member_id: Snowflake,
        allow: Permissions,
    ) -> PlatformResult<()> {
        self.recorded
            .lock()
            .grants
            .push((channel_id, member_id, allow));
        Ok(())
    }

    async fn send_message(
        &self,
        channel_id: Snowflake,
        message: &OutgoingMessage,
    ) -> PlatformResult<Snowflake> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(DomainError::Delivery("missing access".to_string()));
        }
        let id = self.allocate();
        let echo = ChannelMessage {
            id,
            channel_id,
            author_id: self.bot_id,
            author_tag: "TicketBot".to_string(),
            author_bot: true,
            content: message.plain_text(),
            created_at: self.clock.now(),
        };

        let mut recorded = self.recorded.lock();
        recorded.sent.push((channel_id, message.clone()));
        recorded.history.entry(channel_id).or_default().push(echo);
        Ok(id)
    }

    async fn send_direct(
        &self,
        user_id: Snowflake,
        message: &OutgoingMessage,
    ) -> PlatformResult<Snowflake> {
        if self.fail_direct.load(Ordering::SeqCst) {
            return Err(DomainError::Delivery("cannot send messages to this user".to_string()));
        }
        self.recorded.lock().direct.push((user_id, message.clone()));
        Ok(self.allocate())
    }

    async fn fetch_recent_messages(
        &self,
        channel_id: Snowflake,
        limit: u8,
    ) -> PlatformResult<Vec<ChannelMessage>> {
        let recorded = self.recorded.lock();
        let mut messages = recorded.history.get(&channel_id).cloned().unwrap_or_default();
        messages.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        messages.truncate(usize::from(limit));
        Ok(messages)
    }
}

// ============================================================================
// Racing repository
// ============================================================================

/// Yields around reads and writes so concurrent callers interleave
pub struct RacingRepository {
    inner: Arc<MemoryTicketRepository>,
}

impl RacingRepository {
    pub fn new(inner: Arc<MemoryTicketRepository>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl TicketRepository for RacingRepository {
    async fn create(&self, ticket: &Ticket) -> RepoResult<()> {
        tokio::task::yield_now().await;
        self.inner.create(ticket).await
    }

    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Ticket>> {
        let found = self.inner.find_by_id(id).await;
        tokio::task::yield_now().await;
        found
    }

    async fn find_open_by_user(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<Ticket>> {
        let found = self.inner.find_open_by_user(guild_id, user_id).await;
        tokio::task::yield_now().await;
        found
    }

    async fn find_active(&self) -> RepoResult<Vec<Ticket>> {
        self.inner.find_active().await
    }

    async fn find_awaiting_channel_deletion(&self) -> RepoResult<Vec<Ticket>> {
        self.inner.find_awaiting_channel_deletion().await
    }

    async fn compare_and_update(
        &self,
        id: Snowflake,
        expected: TicketStatus,
        mutation: TicketMutation,
    ) -> RepoResult<Ticket> {
        tokio::task::yield_now().await;
        self.inner.compare_and_update(id, expected, mutation).await
    }

    async fn delete(&self, id: Snowflake) -> RepoResult<()> {
        self.inner.delete(id).await
    }
}

// ============================================================================
// Gated repository
// ============================================================================

/// Holds the first write matching `trigger` until the test releases it
pub struct GatedRepository {
    inner: Arc<MemoryTicketRepository>,
    trigger: Box<dyn Fn(&TicketMutation) -> bool + Send + Sync>,
    armed: AtomicBool,
    reached: Notify,
    release: Notify,
}

impl GatedRepository {
    pub fn new(
        inner: Arc<MemoryTicketRepository>,
        trigger: impl Fn(&TicketMutation) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner,
            trigger: Box::new(trigger),
            armed: AtomicBool::new(true),
            reached: Notify::new(),
            release: Notify::new(),
        }
    }

    /// Wait until the gated write is parked
    pub async fn reached(&self) {
        self.reached.notified().await;
    }

    /// Let the parked write through
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl TicketRepository for GatedRepository {
    async fn create(&self, ticket: &Ticket) -> RepoResult<()> {
        self.inner.create(ticket).await
    }

    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Ticket>> {
        self.inner.find_by_id(id).await
    }

    async fn find_open_by_user(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<Ticket>> {
        self.inner.find_open_by_user(guild_id, user_id).await
    }

    async fn find_active(&self) -> RepoResult<Vec<Ticket>> {
        self.inner.find_active().await
    }

    async fn find_awaiting_channel_deletion(&self) -> RepoResult<Vec<Ticket>> {
        self.inner.find_awaiting_channel_deletion().await
    }

    async fn compare_and_update(
        &self,
        id: Snowflake,
        expected: TicketStatus,
        mutation: TicketMutation,
    ) -> RepoResult<Ticket> {
        if (self.trigger)(&mutation) && self.armed.swap(false, Ordering::SeqCst) {
            self.reached.notify_one();
            self.release.notified().await;
        }
        self.inner.compare_and_update(id, expected, mutation).await
    }

    async fn delete(&self, id: Snowflake) -> RepoResult<()> {
        self.inner.delete(id).await
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Controller and dispatcher over in-memory stores and a recording platform
pub struct Harness {
    pub clock: Arc<TokioClock>,
    pub platform: Arc<RecordingPlatform>,
    pub tickets: Arc<MemoryTicketRepository>,
    pub settings: Arc<MemorySettingsRepository>,
    pub controller: Arc<LifecycleController>,
    pub dispatcher: Arc<InteractionDispatcher>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(TicketTimings::default(), |tickets| tickets as Arc<dyn TicketRepository>)
    }

    pub fn with_timings(timings: TicketTimings) -> Self {
        Self::build(timings, |tickets| tickets as Arc<dyn TicketRepository>)
    }

    /// Store reads and writes yield, so `join!`ed operations interleave
    pub fn racing() -> Self {
        Self::build(TicketTimings::default(), |tickets| {
            Arc::new(RacingRepository::new(tickets)) as Arc<dyn TicketRepository>
        })
    }

    /// Park the first store write matching `trigger`; see [`GatedRepository`]
    pub fn gated(
        trigger: impl Fn(&TicketMutation) -> bool + Send + Sync + 'static,
    ) -> (Self, Arc<GatedRepository>) {
        let mut gate = None;
        let harness = Self::build(TicketTimings::default(), |tickets| {
            let gated = Arc::new(GatedRepository::new(tickets, trigger));
            gate = Some(gated.clone());
            gated as Arc<dyn TicketRepository>
        });
        (harness, gate.expect("gate installed"))
    }

    fn build(
        timings: TicketTimings,
        wrap: impl FnOnce(Arc<MemoryTicketRepository>) -> Arc<dyn TicketRepository>,
    ) -> Self {
        let clock = Arc::new(TokioClock::new());
        let platform = Arc::new(RecordingPlatform::new(clock.clone(), BOT));
        let tickets = Arc::new(MemoryTicketRepository::new());
        let settings = Arc::new(MemorySettingsRepository::new());

        let ticket_repo = wrap(tickets.clone());

        let context = ServiceContextBuilder::new()
            .ticket_repo(ticket_repo)
            .settings_repo(settings.clone())
            .platform(platform.clone())
            .bot_user_id(BOT)
            .clock(clock.clone())
            .timings(timings)
            .build()
            .expect("complete context");

        let controller = Arc::new(LifecycleController::new(context));
        let dispatcher = Arc::new(InteractionDispatcher::new(controller.clone()));

        Self {
            clock,
            platform,
            tickets,
            settings,
            controller,
            dispatcher,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Guild settings with a transcript channel and a staff role
    pub fn default_settings(&self) -> TicketSettings {
        TicketSettings::new(GUILD, CATEGORY, 48)
            .with_transcript_channel(TRANSCRIPTS)
            .with_staff_role(STAFF_ROLE)
    }

    pub async fn configure(&self) -> TicketSettings {
        self.configure_with(self.default_settings()).await
    }

    pub async fn configure_with(&self, settings: TicketSettings) -> TicketSettings {
        self.settings.upsert(&settings).await.expect("settings stored");
        settings
    }

    pub fn new_ticket(user_id: Snowflake, ticket_type: TicketType) -> NewTicket {
        NewTicket {
            guild_id: GUILD,
            user_id,
            username: format!("user{user_id}"),
            ticket_type,
            reason: None,
            description: None,
        }
    }

    pub async fn open(&self, user_id: Snowflake) -> Ticket {
        self.controller
            .create(Self::new_ticket(user_id, TicketType::Support))
            .await
            .expect("ticket created")
    }

    pub async fn ticket(&self, id: Snowflake) -> Ticket {
        self.controller.get_ticket(id).await.expect("ticket exists")
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Let spawned tasks run to their next await on a timer or channel
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}
