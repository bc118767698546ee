//! Inactivity watcher tests
//!
//! Tokio time is paused, so days of ticket silence pass instantly. Each
//! test opens its ticket at the start and then jumps to points between
//! hourly polls.
//!
//! Run with: cargo test -p integration-tests --test watcher_tests

use std::time::Duration;

use tokio::time::Instant;

use integration_tests::{settle, Harness, BOT, GUILD, OWNER, STAFF, TRANSCRIPTS};
use ticket_common::TicketTimings;
use ticket_core::{
    ChatPlatform, OutgoingMessage, Snowflake, Ticket, TicketMutation, TicketSettings, TicketStatus,
    TicketType, ACTIVITY_SCAN,
};
use ticket_service::CloseOutcome;

const WARNING: &str = "This ticket will be closed in 1 hour due to inactivity.";
const AUTO_CLOSING: &str = "Closing due to inactivity...";

/// Sleep until `hours:minutes` after `start`
async fn advance_to(start: Instant, hours: u64, minutes: u64) {
    tokio::time::sleep_until(start + Duration::from_secs(hours * 3600 + minutes * 60)).await;
    settle().await;
}

#[tokio::test(start_paused = true)]
async fn test_silent_ticket_is_warned_then_auto_closed() {
    let h = Harness::new();
    h.configure().await;
    let start = Instant::now();
    let ticket = h.open(OWNER).await;

    advance_to(start, 47, 30).await;
    assert_eq!(h.platform.count_in(ticket.id, WARNING), 0);
    let polled = h.ticket(ticket.id).await;
    assert!(polled.warned_at.is_none());
    assert!(polled.next_check_at.unwrap() > h.now());

    advance_to(start, 48, 30).await;
    assert_eq!(h.platform.count_in(ticket.id, WARNING), 1);
    let warned = h.ticket(ticket.id).await;
    assert_eq!(warned.status, TicketStatus::Open);
    assert!(warned.warned_at.is_some());

    advance_to(start, 49, 30).await;
    let closed = h.ticket(ticket.id).await;
    assert_eq!(closed.status, TicketStatus::AutoClosed);
    assert_eq!(closed.closed_by, Some(BOT));
    assert_eq!(h.platform.count_in(ticket.id, AUTO_CLOSING), 1);
    assert_eq!(h.platform.count_in(ticket.id, WARNING), 1);
    assert_eq!(h.platform.deleted_channels(), vec![ticket.id]);
    assert!(!h.controller.watchers().is_watching(ticket.id));

    // Auto-closed tickets are archived and rated like any other
    assert_eq!(h.platform.messages_in(TRANSCRIPTS).len(), 1);
    assert_eq!(h.platform.direct_messages(OWNER).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_owner_reply_cancels_pending_close() {
    let h = Harness::new();
    h.configure().await;
    let start = Instant::now();
    let ticket = h.open(OWNER).await;

    advance_to(start, 48, 30).await;
    assert_eq!(h.platform.count_in(ticket.id, WARNING), 1);

    h.platform
        .post_user_message(ticket.id, OWNER, "still waiting on a fix");

    advance_to(start, 50, 30).await;
    let resumed = h.ticket(ticket.id).await;
    assert_eq!(resumed.status, TicketStatus::Open);
    assert!(resumed.warned_at.is_none());
    assert_eq!(h.platform.count_in(ticket.id, AUTO_CLOSING), 0);
    assert!(h.controller.watchers().is_watching(ticket.id));
}

#[tokio::test(start_paused = true)]
async fn test_staff_activity_counts_as_activity() {
    let h = Harness::new();
    h.configure().await;
    let start = Instant::now();
    let ticket = h.open(OWNER).await;
    h.controller.claim(ticket.id, STAFF).await.unwrap();

    advance_to(start, 30, 0).await;
    h.platform.post_user_message(ticket.id, STAFF, "any update?");

    // 48h after creation but only 18h after the staff message
    advance_to(start, 48, 30).await;
    assert_eq!(h.platform.count_in(ticket.id, WARNING), 0);
    assert_eq!(h.ticket(ticket.id).await.status, TicketStatus::Claimed);
}

#[tokio::test(start_paused = true)]
async fn test_owner_reply_behind_bot_chatter_still_counts() {
    let h = Harness::new();
    h.configure().await;
    let start = Instant::now();
    let ticket = h.open(OWNER).await;

    advance_to(start, 30, 0).await;
    h.platform.post_user_message(ticket.id, OWNER, "here are the logs");
    advance_to(start, 31, 0).await;
    for n in 0..ACTIVITY_SCAN - 1 {
        h.platform
            .send_message(ticket.id, &OutgoingMessage::text(format!("build {n} failed")))
            .await
            .unwrap();
    }

    advance_to(start, 48, 30).await;
    assert_eq!(h.platform.count_in(ticket.id, WARNING), 0);
}

#[tokio::test(start_paused = true)]
async fn test_manual_close_during_grace_wins() {
    let h = Harness::new();
    h.configure().await;
    let start = Instant::now();
    let ticket = h.open(OWNER).await;

    advance_to(start, 48, 30).await;
    assert_eq!(h.platform.count_in(ticket.id, WARNING), 1);

    h.controller.close(ticket.id, STAFF, false).await.unwrap();

    advance_to(start, 50, 0).await;
    let closed = h.ticket(ticket.id).await;
    assert_eq!(closed.status, TicketStatus::Closed);
    assert_eq!(closed.closed_by, Some(STAFF));
    assert_eq!(h.platform.count_in(ticket.id, "Ticket Closing"), 1);
    assert_eq!(h.platform.count_in(ticket.id, AUTO_CLOSING), 0);
    assert_eq!(h.platform.deleted_channels(), vec![ticket.id]);
}

#[tokio::test(start_paused = true)]
async fn test_claim_while_warning_is_saved_keeps_one_warning() {
    let (h, gate) =
        Harness::gated(|m| matches!(m, TicketMutation::Watch { warned_at: Some(_), .. }));
    h.configure().await;
    let start = Instant::now();
    let ticket = h.open(OWNER).await;

    // The warning is posted; staff claim before the watcher records it
    gate.reached().await;
    assert_eq!(h.platform.count_in(ticket.id, WARNING), 1);
    h.controller.claim(ticket.id, STAFF).await.unwrap();
    gate.release();

    advance_to(start, 48, 30).await;
    let claimed = h.ticket(ticket.id).await;
    assert_eq!(claimed.status, TicketStatus::Claimed);
    assert!(claimed.warned_at.is_some());
    assert_eq!(h.platform.count_in(ticket.id, WARNING), 1);

    // The grace period still runs from the original warning
    advance_to(start, 49, 30).await;
    assert_eq!(h.ticket(ticket.id).await.status, TicketStatus::AutoClosed);
    assert_eq!(h.platform.count_in(ticket.id, WARNING), 1);
}

#[tokio::test(start_paused = true)]
async fn test_auto_close_losing_store_race_does_nothing() {
    let (h, gate) = Harness::gated(|m| matches!(m, TicketMutation::Close { auto: true, .. }));
    h.configure().await;
    let ticket = h.open(OWNER).await;

    // Grace has run out and the watcher is about to write its close
    gate.reached().await;
    assert_eq!(h.platform.count_in(ticket.id, WARNING), 1);
    let outcome = h.controller.close(ticket.id, STAFF, false).await.unwrap();
    assert!(matches!(outcome, CloseOutcome::Closed(_)));
    gate.release();

    settle().await;
    tokio::time::sleep(Duration::from_secs(11)).await;

    let closed = h.ticket(ticket.id).await;
    assert_eq!(closed.status, TicketStatus::Closed);
    assert_eq!(closed.closed_by, Some(STAFF));
    assert_eq!(h.platform.count_in(ticket.id, AUTO_CLOSING), 0);
    assert_eq!(h.platform.count_in(ticket.id, "Ticket Closing"), 1);
    assert_eq!(h.platform.messages_in(TRANSCRIPTS).len(), 1);
    assert_eq!(h.platform.deleted_channels(), vec![ticket.id]);
    assert_eq!(h.platform.direct_messages(OWNER).len(), 1);
    assert!(!h.controller.watchers().is_watching(ticket.id));
}

#[tokio::test(start_paused = true)]
async fn test_guild_threshold_is_respected() {
    let h = Harness::new();
    h.configure_with(h.default_settings_with_hours(2)).await;
    let start = Instant::now();
    let ticket = h.open(OWNER).await;

    advance_to(start, 1, 30).await;
    assert_eq!(h.platform.count_in(ticket.id, WARNING), 0);

    advance_to(start, 2, 30).await;
    assert_eq!(h.platform.count_in(ticket.id, WARNING), 1);

    advance_to(start, 3, 30).await;
    assert_eq!(h.ticket(ticket.id).await.status, TicketStatus::AutoClosed);
}

#[tokio::test(start_paused = true)]
async fn test_grace_period_follows_timings() {
    let timings = TicketTimings {
        grace_period: Duration::from_secs(30 * 60),
        ..TicketTimings::default()
    };
    let h = Harness::with_timings(timings);
    h.configure_with(h.default_settings_with_hours(2)).await;
    let start = Instant::now();
    let ticket = h.open(OWNER).await;

    advance_to(start, 2, 10).await;
    assert_eq!(
        h.platform
            .count_in(ticket.id, "This ticket will be closed in 30 minutes due to inactivity."),
        1
    );

    // Warned at 2h, closed at the 2h30m re-check
    advance_to(start, 2, 40).await;
    assert_eq!(h.ticket(ticket.id).await.status, TicketStatus::AutoClosed);
}

#[tokio::test(start_paused = true)]
async fn test_disabling_auto_close_stops_watcher() {
    let h = Harness::new();
    h.configure().await;
    let start = Instant::now();
    let ticket = h.open(OWNER).await;
    assert!(h.controller.watchers().is_watching(ticket.id));

    h.configure_with(h.default_settings().with_auto_close(false))
        .await;

    advance_to(start, 1, 30).await;
    assert!(!h.controller.watchers().is_watching(ticket.id));

    advance_to(start, 60, 0).await;
    assert_eq!(h.ticket(ticket.id).await.status, TicketStatus::Open);
    assert_eq!(h.platform.count_in(ticket.id, WARNING), 0);
}

#[tokio::test(start_paused = true)]
async fn test_restored_overdue_warning_closes_immediately() {
    let h = Harness::new();
    h.configure().await;
    let now = h.now();

    // Warned two hours ago, before a restart; nobody answered
    let mut ticket = Ticket::new(
        Snowflake::new(7001),
        GUILD,
        OWNER,
        TicketType::Support,
        now - chrono::Duration::hours(50),
    )
    .with_next_check(now - chrono::Duration::hours(1));
    ticket.warned_at = Some(now - chrono::Duration::hours(2));
    h.tickets.insert_raw(ticket.clone());

    assert_eq!(h.controller.restore().await.unwrap(), 1);
    tokio::time::sleep(Duration::from_secs(1)).await;

    let closed = h.ticket(ticket.id).await;
    assert_eq!(closed.status, TicketStatus::AutoClosed);
    assert_eq!(h.platform.count_in(ticket.id, AUTO_CLOSING), 1);
}

#[tokio::test(start_paused = true)]
async fn test_watcher_without_settings_uses_default_threshold() {
    let h = Harness::new();
    h.configure().await;
    let start = Instant::now();
    let ticket = h.open(OWNER).await;

    // Settings disappear after the ticket is opened
    h.settings.remove(GUILD);

    advance_to(start, 47, 30).await;
    assert_eq!(h.platform.count_in(ticket.id, WARNING), 0);
    advance_to(start, 48, 30).await;
    assert_eq!(h.platform.count_in(ticket.id, WARNING), 1);
}

trait SettingsExt {
    fn default_settings_with_hours(&self, hours: i32) -> TicketSettings;
}

impl SettingsExt for Harness {
    fn default_settings_with_hours(&self, hours: i32) -> TicketSettings {
        let mut settings = self.default_settings();
        settings.auto_close_hours = hours;
        settings
    }
}
