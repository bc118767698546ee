//! Lifecycle controller tests
//!
//! Run against in-memory stores and a recording platform with tokio time
//! paused, so no external services are needed.
//!
//! Run with: cargo test -p integration-tests --test lifecycle_tests

use std::time::Duration;

use integration_tests::{settle, Harness, GUILD, OTHER_STAFF, OWNER, STAFF, STAFF_ROLE, TRANSCRIPTS};
use ticket_core::{
    DomainError, OverwriteKind, Permissions, Rating, Snowflake, Ticket, TicketRepository,
    TicketStatus, TicketType,
};
use ticket_service::services::InteractionKind;
use ticket_service::{ClaimOutcome, CloseOutcome, ServiceError};

fn domain(err: ServiceError) -> DomainError {
    match err {
        ServiceError::Domain(e) => e,
        other => panic!("expected a domain error, got {other:?}"),
    }
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_create_opens_private_channel_and_welcomes_owner() {
    let h = Harness::new();
    h.configure().await;

    let ticket = h.open(OWNER).await;

    let channels = h.platform.created_channels();
    assert_eq!(channels.len(), 1);
    let (channel_id, spec) = &channels[0];
    assert_eq!(*channel_id, ticket.id);
    assert_eq!(spec.name, "ticket-support-user1");
    assert_eq!(spec.parent_id, Some(integration_tests::CATEGORY));
    assert!(spec.overwrites.iter().any(|o| o.target_id == STAFF_ROLE
        && o.kind == OverwriteKind::Role
        && o.allow == Permissions::TICKET_STAFF));
    assert!(spec
        .overwrites
        .iter()
        .any(|o| o.target_id == GUILD && o.deny.contains(Permissions::VIEW_CHANNEL)));

    let welcome = &h.platform.messages_in(ticket.id)[0];
    assert_eq!(welcome.title.as_deref(), Some("Welcome to your support ticket!"));
    assert_eq!(welcome.content.as_deref(), Some("<@1> <@&400>"));
    let buttons: Vec<&str> = welcome.buttons.iter().map(|b| b.custom_id.as_str()).collect();
    assert_eq!(
        buttons,
        [format!("ticket:close:{}", ticket.id), format!("ticket:claim:{}", ticket.id)]
    );

    assert_eq!(ticket.status, TicketStatus::Open);
    assert_eq!(ticket.next_check_at, Some(ticket.created_at + chrono::Duration::hours(1)));
    assert!(h.controller.watchers().is_watching(ticket.id));
    assert!(h.controller.interactions().contains(InteractionKind::Claim, ticket.id));
    assert!(h.controller.interactions().contains(InteractionKind::Close, ticket.id));
}

#[tokio::test(start_paused = true)]
async fn test_create_without_settings_is_rejected() {
    let h = Harness::new();

    let err = h
        .controller
        .create(Harness::new_ticket(OWNER, TicketType::Support))
        .await
        .unwrap_err();

    assert!(matches!(domain(err), DomainError::SettingsNotFound(g) if g == GUILD));
    assert!(h.platform.created_channels().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_second_ticket_for_same_user_is_rejected() {
    let h = Harness::new();
    h.configure().await;
    let first = h.open(OWNER).await;

    let err = h
        .controller
        .create(Harness::new_ticket(OWNER, TicketType::Other))
        .await
        .unwrap_err();

    assert!(matches!(domain(err), DomainError::DuplicateTicket { existing } if existing == first.id));
    assert_eq!(h.platform.created_channels().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_creates_leave_one_ticket() {
    let h = Harness::racing();
    h.configure().await;

    let (a, b) = tokio::join!(
        h.controller.create(Harness::new_ticket(OWNER, TicketType::Support)),
        h.controller.create(Harness::new_ticket(OWNER, TicketType::Other)),
    );

    assert_eq!(u8::from(a.is_ok()) + u8::from(b.is_ok()), 1);
    let loser = a.err().or(b.err()).unwrap();
    assert!(matches!(domain(loser), DomainError::DuplicateTicket { .. }));
    assert_eq!(h.tickets.len(), 1);

    // A channel allocated by the losing request is removed again
    let created = h.platform.created_channels().len();
    let deleted = h.platform.deleted_channels().len();
    assert_eq!(created - deleted, 1);
}

#[tokio::test(start_paused = true)]
async fn test_welcome_failure_rolls_back() {
    let h = Harness::new();
    h.configure().await;
    h.platform.fail_channel_messages(true);

    let err = h
        .controller
        .create(Harness::new_ticket(OWNER, TicketType::Support))
        .await
        .unwrap_err();

    assert!(matches!(domain(err), DomainError::Delivery(_)));
    assert!(h.tickets.is_empty());
    let (channel_id, _) = h.platform.created_channels()[0].clone();
    assert_eq!(h.platform.deleted_channels(), vec![channel_id]);
    assert_eq!(h.controller.watchers().active_count(), 0);

    // Nothing is left behind to block a retry
    h.platform.fail_channel_messages(false);
    h.open(OWNER).await;
}

#[tokio::test(start_paused = true)]
async fn test_channel_failure_creates_nothing() {
    let h = Harness::new();
    h.configure().await;
    h.platform.fail_channel_creation(true);

    let err = h
        .controller
        .create(Harness::new_ticket(OWNER, TicketType::Support))
        .await
        .unwrap_err();

    assert!(matches!(domain(err), DomainError::Delivery(_)));
    assert!(h.tickets.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_auto_close_disabled_means_no_watcher() {
    let h = Harness::new();
    h.configure_with(h.default_settings().with_auto_close(false))
        .await;

    let ticket = h.open(OWNER).await;

    assert!(ticket.next_check_at.is_none());
    assert!(!h.controller.watchers().is_watching(ticket.id));
}

// ============================================================================
// Claim
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_claim_grants_access_and_announces() {
    let h = Harness::new();
    h.configure().await;
    let ticket = h.open(OWNER).await;

    let outcome = h.controller.claim(ticket.id, STAFF).await.unwrap();

    let ClaimOutcome::Claimed(claimed) = outcome else {
        panic!("expected a fresh claim");
    };
    assert_eq!(claimed.status, TicketStatus::Claimed);
    assert_eq!(claimed.claimed_by, Some(STAFF));
    assert_eq!(
        h.platform.grants(),
        vec![(ticket.id, STAFF, Permissions::TICKET_STAFF)]
    );
    assert_eq!(h.platform.count_in(ticket.id, "Ticket claimed by <@2>"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_owner_cannot_claim_own_ticket() {
    let h = Harness::new();
    h.configure().await;
    let ticket = h.open(OWNER).await;

    let err = h.controller.claim(ticket.id, OWNER).await.unwrap_err();

    assert!(matches!(domain(err), DomainError::SelfClaim));
    assert_eq!(h.ticket(ticket.id).await.status, TicketStatus::Open);
}

#[tokio::test(start_paused = true)]
async fn test_second_claim_reports_first_claimer() {
    let h = Harness::new();
    h.configure().await;
    let ticket = h.open(OWNER).await;
    h.controller.claim(ticket.id, STAFF).await.unwrap();

    let outcome = h.controller.claim(ticket.id, OTHER_STAFF).await.unwrap();

    assert!(matches!(outcome, ClaimOutcome::AlreadyClaimed(t) if t.claimed_by == Some(STAFF)));
    assert_eq!(h.platform.grants().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_claims_have_one_winner() {
    let h = Harness::racing();
    h.configure().await;
    let ticket = h.open(OWNER).await;

    let (a, b) = tokio::join!(
        h.controller.claim(ticket.id, STAFF),
        h.controller.claim(ticket.id, OTHER_STAFF),
    );
    let outcomes = [a.unwrap(), b.unwrap()];

    let winners: Vec<&Ticket> = outcomes
        .iter()
        .filter_map(|o| match o {
            ClaimOutcome::Claimed(t) => Some(t),
            ClaimOutcome::AlreadyClaimed(_) => None,
        })
        .collect();
    assert_eq!(winners.len(), 1);
    let winner = winners[0].claimed_by.unwrap();

    assert_eq!(h.ticket(ticket.id).await.claimed_by, Some(winner));
    assert_eq!(h.platform.grants().len(), 1);
    assert_eq!(h.platform.count_in(ticket.id, "Ticket claimed by"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_closed_ticket_cannot_be_claimed() {
    let h = Harness::new();
    h.configure().await;
    let ticket = h.open(OWNER).await;
    h.controller.close(ticket.id, STAFF, false).await.unwrap();

    let err = h.controller.claim(ticket.id, OTHER_STAFF).await.unwrap_err();

    assert!(matches!(
        domain(err),
        DomainError::InvalidTransition { action: "claim", .. }
    ));
}

// ============================================================================
// Close
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_close_archives_notifies_and_deletes() {
    let h = Harness::new();
    h.configure().await;
    let ticket = h.open(OWNER).await;
    h.controller.claim(ticket.id, STAFF).await.unwrap();
    h.platform.post_user_message(ticket.id, OWNER, "my printer is on fire");

    let outcome = h.controller.close(ticket.id, STAFF, false).await.unwrap();

    let CloseOutcome::Closed(closed) = outcome else {
        panic!("expected this call to close the ticket");
    };
    assert_eq!(closed.status, TicketStatus::Closed);
    assert_eq!(closed.closed_by, Some(STAFF));
    assert!(closed.closed_at.is_some());

    assert_eq!(
        h.platform.count_in(ticket.id, "Closing this ticket in 10 seconds..."),
        1
    );

    let archived = h.platform.messages_in(TRANSCRIPTS);
    assert_eq!(archived.len(), 1);
    let summary = &archived[0];
    assert_eq!(summary.title.as_deref(), Some("Ticket Transcript"));
    assert_eq!(summary.field("Closed By"), Some("<@2>"));
    assert_eq!(summary.field("Claimed By"), Some("<@2>"));
    let attachment = summary.attachment.as_ref().unwrap();
    assert_eq!(attachment.filename, format!("transcript-ticket-{}.txt", ticket.id));
    assert!(String::from_utf8_lossy(&attachment.data).contains("user1: my printer is on fire"));

    assert!(!h.controller.watchers().is_watching(ticket.id));
    assert!(!h.controller.interactions().contains(InteractionKind::Close, ticket.id));

    // Channel goes away after the delete delay
    settle().await;
    assert!(h.platform.deleted_channels().is_empty());
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(h.platform.deleted_channels(), vec![ticket.id]);
    assert!(h.ticket(ticket.id).await.channel_deleted_at.is_some());

    // Owner was asked for feedback
    let dms = h.platform.direct_messages(OWNER);
    assert_eq!(dms.len(), 1);
    assert_eq!(dms[0].buttons.len(), 3);
    assert!(h.controller.interactions().contains(InteractionKind::Feedback, ticket.id));
}

#[tokio::test(start_paused = true)]
async fn test_close_without_transcript_channel_skips_archive() {
    let h = Harness::new();
    let mut settings = h.default_settings();
    settings.transcript_channel_id = None;
    h.configure_with(settings).await;
    let ticket = h.open(OWNER).await;

    h.controller.close(ticket.id, STAFF, false).await.unwrap();

    assert!(h.platform.messages_in(TRANSCRIPTS).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_closes_run_side_effects_once() {
    let h = Harness::racing();
    h.configure().await;
    let ticket = h.open(OWNER).await;

    let (a, b) = tokio::join!(
        h.controller.close(ticket.id, STAFF, false),
        h.controller.close(ticket.id, OWNER, false),
    );
    let outcomes = [a.unwrap(), b.unwrap()];

    let closed = outcomes
        .iter()
        .filter(|o| matches!(o, CloseOutcome::Closed(_)))
        .count();
    assert_eq!(closed, 1);
    assert!(outcomes
        .iter()
        .any(|o| matches!(o, CloseOutcome::AlreadyClosed(_))));

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(h.platform.messages_in(TRANSCRIPTS).len(), 1);
    assert_eq!(h.platform.count_in(ticket.id, "Closing this ticket"), 1);
    assert_eq!(h.platform.deleted_channels(), vec![ticket.id]);
    assert_eq!(h.platform.direct_messages(OWNER).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_closing_a_closed_ticket_is_rejected() {
    let h = Harness::new();
    h.configure().await;
    let ticket = h.open(OWNER).await;
    h.controller.close(ticket.id, STAFF, false).await.unwrap();

    let err = h.controller.close(ticket.id, STAFF, false).await.unwrap_err();

    let err = domain(err);
    assert!(matches!(
        err,
        DomainError::InvalidTransition {
            status: TicketStatus::Closed,
            action: "close"
        }
    ));
    assert_eq!(err.user_message(), "❌ Cannot close this ticket, it is already closed.");
}

#[tokio::test(start_paused = true)]
async fn test_close_unknown_ticket() {
    let h = Harness::new();
    h.configure().await;

    let err = h
        .controller
        .close(Snowflake::new(424_242), STAFF, false)
        .await
        .unwrap_err();

    assert!(matches!(domain(err), DomainError::TicketNotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn test_owner_can_open_again_after_close() {
    let h = Harness::new();
    h.configure().await;
    let first = h.open(OWNER).await;
    h.controller.close(first.id, OWNER, false).await.unwrap();

    let second = h.open(OWNER).await;

    assert_ne!(first.id, second.id);
}

// ============================================================================
// Feedback
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_feedback_accepted_once_from_owner() {
    let h = Harness::new();
    h.configure().await;
    let ticket = h.open(OWNER).await;
    h.controller.close(ticket.id, STAFF, false).await.unwrap();
    settle().await;

    let err = h
        .controller
        .submit_feedback(ticket.id, STAFF, Rating::Excellent, None)
        .await
        .unwrap_err();
    assert!(matches!(domain(err), DomainError::MissingPermission(_)));

    let rated = h
        .controller
        .submit_feedback(ticket.id, OWNER, Rating::Average, Some("quick".to_string()))
        .await
        .unwrap();
    let feedback = rated.feedback.unwrap();
    assert_eq!(feedback.rating, Rating::Average);
    assert_eq!(feedback.comment.as_deref(), Some("quick"));
    assert!(!h.controller.interactions().contains(InteractionKind::Feedback, ticket.id));

    let err = h
        .controller
        .submit_feedback(ticket.id, OWNER, Rating::Poor, None)
        .await
        .unwrap_err();
    assert!(matches!(domain(err), DomainError::FeedbackClosed));
    assert_eq!(
        h.ticket(ticket.id).await.feedback.unwrap().rating,
        Rating::Average
    );
}

#[tokio::test(start_paused = true)]
async fn test_feedback_window_expires() {
    let h = Harness::new();
    h.configure().await;
    let ticket = h.open(OWNER).await;
    h.controller.close(ticket.id, STAFF, false).await.unwrap();
    settle().await;

    tokio::time::sleep(Duration::from_secs(7 * 24 * 3600 + 60)).await;

    let err = h
        .controller
        .submit_feedback(ticket.id, OWNER, Rating::Excellent, None)
        .await
        .unwrap_err();
    assert!(matches!(domain(err), DomainError::InteractionExpired));
    assert!(h.ticket(ticket.id).await.feedback.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_feedback_on_open_ticket_is_rejected() {
    let h = Harness::new();
    h.configure().await;
    let ticket = h.open(OWNER).await;

    let err = h
        .controller
        .submit_feedback(ticket.id, OWNER, Rating::Excellent, None)
        .await
        .unwrap_err();

    assert!(matches!(
        domain(err),
        DomainError::InvalidTransition { action: "rate", .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_closed_dms_do_not_block_close_or_rating() {
    let h = Harness::new();
    h.configure().await;
    h.platform.fail_direct_messages(true);
    let ticket = h.open(OWNER).await;

    let outcome = h.controller.close(ticket.id, STAFF, false).await.unwrap();
    settle().await;

    assert!(matches!(outcome, CloseOutcome::Closed(_)));
    assert!(h.platform.direct_messages(OWNER).is_empty());
    assert!(!h.controller.interactions().contains(InteractionKind::Feedback, ticket.id));

    // The record alone still admits the owner's rating
    let rated = h
        .controller
        .submit_feedback(ticket.id, OWNER, Rating::Excellent, None)
        .await
        .unwrap();
    assert_eq!(rated.feedback.unwrap().rating, Rating::Excellent);
}

// ============================================================================
// Restore
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_restore_rebuilds_watchers_and_controls() {
    let h = Harness::new();
    h.configure().await;

    let now = h.now();
    let open = Ticket::new(Snowflake::new(5001), GUILD, OWNER, TicketType::Support, now)
        .with_next_check(now + chrono::Duration::hours(1));
    let closed = {
        let mut t = Ticket::new(Snowflake::new(5002), GUILD, STAFF, TicketType::Other, now);
        t.status = TicketStatus::Closed;
        t
    };
    h.tickets.create(&open).await.unwrap();
    h.tickets.insert_raw(closed.clone());

    let watched = h.controller.restore().await.unwrap();

    assert_eq!(watched, 1);
    assert!(h.controller.watchers().is_watching(open.id));
    assert!(!h.controller.watchers().is_watching(closed.id));
    assert!(h.controller.interactions().contains(InteractionKind::Claim, open.id));
    assert!(!h.controller.interactions().contains(InteractionKind::Claim, closed.id));

    h.controller.shutdown();
    assert_eq!(h.controller.watchers().active_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_restore_skips_watchers_when_auto_close_is_off() {
    let h = Harness::new();
    h.configure_with(h.default_settings().with_auto_close(false))
        .await;
    let ticket = Ticket::new(Snowflake::new(6001), GUILD, OWNER, TicketType::Support, h.now());
    h.tickets.create(&ticket).await.unwrap();

    let watched = h.controller.restore().await.unwrap();

    assert_eq!(watched, 0);
    assert!(h.controller.interactions().contains(InteractionKind::Close, ticket.id));
}

#[tokio::test(start_paused = true)]
async fn test_restore_finishes_interrupted_channel_deletions() {
    let h = Harness::new();
    h.configure().await;
    let now = h.now();

    let closed_at = |id: i64, ago: i64| {
        let mut t = Ticket::new(Snowflake::new(id), GUILD, OWNER, TicketType::Support, now);
        t.status = TicketStatus::Closed;
        t.closed_by = Some(STAFF);
        t.closed_at = Some(now - chrono::Duration::seconds(ago));
        t
    };
    // Closed 4s before the restart, closed an hour ago, and one already cleaned up
    let recent = closed_at(7001, 4);
    let stale = closed_at(7002, 3600);
    let mut done = closed_at(7003, 3600);
    done.channel_deleted_at = Some(now - chrono::Duration::minutes(59));
    for ticket in [&recent, &stale, &done] {
        h.tickets.insert_raw(ticket.clone());
    }

    h.controller.restore().await.unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.platform.deleted_channels(), vec![stale.id]);

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(h.platform.deleted_channels(), vec![stale.id, recent.id]);
    assert!(h.ticket(recent.id).await.channel_deleted_at.is_some());
    assert!(h.ticket(stale.id).await.channel_deleted_at.is_some());
    assert!(h.tickets.find_awaiting_channel_deletion().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_restore_after_clean_close_deletes_nothing_again() {
    let h = Harness::new();
    h.configure().await;
    let ticket = h.open(OWNER).await;
    h.controller.close(ticket.id, STAFF, false).await.unwrap();
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(h.platform.deleted_channels(), vec![ticket.id]);

    h.controller.restore().await.unwrap();
    tokio::time::sleep(Duration::from_secs(11)).await;

    assert_eq!(h.platform.deleted_channels(), vec![ticket.id]);
}
