//! Inactivity watchers
//!
//! One tokio task per active ticket. Each wake-up re-reads the record and
//! the channel's last human activity, then asks [`evaluate`] what to do.
//! The next deadline and the warned flag are persisted on the record so
//! watchers can be rebuilt after a restart.
//!
//! Cancellation is best-effort. A watcher that has already decided to close
//! races the manual path through the store's compare-and-update, and only
//! the winner runs the close side effects.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use ticket_core::{DomainError, Snowflake, TicketMutation};

use super::error::ServiceResult;
use super::lifecycle::LifecycleController;
use super::notices;

/// Time spans driving one watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchThresholds {
    /// Silence after which a warning is issued
    pub inactivity: Duration,
    /// Warning to re-check
    pub grace: Duration,
    pub poll: Duration,
}

/// Outcome of one watcher evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchDecision {
    /// Recent activity; poll again later
    Reschedule { next: DateTime<Utc> },
    /// Threshold exceeded; warn and re-check after the grace period
    Warn { recheck_at: DateTime<Utc> },
    /// The owner answered the warning; clear it and resume polling
    Resume { next: DateTime<Utc> },
    /// Warned, grace period still running
    Wait { until: DateTime<Utc> },
    /// Warned and still silent after the grace period
    Close,
}

/// Decide the next watcher action
///
/// Activity counts as a reply to a warning only when strictly later than
/// the warning itself.
pub fn evaluate(
    now: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    warned_at: Option<DateTime<Utc>>,
    thresholds: &WatchThresholds,
) -> WatchDecision {
    match warned_at {
        None if now - last_activity < thresholds.inactivity => WatchDecision::Reschedule {
            next: now + thresholds.poll,
        },
        None => WatchDecision::Warn {
            recheck_at: now + thresholds.grace,
        },
        Some(warned) if last_activity > warned => WatchDecision::Resume {
            next: now + thresholds.poll,
        },
        Some(warned) if now < warned + thresholds.grace => WatchDecision::Wait {
            until: warned + thresholds.grace,
        },
        Some(_) => WatchDecision::Close,
    }
}

struct WatchEntry {
    generation: u64,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Live watcher tasks keyed by ticket id
#[derive(Default)]
pub struct WatcherRegistry {
    entries: DashMap<Snowflake, WatchEntry>,
    generation: std::sync::atomic::AtomicU64,
}

impl WatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn next_generation(&self) -> u64 {
        self.generation
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    }

    /// Track a spawned watcher, cancelling any previous one for the ticket
    pub(crate) fn insert(
        &self,
        ticket_id: Snowflake,
        generation: u64,
        token: CancellationToken,
        handle: JoinHandle<()>,
    ) {
        let previous = self.entries.insert(
            ticket_id,
            WatchEntry {
                generation,
                token,
                handle,
            },
        );
        if let Some(previous) = previous {
            previous.token.cancel();
        }
    }

    /// Cancel a ticket's watcher; returns whether one was registered
    pub fn cancel(&self, ticket_id: Snowflake) -> bool {
        match self.entries.remove(&ticket_id) {
            Some((_, entry)) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Called by a task on exit; a newer watcher for the same ticket stays
    pub(crate) fn finish(&self, ticket_id: Snowflake, generation: u64) {
        self.entries
            .remove_if(&ticket_id, |_, entry| entry.generation == generation);
    }

    pub fn is_watching(&self, ticket_id: Snowflake) -> bool {
        self.entries
            .get(&ticket_id)
            .is_some_and(|entry| !entry.handle.is_finished() && !entry.token.is_cancelled())
    }

    /// Number of running watchers
    pub fn active_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| !entry.handle.is_finished())
            .count()
    }

    pub fn cancel_all(&self) {
        for entry in self.entries.iter() {
            entry.token.cancel();
        }
        self.entries.clear();
    }
}

/// Watcher task body
pub(crate) async fn run(
    controller: Arc<LifecycleController>,
    ticket_id: Snowflake,
    first_check: DateTime<Utc>,
    token: CancellationToken,
) {
    let ctx = controller.context();
    let mut deadline = first_check;

    loop {
        let wait = (deadline - ctx.now()).to_std().unwrap_or_default();
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(ticket_id = %ticket_id, "Watcher cancelled");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        match step(&controller, ticket_id).await {
            Ok(Some(next)) => deadline = next,
            Ok(None) => return,
            Err(e) => {
                warn!(ticket_id = %ticket_id, error = %e, "Watcher check failed; retrying next poll");
                deadline = ctx.now() + ctx.poll_interval();
            }
        }
    }
}

/// One evaluation; returns the next deadline, or `None` when the watcher is done
#[instrument(skip(controller))]
async fn step(
    controller: &LifecycleController,
    ticket_id: Snowflake,
) -> ServiceResult<Option<DateTime<Utc>>> {
    let ctx = controller.context();

    let Some(ticket) = ctx.ticket_repo().find_by_id(ticket_id).await? else {
        debug!("Ticket record gone; watcher exiting");
        return Ok(None);
    };
    if ticket.is_terminal() {
        return Ok(None);
    }

    let inactivity = match ctx.settings_repo().find(ticket.guild_id).await? {
        Some(settings) if !settings.auto_close_enabled => {
            info!("Auto-close disabled for guild; watcher exiting");
            return Ok(None);
        }
        Some(settings) => settings.inactivity_threshold(),
        None => Duration::hours(i64::from(ctx.timings().inactivity_hours.max(1))),
    };
    let thresholds = WatchThresholds {
        inactivity,
        grace: ctx.grace_period(),
        poll: ctx.poll_interval(),
    };

    let last_activity = ctx
        .platform()
        .last_activity(ticket_id)
        .await?
        .map_or(ticket.created_at, |at| at.max(ticket.created_at));
    let now = ctx.now();

    let decision = evaluate(now, last_activity, ticket.warned_at, &thresholds);
    debug!(?decision, "Watcher evaluated");

    let (next, warned_at) = match decision {
        WatchDecision::Reschedule { next } => (next, None),
        WatchDecision::Resume { next } => {
            info!("Activity after warning; pending close cancelled");
            (next, None)
        }
        WatchDecision::Warn { recheck_at } => {
            ctx.platform()
                .send_message(
                    ticket_id,
                    &notices::inactivity_warning(ticket.user_id, thresholds.grace),
                )
                .await?;
            info!(recheck_at = %recheck_at, "Inactivity warning issued");
            (recheck_at, Some(now))
        }
        WatchDecision::Wait { until } => return Ok(Some(until)),
        WatchDecision::Close => {
            info!("No reply after warning; auto-closing");
            match controller.close(ticket_id, ctx.bot_user_id(), true).await {
                Ok(_) => {}
                Err(e) if matches!(e.as_domain(), Some(DomainError::InvalidTransition { .. })) => {
                    info!("Ticket closed concurrently; nothing to do");
                }
                Err(e) => return Err(e),
            }
            return Ok(None);
        }
    };

    let mut expected = ticket.status;
    loop {
        let persisted = ctx
            .ticket_repo()
            .compare_and_update(
                ticket_id,
                expected,
                TicketMutation::Watch {
                    next_check_at: Some(next),
                    warned_at,
                },
            )
            .await;

        match persisted {
            Ok(_) => return Ok(Some(next)),
            // Claimed meanwhile; the warning already went out and must stay recorded
            Err(DomainError::Conflict { actual, .. }) if actual.is_active() && actual != expected => {
                debug!(%expected, %actual, "Status moved on; saving watch state again");
                expected = actual;
            }
            // Closed meanwhile; the next step sees it and exits
            Err(DomainError::Conflict { .. }) => return Ok(Some(now)),
            Err(e) => return Err(e.into()),
        }
    }
}
