//! Transcript archival
//!
//! At close time the most recent messages of a ticket channel are rendered
//! oldest-first into a text file and posted, with a summary, to the guild's
//! transcript channel.

use chrono::Duration;
use tracing::{info, instrument};

use ticket_core::{ChannelMessage, OutgoingMessage, Snowflake, Ticket, TicketSettings};

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::notices::format_time;

/// Per-line timestamp, e.g. `3/1/2025, 2:05:09 PM`
const LINE_TIME_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Rendered channel history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    lines: Vec<String>,
}

impl Transcript {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn filename(ticket_id: Snowflake) -> String {
        format!("transcript-ticket-{ticket_id}.txt")
    }
}

/// Render messages oldest-first, keeping at most the `limit` most recent
pub fn render_transcript(mut messages: Vec<ChannelMessage>, limit: usize) -> Transcript {
    messages.sort_by_key(|m| (m.created_at, m.id));
    let skip = messages.len().saturating_sub(limit);

    let lines = messages
        .iter()
        .skip(skip)
        .map(|m| {
            format!(
                "[{}] {}: {}",
                m.created_at.format(LINE_TIME_FORMAT),
                m.author_tag,
                m.content
            )
        })
        .collect();

    Transcript { lines }
}

/// `2d 3h`, `5h 12m`, `4m 30s`, `42s`
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Summary posted alongside the transcript file
pub fn transcript_summary(ticket: &Ticket, transcript: &Transcript) -> OutgoingMessage {
    let closed_at = ticket.closed_at.unwrap_or(ticket.created_at);
    let closer = ticket
        .closed_by
        .map(|id| id.mention_user())
        .unwrap_or_else(|| "Unknown".to_string());

    let mut msg = OutgoingMessage::notice("Ticket Transcript")
        .with_field("User", ticket.user_id.mention_user(), true)
        .with_field("Type", ticket.ticket_type.title(), true)
        .with_field("Opened", format_time(ticket.created_at), true)
        .with_field("Closed", format_time(closed_at), true)
        .with_field("Closed By", closer, true)
        .with_field("Duration", format_duration(closed_at - ticket.created_at), true);

    if let Some(staff) = ticket.claimed_by {
        msg = msg.with_field("Claimed By", staff.mention_user(), true);
    }

    msg.with_footer(format!("Ticket ID: {} | {} messages", ticket.id, transcript.len()))
        .with_attachment(Transcript::filename(ticket.id), transcript.text().into_bytes())
}

/// Archives a closed ticket's channel history
pub struct TranscriptArchiver<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> TranscriptArchiver<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Post the transcript; returns the sink message id, or `None` when the
    /// guild has no transcript channel
    #[instrument(skip(self, ticket, settings), fields(ticket_id = %ticket.id))]
    pub async fn archive(
        &self,
        ticket: &Ticket,
        settings: &TicketSettings,
    ) -> ServiceResult<Option<Snowflake>> {
        let Some(sink) = settings.transcript_channel_id else {
            info!("No transcript channel configured; skipping archival");
            return Ok(None);
        };

        let limit = self.ctx.timings().transcript_limit;
        let messages = self
            .ctx
            .platform()
            .fetch_recent_messages(ticket.id, limit)
            .await?;
        let transcript = render_transcript(messages, usize::from(limit));

        let message_id = self
            .ctx
            .platform()
            .send_message(sink, &transcript_summary(ticket, &transcript))
            .await?;

        info!(
            sink = %sink,
            message_id = %message_id,
            lines = transcript.len(),
            "Transcript archived"
        );
        Ok(Some(message_id))
    }
}
