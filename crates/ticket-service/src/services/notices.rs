//! Notices posted into ticket channels and direct messages

use chrono::{DateTime, Duration, Utc};
use ticket_core::{ButtonStyle, OutgoingMessage, Rating, Snowflake, Ticket, TicketSettings, TicketType};

use super::interactions::CustomId;
use super::transcript::format_duration;

/// Timestamp format used in notice fields
const NOTICE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

pub fn format_time(at: DateTime<Utc>) -> String {
    at.format(NOTICE_TIME_FORMAT).to_string()
}

/// First message in a new ticket channel, carrying the close and claim buttons
pub fn welcome(ticket: &Ticket, settings: &TicketSettings) -> OutgoingMessage {
    let mut mentions = ticket.user_id.mention_user();
    if let Some(role) = settings.staff_role_id {
        mentions.push(' ');
        mentions.push_str(&role.mention_role());
    }

    let mut msg = OutgoingMessage::notice(format!(
        "Welcome to your {} ticket!",
        ticket.ticket_type.as_str()
    ))
    .with_content(mentions)
    .with_description(settings.welcome_message.clone())
    .with_field("User", ticket.user_id.mention_user(), true)
    .with_field("Created", format_time(ticket.created_at), true);

    if let Some(reason) = &ticket.reason {
        let label = match ticket.ticket_type {
            TicketType::Application => "Application",
            _ => "Report Target",
        };
        msg = msg.with_field(label, reason.clone(), false);
    }
    if let Some(description) = &ticket.description {
        msg = msg.with_field("Description", description.clone(), false);
    }

    msg.with_footer(format!("Ticket ID: {}", ticket.id))
        .with_button(CustomId::Close(ticket.id).to_string(), "Close", ButtonStyle::Danger)
        .with_button(CustomId::Claim(ticket.id).to_string(), "Claim", ButtonStyle::Success)
}

pub fn claimed(staff_id: Snowflake) -> OutgoingMessage {
    OutgoingMessage::notice("Ticket Claimed")
        .with_description(format!("Ticket claimed by {}", staff_id.mention_user()))
}

pub fn closing(auto: bool, delete_delay: std::time::Duration) -> OutgoingMessage {
    let description = if auto {
        "Closing due to inactivity...".to_string()
    } else {
        format!("Closing this ticket in {} seconds...", delete_delay.as_secs())
    };
    OutgoingMessage::notice("Ticket Closing").with_description(description)
}

pub fn inactivity_warning(owner: Snowflake, grace: Duration) -> OutgoingMessage {
    OutgoingMessage::text(format!(
        "{} This ticket will be closed in {} due to inactivity.",
        owner.mention_user(),
        describe_span(grace)
    ))
}

/// Rating request sent to the owner after close
pub fn feedback_request(ticket: &Ticket, duration: Duration) -> OutgoingMessage {
    let mut msg = OutgoingMessage::notice("Thank you for using our ticket system!")
        .with_description("How would you rate the support you received?")
        .with_field("Ticket Type", ticket.ticket_type.title(), true)
        .with_field("Duration", format_duration(duration), true);

    for rating in Rating::ALL {
        let style = match rating {
            Rating::Excellent => ButtonStyle::Success,
            Rating::Average => ButtonStyle::Primary,
            Rating::Poor => ButtonStyle::Danger,
        };
        msg = msg.with_button(
            CustomId::Feedback(ticket.id, rating).to_string(),
            rating.label(),
            style,
        );
    }
    msg
}

/// "1 hour", "3 hours", "30 minutes"
fn describe_span(span: Duration) -> String {
    let hours = span.num_hours();
    if hours >= 1 && span == Duration::hours(hours) {
        if hours == 1 {
            "1 hour".to_string()
        } else {
            format!("{hours} hours")
        }
    } else {
        let minutes = span.num_minutes().max(1);
        if minutes == 1 {
            "1 minute".to_string()
        } else {
            format!("{minutes} minutes")
        }
    }
}
