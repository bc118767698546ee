//! Ticket entity - one support conversation backed by a private channel

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Ticket category chosen from the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketType {
    Support,
    Report,
    Application,
    Other,
}

impl TicketType {
    pub const ALL: [TicketType; 4] = [
        TicketType::Support,
        TicketType::Report,
        TicketType::Application,
        TicketType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Support => "support",
            Self::Report => "report",
            Self::Application => "application",
            Self::Other => "other",
        }
    }

    /// Panel option label
    pub fn label(self) -> &'static str {
        match self {
            Self::Support => "General Support",
            Self::Report => "Report User/Issue",
            Self::Application => "Application",
            Self::Other => "Other",
        }
    }

    /// Capitalized name used in notices ("Support ticket created")
    pub fn title(self) -> &'static str {
        match self {
            Self::Support => "Support",
            Self::Report => "Report",
            Self::Application => "Application",
            Self::Other => "Other",
        }
    }

    /// Report and application tickets collect a reason and description first
    pub fn requires_details(self) -> bool {
        matches!(self, Self::Report | Self::Application)
    }

    /// Label for the short "reason" field of the details form
    pub fn reason_label(self) -> &'static str {
        match self {
            Self::Application => "Position applying for",
            _ => "Who/what are you reporting?",
        }
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "support" => Ok(Self::Support),
            "report" => Ok(Self::Report),
            "application" => Ok(Self::Application),
            "other" => Ok(Self::Other),
            other => Err(DomainError::ValidationError(format!(
                "Unknown ticket type: {other}"
            ))),
        }
    }
}

/// Lifecycle status
///
/// Transitions are monotonic: `open -> claimed`, and either of those to
/// `closed` or `auto_closed`. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    Claimed,
    Closed,
    AutoClosed,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Claimed => "claimed",
            Self::Closed => "closed",
            Self::AutoClosed => "auto_closed",
        }
    }

    /// Human wording for refusals
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Claimed => "claimed",
            Self::Closed | Self::AutoClosed => "closed",
        }
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::AutoClosed)
    }

    #[inline]
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "claimed" => Ok(Self::Claimed),
            "closed" => Ok(Self::Closed),
            "auto_closed" => Ok(Self::AutoClosed),
            other => Err(DomainError::InternalError(format!(
                "Unknown ticket status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TicketPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for TicketPriority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(DomainError::InternalError(format!(
                "Unknown ticket priority: {other}"
            ))),
        }
    }
}

/// Satisfaction rating offered after close
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Poor = 1,
    Average = 3,
    Excellent = 5,
}

impl Rating {
    pub const ALL: [Rating; 3] = [Rating::Excellent, Rating::Average, Rating::Poor];

    pub fn value(self) -> i16 {
        self as i16
    }

    pub fn from_value(value: i16) -> Option<Self> {
        match value {
            1 => Some(Self::Poor),
            3 => Some(Self::Average),
            5 => Some(Self::Excellent),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Poor => "⭐ Poor",
            Self::Average => "⭐⭐⭐ Average",
            Self::Excellent => "⭐⭐⭐⭐⭐ Excellent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub rating: Rating,
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// Ticket entity
///
/// `id` is the id of the backing channel. Once the status is terminal the
/// record is an audit row: only feedback and the channel deletion mark may
/// still be attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: Snowflake,
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    pub ticket_type: TicketType,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub claimed_by: Option<Snowflake>,
    pub reason: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<Snowflake>,
    pub feedback: Option<Feedback>,
    /// When the inactivity watcher is next due
    pub next_check_at: Option<DateTime<Utc>>,
    /// Set while an inactivity warning is outstanding
    pub warned_at: Option<DateTime<Utc>>,
    /// Set once the closed ticket's channel is gone
    pub channel_deleted_at: Option<DateTime<Utc>>,
}

/// Result of checking whether a staff member may claim a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimCheck {
    Claimable,
    AlreadyClaimed(Snowflake),
}

impl Ticket {
    /// Create a new open ticket
    pub fn new(
        id: Snowflake,
        guild_id: Snowflake,
        user_id: Snowflake,
        ticket_type: TicketType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            guild_id,
            user_id,
            ticket_type,
            status: TicketStatus::Open,
            priority: TicketPriority::default(),
            claimed_by: None,
            reason: None,
            description: None,
            created_at,
            closed_at: None,
            closed_by: None,
            feedback: None,
            next_check_at: None,
            warned_at: None,
            channel_deleted_at: None,
        }
    }

    /// Attach the details collected by the report/application form
    pub fn with_details(mut self, reason: Option<String>, description: Option<String>) -> Self {
        self.reason = reason;
        self.description = description;
        self
    }

    pub fn with_next_check(mut self, at: DateTime<Utc>) -> Self {
        self.next_check_at = Some(at);
        self
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Closed, but the channel has not been deleted yet
    pub fn awaits_channel_deletion(&self) -> bool {
        self.is_terminal() && self.channel_deleted_at.is_none()
    }

    /// Time from creation to close, or to `now` while still active
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        self.closed_at.unwrap_or(now) - self.created_at
    }

    /// Validate a claim attempt against the current record
    pub fn check_claim(&self, staff_id: Snowflake) -> Result<ClaimCheck, DomainError> {
        if self.is_terminal() {
            return Err(DomainError::InvalidTransition {
                status: self.status,
                action: "claim",
            });
        }
        if staff_id == self.user_id {
            return Err(DomainError::SelfClaim);
        }
        match self.claimed_by {
            Some(existing) => Ok(ClaimCheck::AlreadyClaimed(existing)),
            None => Ok(ClaimCheck::Claimable),
        }
    }

    pub fn check_close(&self) -> Result<(), DomainError> {
        if self.is_terminal() {
            return Err(DomainError::InvalidTransition {
                status: self.status,
                action: "close",
            });
        }
        Ok(())
    }

    /// Apply a mutation in memory; stores call this after the guards pass
    pub fn apply(&mut self, mutation: &TicketMutation) {
        match mutation {
            TicketMutation::Claim { staff_id } => {
                self.status = TicketStatus::Claimed;
                self.claimed_by = Some(*staff_id);
            }
            TicketMutation::Close {
                auto,
                closed_by,
                closed_at,
            } => {
                self.status = if *auto {
                    TicketStatus::AutoClosed
                } else {
                    TicketStatus::Closed
                };
                self.closed_by = Some(*closed_by);
                self.closed_at = Some(*closed_at);
                self.next_check_at = None;
            }
            TicketMutation::Watch {
                next_check_at,
                warned_at,
            } => {
                self.next_check_at = *next_check_at;
                self.warned_at = *warned_at;
            }
            TicketMutation::Feedback(feedback) => {
                self.feedback = Some(feedback.clone());
            }
            TicketMutation::ChannelDeleted { deleted_at } => {
                self.channel_deleted_at = Some(*deleted_at);
            }
        }
    }
}

/// A conditional write applied by `TicketRepository::compare_and_update`
///
/// Every mutation is guarded by the expected status. Claim additionally
/// requires no claimant, Feedback requires no prior feedback, and
/// ChannelDeleted only applies once to a closed ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketMutation {
    Claim {
        staff_id: Snowflake,
    },
    Close {
        auto: bool,
        closed_by: Snowflake,
        closed_at: DateTime<Utc>,
    },
    Watch {
        next_check_at: Option<DateTime<Utc>>,
        warned_at: Option<DateTime<Utc>>,
    },
    Feedback(Feedback),
    ChannelDeleted {
        deleted_at: DateTime<Utc>,
    },
}

impl TicketMutation {
    /// Extra guard beyond the status match
    pub fn precondition_holds(&self, ticket: &Ticket) -> bool {
        match self {
            Self::Claim { .. } => ticket.claimed_by.is_none(),
            Self::Feedback(_) => ticket.feedback.is_none(),
            Self::ChannelDeleted { .. } => ticket.awaits_channel_deletion(),
            Self::Close { .. } | Self::Watch { .. } => true,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Claim { .. } => "claim",
            Self::Close { .. } => "close",
            Self::Watch { .. } => "watch",
            Self::Feedback(_) => "feedback",
            Self::ChannelDeleted { .. } => "channel_deleted",
        }
    }
}
