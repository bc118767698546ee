//! Keyed interaction dispatch
//!
//! Buttons carry a custom id encoding what they act on. The registry maps
//! `(kind, ticket_id)` to a registration so a click is looked up by key
//! instead of by a listener tied to a live channel. The ticket store stays
//! the authority for state; the registry only routes and expires.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use ticket_core::{DomainError, Rating, Snowflake, TicketType};

/// Button kinds that address a single ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    Claim,
    Close,
    Feedback,
}

impl InteractionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Claim => "claim",
            Self::Close => "close",
            Self::Feedback => "feedback",
        }
    }
}

/// Parsed component custom id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomId {
    /// Type selection panel
    Create,
    /// Details form for report/application tickets
    Details(TicketType),
    Claim(Snowflake),
    Close(Snowflake),
    Feedback(Snowflake, Rating),
}

impl CustomId {
    /// Registry key for ticket-scoped ids
    pub fn key(&self) -> Option<(InteractionKind, Snowflake)> {
        match *self {
            Self::Claim(id) => Some((InteractionKind::Claim, id)),
            Self::Close(id) => Some((InteractionKind::Close, id)),
            Self::Feedback(id, _) => Some((InteractionKind::Feedback, id)),
            Self::Create | Self::Details(_) => None,
        }
    }
}

impl fmt::Display for CustomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("ticket:create"),
            Self::Details(ticket_type) => write!(f, "ticket:details:{ticket_type}"),
            Self::Claim(id) => write!(f, "ticket:claim:{id}"),
            Self::Close(id) => write!(f, "ticket:close:{id}"),
            Self::Feedback(id, rating) => write!(f, "ticket:feedback:{id}:{}", rating.value()),
        }
    }
}

impl FromStr for CustomId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || DomainError::UnknownInteraction(s.to_string());
        let parse_id = |raw: &str| Snowflake::parse(raw).map_err(|_| unknown());

        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            ["ticket", "create"] => Ok(Self::Create),
            ["ticket", "details", kind] => kind
                .parse::<TicketType>()
                .map(Self::Details)
                .map_err(|_| unknown()),
            ["ticket", "claim", id] => Ok(Self::Claim(parse_id(id)?)),
            ["ticket", "close", id] => Ok(Self::Close(parse_id(id)?)),
            ["ticket", "feedback", id, rating] => {
                let rating = rating
                    .parse::<i16>()
                    .ok()
                    .and_then(Rating::from_value)
                    .ok_or_else(unknown)?;
                Ok(Self::Feedback(parse_id(id)?, rating))
            }
            _ => Err(unknown()),
        }
    }
}

/// What a registered key accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Registration {
    /// Only this user may use the key
    pub allowed_user: Option<Snowflake>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Registration {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: Snowflake, expires_at: DateTime<Utc>) -> Self {
        Self {
            allowed_user: Some(user_id),
            expires_at: Some(expires_at),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Routing table for ticket-scoped buttons
#[derive(Debug, Default)]
pub struct InteractionRegistry {
    entries: DashMap<(InteractionKind, Snowflake), Registration>,
}

impl InteractionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: InteractionKind, ticket_id: Snowflake, registration: Registration) {
        self.entries.insert((kind, ticket_id), registration);
    }

    /// Claim and close buttons for an active ticket
    pub fn register_controls(&self, ticket_id: Snowflake) {
        self.register(InteractionKind::Claim, ticket_id, Registration::open());
        self.register(InteractionKind::Close, ticket_id, Registration::open());
    }

    pub fn remove(&self, kind: InteractionKind, ticket_id: Snowflake) -> Option<Registration> {
        self.entries.remove(&(kind, ticket_id)).map(|(_, r)| r)
    }

    /// Drop the claim and close keys once a ticket is terminal
    pub fn remove_controls(&self, ticket_id: Snowflake) {
        self.remove(InteractionKind::Claim, ticket_id);
        self.remove(InteractionKind::Close, ticket_id);
    }

    pub fn contains(&self, kind: InteractionKind, ticket_id: Snowflake) -> bool {
        self.entries.contains_key(&(kind, ticket_id))
    }

    /// Look up a key for `user_id`
    ///
    /// Absent keys yield `UnknownInteraction`; expired keys are dropped and
    /// yield `InteractionExpired`.
    pub fn resolve(
        &self,
        kind: InteractionKind,
        ticket_id: Snowflake,
        user_id: Snowflake,
        now: DateTime<Utc>,
    ) -> Result<Registration, DomainError> {
        let registration = self
            .entries
            .get(&(kind, ticket_id))
            .map(|entry| *entry.value())
            .ok_or_else(|| {
                DomainError::UnknownInteraction(format!("ticket:{}:{ticket_id}", kind.as_str()))
            })?;

        if registration.is_expired(now) {
            self.entries.remove(&(kind, ticket_id));
            return Err(DomainError::InteractionExpired);
        }
        if registration.allowed_user.is_some_and(|allowed| allowed != user_id) {
            return Err(DomainError::MissingPermission("ticket owner".to_string()));
        }
        Ok(registration)
    }

    /// Remove every expired registration; returns how many were dropped
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, registration| !registration.is_expired(now));
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            debug!(purged, "Purged expired interaction keys");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
