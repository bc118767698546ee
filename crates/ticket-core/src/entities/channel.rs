//! Channel provisioning types - what the platform is asked to create

use serde::{Deserialize, Serialize};

use crate::entities::TicketType;
use crate::value_objects::{Permissions, Snowflake};

/// Maximum channel name length accepted by the platform
const MAX_CHANNEL_NAME: usize = 100;

/// Overwrite target kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwriteKind {
    Role,
    Member,
}

impl OverwriteKind {
    /// Wire value used by the platform
    #[inline]
    pub fn as_i16(self) -> i16 {
        match self {
            Self::Role => 0,
            Self::Member => 1,
        }
    }
}

/// Per-channel permission override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverwrite {
    pub target_id: Snowflake,
    pub kind: OverwriteKind,
    pub allow: Permissions,
    pub deny: Permissions,
}

impl PermissionOverwrite {
    pub fn allow_member(target_id: Snowflake, allow: Permissions) -> Self {
        Self {
            target_id,
            kind: OverwriteKind::Member,
            allow,
            deny: Permissions::empty(),
        }
    }

    pub fn allow_role(target_id: Snowflake, allow: Permissions) -> Self {
        Self {
            target_id,
            kind: OverwriteKind::Role,
            allow,
            deny: Permissions::empty(),
        }
    }

    pub fn deny_role(target_id: Snowflake, deny: Permissions) -> Self {
        Self {
            target_id,
            kind: OverwriteKind::Role,
            allow: Permissions::empty(),
            deny,
        }
    }
}

/// Request to create a private ticket channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub guild_id: Snowflake,
    pub name: String,
    pub parent_id: Option<Snowflake>,
    pub overwrites: Vec<PermissionOverwrite>,
}

impl ChannelSpec {
    /// Private channel visible only to the owner, the bot and staff
    ///
    /// The guild's default role shares the guild id.
    pub fn private_ticket(
        guild_id: Snowflake,
        name: String,
        category_id: Snowflake,
        owner_id: Snowflake,
        bot_id: Snowflake,
        staff_role_id: Option<Snowflake>,
    ) -> Self {
        let mut overwrites = vec![
            PermissionOverwrite::deny_role(guild_id, Permissions::VIEW_CHANNEL),
            PermissionOverwrite::allow_member(owner_id, Permissions::TICKET_OWNER),
            PermissionOverwrite::allow_member(bot_id, Permissions::TICKET_BOT),
        ];
        if let Some(role_id) = staff_role_id {
            overwrites.push(PermissionOverwrite::allow_role(
                role_id,
                Permissions::TICKET_STAFF,
            ));
        }

        Self {
            guild_id,
            name,
            parent_id: Some(category_id),
            overwrites,
        }
    }
}

/// `ticket-<type>-<username>`, lowercased and stripped to `[a-z0-9-]`
pub fn ticket_channel_name(ticket_type: TicketType, username: &str) -> String {
    let raw = format!("ticket-{}-{}", ticket_type.as_str(), username.to_lowercase());
    raw.chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .take(MAX_CHANNEL_NAME)
        .collect()
}
