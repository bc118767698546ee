//! Permission bitflags for channel overwrites and member checks
//!
//! Bit positions follow the chat platform's wire format so values can be
//! sent as-is in permission overwrites.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

bitflags! {
    /// Platform permission flags
    ///
    /// Serialized as a decimal string in JSON, matching the platform API.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u64 {
        /// Bypass all permission checks
        const ADMINISTRATOR    = 1 << 3;
        /// Create, edit, delete channels
        const MANAGE_CHANNELS  = 1 << 4;
        /// Edit guild settings
        const MANAGE_GUILD     = 1 << 5;
        /// View channel and read messages
        const VIEW_CHANNEL     = 1 << 10;
        /// Send messages in text channels
        const SEND_MESSAGES    = 1 << 11;
        /// Delete other users' messages
        const MANAGE_MESSAGES  = 1 << 13;
        /// Post link previews
        const EMBED_LINKS      = 1 << 14;
        /// Upload files and images
        const ATTACH_FILES     = 1 << 15;

        /// Granted to the ticket opener on their channel
        const TICKET_OWNER = Self::VIEW_CHANNEL.bits()
            | Self::SEND_MESSAGES.bits()
            | Self::ATTACH_FILES.bits()
            | Self::EMBED_LINKS.bits();

        /// Granted to the bot on every ticket channel
        const TICKET_BOT = Self::VIEW_CHANNEL.bits()
            | Self::MANAGE_CHANNELS.bits()
            | Self::SEND_MESSAGES.bits();

        /// Granted to the staff role, and to a staff member on claim
        const TICKET_STAFF = Self::VIEW_CHANNEL.bits()
            | Self::SEND_MESSAGES.bits()
            | Self::MANAGE_MESSAGES.bits();
    }
}

impl Permissions {
    /// Check if the permission set contains a required permission
    ///
    /// Administrators bypass all permission checks.
    #[inline]
    pub fn has(&self, permission: Permissions) -> bool {
        if self.contains(Permissions::ADMINISTRATOR) {
            return true;
        }
        self.contains(permission)
    }

    /// Check if the permission set has any of the given permissions
    #[inline]
    pub fn has_any(&self, permissions: Permissions) -> bool {
        if self.contains(Permissions::ADMINISTRATOR) {
            return true;
        }
        self.intersects(permissions)
    }

    /// Parse from string representation (decimal number)
    pub fn parse(s: &str) -> Result<Self, std::num::ParseIntError> {
        s.parse::<u64>().map(Permissions::from_bits_truncate)
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Permissions::empty()
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

impl Serialize for Permissions {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.bits().to_string())
    }
}

// Deserialize from string or number
impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct PermissionsVisitor;

        impl Visitor<'_> for PermissionsVisitor {
            type Value = Permissions;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or integer representing permission bits")
            }

            fn visit_i64<E>(self, value: i64) -> Result<Permissions, E>
            where
                E: de::Error,
            {
                Ok(Permissions::from_bits_truncate(value as u64))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Permissions, E>
            where
                E: de::Error,
            {
                Ok(Permissions::from_bits_truncate(value))
            }

            fn visit_str<E>(self, value: &str) -> Result<Permissions, E>
            where
                E: de::Error,
            {
                Permissions::parse(value).map_err(|_| de::Error::custom("invalid permissions string"))
            }
        }

        deserializer.deserialize_any(PermissionsVisitor)
    }
}
