//! REST wire payloads
//!
//! Ids and permission sets serialize as decimal strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticket_core::{ChannelMessage, ChannelSpec, OutgoingMessage, Permissions, Snowflake};

/// Guild text channel
const GUILD_TEXT: u8 = 0;
const ACTION_ROW: u8 = 1;
const BUTTON: u8 = 2;
/// Buttons allowed in one action row
const ROW_WIDTH: usize = 5;
const EMBED_COLOR: u32 = 0x5865F2;

/// `POST /guilds/{guild}/channels`
#[derive(Debug, Serialize)]
pub struct ChannelBody {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Snowflake>,
    pub permission_overwrites: Vec<OverwriteBody>,
}

#[derive(Debug, Serialize)]
pub struct OverwriteBody {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub kind: i16,
    pub allow: Permissions,
    pub deny: Permissions,
}

impl From<&ChannelSpec> for ChannelBody {
    fn from(spec: &ChannelSpec) -> Self {
        Self {
            name: spec.name.clone(),
            kind: GUILD_TEXT,
            parent_id: spec.parent_id,
            permission_overwrites: spec
                .overwrites
                .iter()
                .map(|o| OverwriteBody {
                    id: o.target_id,
                    kind: o.kind.as_i16(),
                    allow: o.allow,
                    deny: o.deny,
                })
                .collect(),
        }
    }
}

/// `PUT /channels/{channel}/permissions/{member}`
#[derive(Debug, Serialize)]
pub struct MemberOverwriteBody {
    #[serde(rename = "type")]
    pub kind: i16,
    pub allow: Permissions,
    pub deny: Permissions,
}

/// `POST /channels/{channel}/messages`
#[derive(Debug, Serialize)]
pub struct MessageBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<EmbedBody>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ActionRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentRef>,
}

#[derive(Debug, Serialize)]
pub struct EmbedBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
}

#[derive(Debug, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    pub kind: u8,
    pub components: Vec<ButtonBody>,
}

#[derive(Debug, Serialize)]
pub struct ButtonBody {
    #[serde(rename = "type")]
    pub kind: u8,
    pub style: i16,
    pub label: String,
    pub custom_id: String,
}

/// Points the message at multipart part `files[{id}]`
#[derive(Debug, Serialize)]
pub struct AttachmentRef {
    pub id: u32,
    pub filename: String,
}

impl From<&OutgoingMessage> for MessageBody {
    fn from(message: &OutgoingMessage) -> Self {
        let has_embed = message.title.is_some()
            || message.description.is_some()
            || message.footer.is_some()
            || !message.fields.is_empty();

        let embeds = if has_embed {
            vec![EmbedBody {
                title: message.title.clone(),
                description: message.description.clone(),
                color: EMBED_COLOR,
                fields: message
                    .fields
                    .iter()
                    .map(|f| EmbedField {
                        name: f.name.clone(),
                        value: f.value.clone(),
                        inline: f.inline,
                    })
                    .collect(),
                footer: message.footer.clone().map(|text| EmbedFooter { text }),
            }]
        } else {
            Vec::new()
        };

        let components = message
            .buttons
            .chunks(ROW_WIDTH)
            .map(|row| ActionRow {
                kind: ACTION_ROW,
                components: row
                    .iter()
                    .map(|b| ButtonBody {
                        kind: BUTTON,
                        style: b.style.as_i16(),
                        label: b.label.clone(),
                        custom_id: b.custom_id.clone(),
                    })
                    .collect(),
            })
            .collect();

        let attachments = message
            .attachment
            .iter()
            .map(|a| AttachmentRef {
                id: 0,
                filename: a.filename.clone(),
            })
            .collect();

        Self {
            content: message.content.clone(),
            embeds,
            components,
            attachments,
        }
    }
}

/// `POST /users/@me/channels`
#[derive(Debug, Serialize)]
pub struct DirectChannelBody {
    pub recipient_id: Snowflake,
}

/// Any created object; only the id is read
#[derive(Debug, Deserialize)]
pub struct Created {
    pub id: Snowflake,
}

#[derive(Debug, Deserialize)]
pub struct MessageWire {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    pub author: AuthorWire,
    #[serde(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AuthorWire {
    pub id: Snowflake,
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl AuthorWire {
    /// `name#1234` for legacy accounts, bare `name` otherwise
    pub fn tag(&self) -> String {
        match self.discriminator.as_deref() {
            Some(d) if !d.is_empty() && d != "0" => format!("{}#{}", self.username, d),
            _ => self.username.clone(),
        }
    }
}

impl From<MessageWire> for ChannelMessage {
    fn from(wire: MessageWire) -> Self {
        Self {
            id: wire.id,
            channel_id: wire.channel_id,
            author_id: wire.author.id,
            author_tag: wire.author.tag(),
            author_bot: wire.author.bot,
            content: wire.content,
            created_at: wire.timestamp,
        }
    }
}
