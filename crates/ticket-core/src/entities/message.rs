//! Message types exchanged with the chat platform

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// A message read back from a ticket channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    pub author_id: Snowflake,
    /// Display tag, e.g. `alice` or `alice#0001`
    pub author_tag: String,
    pub author_bot: bool,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    #[default]
    Primary,
    Secondary,
    Success,
    Danger,
}

impl ButtonStyle {
    /// Wire value used by the platform
    pub fn as_i16(self) -> i16 {
        match self {
            Self::Primary => 1,
            Self::Secondary => 2,
            Self::Success => 3,
            Self::Danger => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub data: Vec<u8>,
}

/// A notice the service asks the platform to deliver
///
/// Rendering (embeds, colors) belongs to the platform adapter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutgoingMessage {
    pub content: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<MessageField>,
    pub footer: Option<String>,
    pub buttons: Vec<Button>,
    pub attachment: Option<Attachment>,
}

impl OutgoingMessage {
    /// Plain text message
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Titled notice
    pub fn notice(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_field(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        inline: bool,
    ) -> Self {
        self.fields.push(MessageField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn with_button(
        mut self,
        custom_id: impl Into<String>,
        label: impl Into<String>,
        style: ButtonStyle,
    ) -> Self {
        self.buttons.push(Button {
            custom_id: custom_id.into(),
            label: label.into(),
            style,
        });
        self
    }

    pub fn with_attachment(mut self, filename: impl Into<String>, data: Vec<u8>) -> Self {
        self.attachment = Some(Attachment {
            filename: filename.into(),
            data,
        });
        self
    }

    /// Look up a field value by name
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// All human-readable text, for matching in logs and tests
    pub fn plain_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        parts.extend(self.content.as_deref());
        parts.extend(self.title.as_deref());
        parts.extend(self.description.as_deref());
        for field in &self.fields {
            parts.push(&field.name);
            parts.push(&field.value);
        }
        parts.extend(self.footer.as_deref());
        parts.join("\n")
    }
}
