//! REST implementation of the chat platform port

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, RETRY_AFTER},
    multipart, Client, RequestBuilder, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use ticket_common::{AppError, PlatformConfig};
use ticket_core::{
    ChannelMessage, ChannelSpec, ChatPlatform, DomainError, OutgoingMessage, OverwriteKind,
    Permissions, PlatformResult, Snowflake,
};

use super::payload::{
    ChannelBody, Created, DirectChannelBody, MemberOverwriteBody, MessageBody, MessageWire,
};

const AUDIT_LOG_REASON: &str = "x-audit-log-reason";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
/// Retries after a 429 before giving up
const RATE_LIMIT_RETRIES: u32 = 2;
const MAX_RETRY_AFTER: Duration = Duration::from_secs(10);
/// Page size cap of the message history endpoint
const MAX_FETCH: u8 = 100;

/// Bot-token client for the platform REST API
pub struct RestPlatform {
    client: Client,
    base_url: String,
    authorization: String,
}

impl RestPlatform {
    pub fn new(config: &PlatformConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("ticket-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            authorization: format!("Bot {}", config.bot_token),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request, waiting out rate limits
    ///
    /// `build` is called once per attempt since multipart bodies cannot be
    /// cloned.
    async fn send<F>(&self, what: &str, build: F) -> PlatformResult<Response>
    where
        F: Fn() -> PlatformResult<RequestBuilder> + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            let response = build()?
                .header(AUTHORIZATION, &self.authorization)
                .send()
                .await
                .map_err(|e| delivery(what, e))?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS && attempt < RATE_LIMIT_RETRIES {
                attempt += 1;
                let wait = retry_after(response.headers());
                warn!(what, attempt, wait_ms = wait.as_millis() as u64, "Rate limited by platform");
                tokio::time::sleep(wait).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(DomainError::Delivery(format!(
                    "{what} failed with {status}: {body}"
                )));
            }

            return Ok(response);
        }
    }

    async fn send_json<T, F>(&self, what: &str, build: F) -> PlatformResult<T>
    where
        T: DeserializeOwned,
        F: Fn() -> PlatformResult<RequestBuilder> + Send + Sync,
    {
        self.send(what, build)
            .await?
            .json::<T>()
            .await
            .map_err(|e| delivery(what, e))
    }
}

#[async_trait]
impl ChatPlatform for RestPlatform {
    #[instrument(skip(self, spec), fields(guild_id = %spec.guild_id, name = %spec.name))]
    async fn create_channel(&self, spec: &ChannelSpec) -> PlatformResult<Snowflake> {
        let url = self.url(&format!("/guilds/{}/channels", spec.guild_id));
        let body = ChannelBody::from(spec);

        let created: Created = self
            .send_json("create channel", || Ok(self.client.post(&url).json(&body)))
            .await?;
        debug!(channel_id = %created.id, "Channel created");
        Ok(created.id)
    }

    #[instrument(skip(self))]
    async fn delete_channel(&self, channel_id: Snowflake, reason: &str) -> PlatformResult<()> {
        let url = self.url(&format!("/channels/{channel_id}"));
        let reason = HeaderValue::from_str(reason).ok();

        self.send("delete channel", || {
            let request = self.client.delete(&url);
            Ok(match &reason {
                Some(value) => request.header(AUDIT_LOG_REASON, value.clone()),
                None => request,
            })
        })
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn grant_member(
        &self,
        channel_id: Snowflake,
        member_id: Snowflake,
        allow: Permissions,
    ) -> PlatformResult<()> {
        let url = self.url(&format!("/channels/{channel_id}/permissions/{member_id}"));
        let body = MemberOverwriteBody {
            kind: OverwriteKind::Member.as_i16(),
            allow,
            deny: Permissions::empty(),
        };

        self.send("grant member", || Ok(self.client.put(&url).json(&body)))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, message))]
    async fn send_message(
        &self,
        channel_id: Snowflake,
        message: &OutgoingMessage,
    ) -> PlatformResult<Snowflake> {
        let url = self.url(&format!("/channels/{channel_id}/messages"));
        let body = MessageBody::from(message);

        let created: Created = match &message.attachment {
            None => {
                self.send_json("send message", || Ok(self.client.post(&url).json(&body)))
                    .await?
            }
            Some(attachment) => {
                let payload =
                    serde_json::to_string(&body).map_err(|e| delivery("send message", e))?;
                self.send_json("send message", || {
                    let file = multipart::Part::bytes(attachment.data.clone())
                        .file_name(attachment.filename.clone())
                        .mime_str("text/plain")
                        .map_err(|e| delivery("send message", e))?;
                    let form = multipart::Form::new()
                        .text("payload_json", payload.clone())
                        .part("files[0]", file);
                    Ok(self.client.post(&url).multipart(form))
                })
                .await?
            }
        };
        Ok(created.id)
    }

    #[instrument(skip(self, message))]
    async fn send_direct(
        &self,
        user_id: Snowflake,
        message: &OutgoingMessage,
    ) -> PlatformResult<Snowflake> {
        let url = self.url("/users/@me/channels");
        let body = DirectChannelBody {
            recipient_id: user_id,
        };

        let channel: Created = self
            .send_json("open direct channel", || Ok(self.client.post(&url).json(&body)))
            .await?;
        self.send_message(channel.id, message).await
    }

    async fn fetch_recent_messages(
        &self,
        channel_id: Snowflake,
        limit: u8,
    ) -> PlatformResult<Vec<ChannelMessage>> {
        let url = self.url(&format!("/channels/{channel_id}/messages"));
        let limit = limit.clamp(1, MAX_FETCH);

        let messages: Vec<MessageWire> = self
            .send_json("fetch messages", || {
                Ok(self.client.get(&url).query(&[("limit", limit)]))
            })
            .await?;
        Ok(messages.into_iter().map(ChannelMessage::from).collect())
    }
}

impl fmt::Debug for RestPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestPlatform")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn delivery(what: &str, err: impl fmt::Display) -> DomainError {
    DomainError::Delivery(format!("{what}: {err}"))
}

/// Seconds from `Retry-After`, capped; one second when absent or garbled
fn retry_after(headers: &HeaderMap) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map_or(Duration::from_secs(1), |secs| {
            Duration::from_secs_f64(secs).min(MAX_RETRY_AFTER)
        })
}
