use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use threadwatch_dispatch::{Channel, Notice, NotificationSink, SinkError};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

// Embed limits from the Discord API docs.
const TITLE_LIMIT: usize = 256;
const DESCRIPTION_LIMIT: usize = 4096;
const FIELD_NAME_LIMIT: usize = 256;
const FIELD_VALUE_LIMIT: usize = 1024;

/// Posts notices as embeds through the Discord bot REST API.
#[derive(Clone)]
pub struct DiscordSink {
    client: Client,
    api_base: String,
    token: String,
    new_thread_channel: String,
    update_channel: String,
}

impl DiscordSink {
    pub fn new(
        token: impl Into<String>,
        new_thread_channel: impl Into<String>,
        update_channel: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SinkError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(SinkError::NotConfigured("discord bot token is empty".to_string()));
        }
        let new_thread_channel = new_thread_channel.into();
        let update_channel = update_channel.into();
        if new_thread_channel.trim().is_empty() || update_channel.trim().is_empty() {
            return Err(SinkError::NotConfigured(
                "discord channel ids must both be set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("threadwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(transport)?;

        Ok(Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            token,
            new_thread_channel,
            update_channel,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn channel_id(&self, channel: Channel) -> &str {
        match channel {
            Channel::NewThreads => &self.new_thread_channel,
            Channel::ThreadUpdates => &self.update_channel,
        }
    }

    fn messages_url(&self, channel: Channel) -> String {
        format!("{}/channels/{}/messages", self.api_base, self.channel_id(channel))
    }
}

impl fmt::Debug for DiscordSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordSink")
            .field("api_base", &self.api_base)
            .field("token", &"<redacted>")
            .field("new_thread_channel", &self.new_thread_channel)
            .field("update_channel", &self.update_channel)
            .finish()
    }
}

#[async_trait]
impl NotificationSink for DiscordSink {
    async fn send(&self, channel: Channel, notice: &Notice) -> Result<(), SinkError> {
        let url = self.messages_url(channel);
        let body = CreateMessage {
            embeds: vec![Embed::from_notice(notice)],
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&raw)
                .map(|err| err.message)
                .unwrap_or(raw);
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        debug!(%channel, status = status.as_u16(), "discord message created");
        Ok(())
    }
}

fn transport(err: reqwest::Error) -> SinkError {
    SinkError::Transport(err.to_string())
}

/// Cuts `text` to at most `limit` characters.
fn clamp(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[derive(Debug, Serialize)]
struct CreateMessage {
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    url: String,
    color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<EmbedField>,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: String,
    value: String,
}

impl Embed {
    fn from_notice(notice: &Notice) -> Self {
        Self {
            title: clamp(&notice.title, TITLE_LIMIT),
            url: notice.url.clone(),
            color: notice.color,
            description: notice
                .description
                .as_deref()
                .map(|d| clamp(d, DESCRIPTION_LIMIT)),
            fields: notice
                .field
                .iter()
                .map(|field| EmbedField {
                    name: clamp(&field.name, FIELD_NAME_LIMIT),
                    value: clamp(&field.value, FIELD_VALUE_LIMIT),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
