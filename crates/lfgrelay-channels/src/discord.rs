//! Discord channel — message, reaction and webhook calls via the REST API.

use async_trait::async_trait;
use lfgrelay_core::config::DiscordConfig;
use lfgrelay_core::error::{LfgError, Result};
use lfgrelay_core::traits::MessagePlatform;
use lfgrelay_core::types::{ChannelId, MessageId, WebhookPayload};
use serde::{Deserialize, Serialize};

/// Discord REST adapter. One HTTP client shared by every call.
pub struct DiscordPlatform {
    config: DiscordConfig,
    client: reqwest::Client,
}

impl DiscordPlatform {
    pub fn new(config: DiscordConfig) -> Result<Self> {
        if config.bot_token.is_empty() {
            return Err(LfgError::Config("discord.bot_token is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LfgError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn message_url(&self, channel: ChannelId, message: MessageId) -> String {
        self.api_url(&format!("/channels/{channel}/messages/{message}"))
    }

    /// `/channels/{c}/messages/{m}/reactions/{emoji}/@me` with the emoji percent-encoded.
    fn own_reaction_url(
        &self,
        channel: ChannelId,
        message: MessageId,
        marker: &str,
    ) -> Result<reqwest::Url> {
        let base = format!("{}/reactions", self.message_url(channel, message));
        let mut url = reqwest::Url::parse(&base)
            .map_err(|e| LfgError::Config(format!("Invalid Discord API base: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| LfgError::Config("Discord API base cannot take path segments".into()))?
            .push(marker)
            .push("@me");
        Ok(url)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("Authorization", format!("Bot {}", self.config.bot_token))
    }

    async fn execute(&self, req: reqwest::RequestBuilder, op: &str) -> Result<reqwest::Response> {
        let response = req
            .send()
            .await
            .map_err(|e| LfgError::Http(format!("Discord {op} failed: {e}")))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status.as_u16(), &body, op))
    }
}

/// Map a non-success Discord response onto the error taxonomy.
fn classify_failure(status: u16, body: &str, op: &str) -> LfgError {
    match status {
        429 => {
            let retry_after_ms = serde_json::from_str::<RateLimitBody>(body)
                .map(|b| (b.retry_after * 1000.0).ceil() as u64)
                .unwrap_or(1000);
            LfgError::RateLimited { retry_after_ms }
        }
        500..=599 => LfgError::Http(format!("Discord {op} error {status}: {body}")),
        _ => LfgError::Platform(format!("Discord {op} error {status}: {body}")),
    }
}

#[async_trait]
impl MessagePlatform for DiscordPlatform {
    fn name(&self) -> &str {
        "discord"
    }

    async fn send(&self, channel: ChannelId, content: &str) -> Result<MessageId> {
        let req = self
            .client
            .post(self.api_url(&format!("/channels/{channel}/messages")))
            .json(&serde_json::json!({ "content": content }));
        let response = self.execute(self.authed(req), "send").await?;
        let message: DiscordMessage = response
            .json()
            .await
            .map_err(|e| LfgError::Platform(format!("Invalid send response: {e}")))?;
        message.message_id()
    }

    async fn edit(&self, channel: ChannelId, message: MessageId, content: &str) -> Result<()> {
        let req = self
            .client
            .patch(self.message_url(channel, message))
            .json(&serde_json::json!({ "content": content }));
        self.execute(self.authed(req), "edit").await?;
        Ok(())
    }

    async fn clear_reactions(&self, channel: ChannelId, message: MessageId) -> Result<()> {
        let req = self
            .client
            .delete(format!("{}/reactions", self.message_url(channel, message)));
        self.execute(self.authed(req), "clear_reactions").await?;
        Ok(())
    }

    async fn add_reaction(&self, channel: ChannelId, message: MessageId, marker: &str) -> Result<()> {
        let url = self.own_reaction_url(channel, message, marker)?;
        // Discord rejects PUT without a Content-Length.
        let req = self.client.put(url).header("Content-Length", "0");
        self.execute(self.authed(req), "add_reaction").await?;
        Ok(())
    }

    async fn get_reaction_count(
        &self,
        channel: ChannelId,
        message: MessageId,
        marker: &str,
    ) -> Result<Option<u32>> {
        let req = self.client.get(self.message_url(channel, message));
        let response = self.execute(self.authed(req), "get_message").await?;
        let message: DiscordMessage = response
            .json()
            .await
            .map_err(|e| LfgError::Platform(format!("Invalid message response: {e}")))?;
        Ok(message.reaction_count(marker))
    }

    async fn execute_webhook(&self, url: &str, payload: &WebhookPayload) -> Result<()> {
        // Webhook URLs carry their own token; no bot auth header.
        let req = self.client.post(url).json(payload);
        self.execute(req, "webhook").await?;
        Ok(())
    }
}

// --- Discord API Types ---

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordMessage {
    pub id: String,
    #[serde(default)]
    pub reactions: Vec<DiscordReaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordReaction {
    pub count: u32,
    pub emoji: DiscordEmoji,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordEmoji {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl DiscordEmoji {
    /// Unicode emoji match by name; custom emoji also by `name:id`.
    fn matches(&self, marker: &str) -> bool {
        match (&self.name, &self.id) {
            (Some(name), Some(id)) => name == marker || format!("{name}:{id}") == marker,
            (Some(name), None) => name == marker,
            _ => false,
        }
    }
}

impl DiscordMessage {
    fn message_id(&self) -> Result<MessageId> {
        self.id
            .parse()
            .map_err(|_| LfgError::Platform(format!("Invalid message id: {}", self.id)))
    }

    /// Count of the reaction matching `marker`, if present.
    pub fn reaction_count(&self, marker: &str) -> Option<u32> {
        self.reactions
            .iter()
            .find(|r| r.emoji.matches(marker))
            .map(|r| r.count)
    }
}
