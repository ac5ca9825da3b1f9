//! Capability surface consumed from the chat platform.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChannelId, MessageId, WebhookPayload};

/// Message operations the BigLFG engine and the relay need from a chat platform.
///
/// Every call is a potential network round trip. Implementations should not retry
/// internally; callers decide whether a failure is worth retrying.
#[async_trait]
pub trait MessagePlatform: Send + Sync {
    /// Platform name for logs.
    fn name(&self) -> &str;

    /// Post a message and return its id.
    async fn send(&self, channel: ChannelId, content: &str) -> Result<MessageId>;

    /// Replace a message's content.
    async fn edit(&self, channel: ChannelId, message: MessageId, content: &str) -> Result<()>;

    /// Remove every reaction from a message.
    async fn clear_reactions(&self, channel: ChannelId, message: MessageId) -> Result<()>;

    /// React to a message as the bot.
    async fn add_reaction(&self, channel: ChannelId, message: MessageId, marker: &str) -> Result<()>;

    /// Current count of `marker` reactions, bot included. `None` when nobody reacted with it.
    async fn get_reaction_count(
        &self,
        channel: ChannelId,
        message: MessageId,
        marker: &str,
    ) -> Result<Option<u32>>;

    /// Post through a channel webhook.
    async fn execute_webhook(&self, url: &str, payload: &WebhookPayload) -> Result<()>;
}

/// Source of the channels a BigLFG prompt is broadcast to.
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    async fn list_registered_channels(&self) -> Vec<ChannelId>;
}
