//! In-process chat platform.
//!
//! Backs `--dry-run` and the engine/relay tests. Messages, reactions and webhook
//! posts live in memory; failures can be injected per channel, per message and
//! per webhook URL.

use async_trait::async_trait;
use lfgrelay_core::error::{LfgError, Result};
use lfgrelay_core::traits::MessagePlatform;
use lfgrelay_core::types::{ChannelId, MessageId, WebhookPayload};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// A message held by [`MemoryPlatform`].
#[derive(Debug, Clone, Default)]
pub struct MemoryMessage {
    pub channel: ChannelId,
    pub content: String,
    /// Marker → count, bot reaction included.
    pub reactions: HashMap<String, u32>,
    /// How many times reactions were cleared.
    pub clears: u32,
    /// Every content the message was edited to, oldest first.
    pub edits: Vec<String>,
}

#[derive(Default)]
struct MemoryState {
    messages: HashMap<MessageId, MemoryMessage>,
    sent: Vec<(ChannelId, MessageId)>,
    failing_channels: HashSet<ChannelId>,
    failing_messages: HashSet<MessageId>,
    /// URL → remaining transient failures.
    flaky_webhooks: HashMap<String, u32>,
    rejected_webhooks: HashSet<String>,
    webhook_attempts: HashMap<String, u32>,
    deliveries: Vec<(String, WebhookPayload)>,
}

/// In-memory [`MessagePlatform`].
pub struct MemoryPlatform {
    state: Mutex<MemoryState>,
    next_id: AtomicU64,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            next_id: AtomicU64::new(1000),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every call against `channel` fails from now on.
    pub fn fail_channel(&self, channel: ChannelId) {
        self.state().failing_channels.insert(channel);
    }

    /// Every call against `message` fails from now on.
    pub fn fail_message(&self, message: MessageId) {
        self.state().failing_messages.insert(message);
    }

    pub fn recover_message(&self, message: MessageId) {
        self.state().failing_messages.remove(&message);
    }

    /// Overwrite the observed count for `marker` on a message.
    pub fn set_reaction_count(&self, message: MessageId, marker: &str, count: u32) {
        if let Some(msg) = self.state().messages.get_mut(&message) {
            msg.reactions.insert(marker.to_string(), count);
        }
    }

    /// The next `times` posts to `url` fail with a retryable error.
    pub fn fail_webhook(&self, url: &str, times: u32) {
        self.state().flaky_webhooks.insert(url.to_string(), times);
    }

    /// Every post to `url` fails with a permanent error.
    pub fn reject_webhook(&self, url: &str) {
        self.state().rejected_webhooks.insert(url.to_string());
    }

    pub fn message(&self, message: MessageId) -> Option<MemoryMessage> {
        self.state().messages.get(&message).cloned()
    }

    /// Successful sends, in order.
    pub fn sent(&self) -> Vec<(ChannelId, MessageId)> {
        self.state().sent.clone()
    }

    /// Successful webhook posts, in order.
    pub fn deliveries(&self) -> Vec<(String, WebhookPayload)> {
        self.state().deliveries.clone()
    }

    pub fn webhook_attempts(&self, url: &str) -> u32 {
        self.state().webhook_attempts.get(url).copied().unwrap_or(0)
    }

    fn check(state: &MemoryState, channel: ChannelId, message: Option<MessageId>, op: &str) -> Result<()> {
        if state.failing_channels.contains(&channel) {
            return Err(LfgError::Platform(format!("{op}: channel {channel} unavailable")));
        }
        if let Some(message) = message
            && state.failing_messages.contains(&message)
        {
            return Err(LfgError::Platform(format!("{op}: message {message} unavailable")));
        }
        Ok(())
    }

    fn with_message<T>(
        &self,
        channel: ChannelId,
        message: MessageId,
        op: &str,
        f: impl FnOnce(&mut MemoryMessage) -> T,
    ) -> Result<T> {
        let mut state = self.state();
        Self::check(&state, channel, Some(message), op)?;
        match state.messages.get_mut(&message) {
            Some(msg) if msg.channel == channel => Ok(f(msg)),
            _ => Err(LfgError::Platform(format!("{op}: unknown message {message}"))),
        }
    }
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagePlatform for MemoryPlatform {
    fn name(&self) -> &str {
        "memory"
    }

    async fn send(&self, channel: ChannelId, content: &str) -> Result<MessageId> {
        let mut state = self.state();
        Self::check(&state, channel, None, "send")?;
        let id = MessageId(self.next_id.fetch_add(1, Ordering::Relaxed));
        state.messages.insert(
            id,
            MemoryMessage {
                channel,
                content: content.to_string(),
                ..Default::default()
            },
        );
        state.sent.push((channel, id));
        tracing::debug!("🧪 [memory] #{channel} ← {id}: {content}");
        Ok(id)
    }

    async fn edit(&self, channel: ChannelId, message: MessageId, content: &str) -> Result<()> {
        self.with_message(channel, message, "edit", |msg| {
            msg.content = content.to_string();
            msg.edits.push(content.to_string());
        })
    }

    async fn clear_reactions(&self, channel: ChannelId, message: MessageId) -> Result<()> {
        self.with_message(channel, message, "clear_reactions", |msg| {
            msg.reactions.clear();
            msg.clears += 1;
        })
    }

    async fn add_reaction(&self, channel: ChannelId, message: MessageId, marker: &str) -> Result<()> {
        self.with_message(channel, message, "add_reaction", |msg| {
            *msg.reactions.entry(marker.to_string()).or_insert(0) += 1;
        })
    }

    async fn get_reaction_count(
        &self,
        channel: ChannelId,
        message: MessageId,
        marker: &str,
    ) -> Result<Option<u32>> {
        self.with_message(channel, message, "get_reaction_count", |msg| {
            msg.reactions.get(marker).copied().filter(|c| *c > 0)
        })
    }

    async fn execute_webhook(&self, url: &str, payload: &WebhookPayload) -> Result<()> {
        let mut state = self.state();
        *state.webhook_attempts.entry(url.to_string()).or_insert(0) += 1;
        if state.rejected_webhooks.contains(url) {
            return Err(LfgError::Platform(format!("webhook {url} rejected")));
        }
        if let Some(remaining) = state.flaky_webhooks.get_mut(url)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(LfgError::Http(format!("webhook {url} unavailable")));
        }
        state.deliveries.push((url.to_string(), payload.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_react_and_count() {
        let platform = MemoryPlatform::new();
        let id = platform.send(ChannelId(1), "hello").await.unwrap();
        assert_eq!(platform.get_reaction_count(ChannelId(1), id, "👍").await.unwrap(), None);

        platform.add_reaction(ChannelId(1), id, "👍").await.unwrap();
        assert_eq!(platform.get_reaction_count(ChannelId(1), id, "👍").await.unwrap(), Some(1));

        platform.set_reaction_count(id, "👍", 5);
        assert_eq!(platform.get_reaction_count(ChannelId(1), id, "👍").await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_edit_and_clear_are_recorded() {
        let platform = MemoryPlatform::new();
        let id = platform.send(ChannelId(1), "v1").await.unwrap();
        platform.add_reaction(ChannelId(1), id, "👍").await.unwrap();
        platform.edit(ChannelId(1), id, "v2").await.unwrap();
        platform.clear_reactions(ChannelId(1), id).await.unwrap();

        let msg = platform.message(id).unwrap();
        assert_eq!(msg.content, "v2");
        assert_eq!(msg.edits, vec!["v2".to_string()]);
        assert_eq!(msg.clears, 1);
        assert!(msg.reactions.is_empty());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let platform = MemoryPlatform::new();
        platform.fail_channel(ChannelId(2));
        assert!(platform.send(ChannelId(2), "x").await.is_err());

        let id = platform.send(ChannelId(1), "x").await.unwrap();
        platform.fail_message(id);
        assert!(platform.edit(ChannelId(1), id, "y").await.is_err());
        platform.recover_message(id);
        assert!(platform.edit(ChannelId(1), id, "y").await.is_ok());

        // Wrong channel for a known message.
        assert!(platform.edit(ChannelId(3), id, "z").await.is_err());
    }

    #[tokio::test]
    async fn test_flaky_webhook() {
        let platform = MemoryPlatform::new();
        let payload = WebhookPayload {
            content: "hi".into(),
            username: "ana".into(),
            avatar_url: None,
        };
        platform.fail_webhook("https://hook/1", 1);
        let err = platform.execute_webhook("https://hook/1", &payload).await.unwrap_err();
        assert!(err.is_retryable());
        platform.execute_webhook("https://hook/1", &payload).await.unwrap();
        assert_eq!(platform.webhook_attempts("https://hook/1"), 2);
        assert_eq!(platform.deliveries().len(), 1);
    }
}
