//! Relay fan-out — forwards a message from one registered channel to every
//! other registered channel that shares its topic filter, via webhooks.

use std::sync::Arc;

use lfgrelay_core::traits::MessagePlatform;
use lfgrelay_core::types::{ChannelId, InboundMessage, WebhookPayload};

use crate::registry::{ChannelRegistry, Registration};
use crate::retry::RetryPolicy;

/// Discord caps webhook usernames at 80 characters.
const MAX_USERNAME_CHARS: usize = 80;

/// Outcome of relaying one inbound message.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RelayReport {
    pub delivered: Vec<ChannelId>,
    pub failed: Vec<(ChannelId, String)>,
}

impl RelayReport {
    pub fn is_empty(&self) -> bool {
        self.delivered.is_empty() && self.failed.is_empty()
    }
}

pub struct RelayFanout {
    platform: Arc<dyn MessagePlatform>,
    registry: Arc<ChannelRegistry>,
    retry: RetryPolicy,
}

impl RelayFanout {
    pub fn new(
        platform: Arc<dyn MessagePlatform>,
        registry: Arc<ChannelRegistry>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            platform,
            registry,
            retry,
        }
    }

    /// Channels an inbound message should reach. Empty for bot/webhook posts and
    /// for messages from unregistered channels.
    pub fn destinations(&self, inbound: &InboundMessage) -> Vec<Registration> {
        if inbound.author_is_bot || inbound.from_webhook || inbound.content.trim().is_empty() {
            return Vec::new();
        }
        let Some(source) = self.registry.get(inbound.channel_id) else {
            return Vec::new();
        };
        self.registry
            .channels_for_filter(&source.filter)
            .into_iter()
            .filter(|r| r.channel_id != inbound.channel_id && r.guild_id != inbound.guild_id)
            .collect()
    }

    /// Deliver to every destination. One destination failing never stops the others.
    pub async fn relay(&self, inbound: &InboundMessage) -> RelayReport {
        let destinations = self.destinations(inbound);
        let mut report = RelayReport::default();
        if destinations.is_empty() {
            return report;
        }

        let source_name = self
            .registry
            .get(inbound.channel_id)
            .map(|r| r.guild_name)
            .unwrap_or_default();
        let payload = WebhookPayload {
            content: inbound.content.clone(),
            username: webhook_username(&inbound.author_name, &source_name),
            avatar_url: inbound.author_avatar_url.clone(),
        };

        for dest in destinations {
            let label = format!("relay → #{}", dest.channel_id);
            let result = self
                .retry
                .run(&label, || self.platform.execute_webhook(&dest.webhook_url, &payload))
                .await;
            match result {
                Ok(()) => report.delivered.push(dest.channel_id),
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Relay from #{} to #{} ({}) failed: {e}",
                        inbound.channel_id,
                        dest.channel_id,
                        dest.guild_name
                    );
                    report.failed.push((dest.channel_id, e.to_string()));
                }
            }
        }

        tracing::info!(
            "📨 Relayed message from #{}: {} delivered, {} failed",
            inbound.channel_id,
            report.delivered.len(),
            report.failed.len()
        );
        report
    }
}

fn webhook_username(author: &str, guild_name: &str) -> String {
    let name = if guild_name.is_empty() {
        author.to_string()
    } else {
        format!("{author} • {guild_name}")
    };
    name.chars().take(MAX_USERNAME_CHARS).collect()
}
