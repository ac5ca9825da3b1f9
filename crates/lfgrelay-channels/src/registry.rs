//! Registered relay channels — file-based, one JSON document.
//! Only written on register/unregister, read once on open.

use async_trait::async_trait;
use lfgrelay_core::error::{LfgError, Result};
use lfgrelay_core::traits::ChannelDirectory;
use lfgrelay_core::types::{ChannelId, GuildId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// A channel taking part in the relay and in BigLFG broadcasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub channel_id: ChannelId,
    pub guild_id: GuildId,
    pub guild_name: String,
    /// Webhook used to post relayed messages into this channel.
    pub webhook_url: String,
    /// Topic filter; messages only flow between channels with the same filter.
    pub filter: String,
}

impl Registration {
    pub fn accepts(&self, filter: &str) -> bool {
        self.filter.eq_ignore_ascii_case(filter)
    }
}

/// Channel registry persisted at a single JSON file.
pub struct ChannelRegistry {
    path: PathBuf,
    entries: RwLock<Vec<Registration>>,
}

impl ChannelRegistry {
    /// Open (or create) the registry file. A missing or unreadable file yields an empty registry.
    pub fn open(path: &Path) -> Self {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        Self {
            path: path.to_path_buf(),
            entries: RwLock::new(load(path)),
        }
    }

    /// Add or replace the registration for a channel.
    pub fn register(&self, registration: Registration) -> Result<()> {
        // Held across the write so concurrent saves land in mutation order.
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.retain(|r| r.channel_id != registration.channel_id);
        tracing::info!(
            "📌 Registered #{} ({}) with filter '{}'",
            registration.channel_id,
            registration.guild_name,
            registration.filter
        );
        entries.push(registration);
        self.save(&entries)
    }

    /// Remove a channel. Errors with `NotFound` if it was not registered.
    pub fn unregister(&self, channel: ChannelId) -> Result<Registration> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let pos = entries
            .iter()
            .position(|r| r.channel_id == channel)
            .ok_or_else(|| LfgError::NotFound(format!("channel {channel} is not registered")))?;
        let removed = entries.remove(pos);
        self.save(&entries)?;
        tracing::info!("📤 Unregistered #{channel}");
        Ok(removed)
    }

    pub fn get(&self, channel: ChannelId) -> Option<Registration> {
        self.read().iter().find(|r| r.channel_id == channel).cloned()
    }

    pub fn list(&self) -> Vec<Registration> {
        self.read().clone()
    }

    /// Registrations sharing `filter`, in registration order.
    pub fn channels_for_filter(&self, filter: &str) -> Vec<Registration> {
        self.read().iter().filter(|r| r.accepts(filter)).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Registration>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn save(&self, entries: &[Registration]) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)?;
        tracing::debug!("💾 Saved {} registrations to {}", entries.len(), self.path.display());
        Ok(())
    }
}

fn load(path: &Path) -> Vec<Registration> {
    if !path.exists() {
        return Vec::new();
    }
    match std::fs::read_to_string(path) {
        Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
            tracing::warn!("⚠️ Failed to parse {}: {e}", path.display());
            Vec::new()
        }),
        Err(e) => {
            tracing::warn!("⚠️ Failed to read {}: {e}", path.display());
            Vec::new()
        }
    }
}

#[async_trait]
impl ChannelDirectory for ChannelRegistry {
    async fn list_registered_channels(&self) -> Vec<ChannelId> {
        self.read().iter().map(|r| r.channel_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(channel: u64, guild: u64, filter: &str) -> Registration {
        Registration {
            channel_id: ChannelId(channel),
            guild_id: GuildId(guild),
            guild_name: format!("guild-{guild}"),
            webhook_url: format!("https://hook/{channel}"),
            filter: filter.into(),
        }
    }

    #[test]
    fn test_register_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channels.json");
        let registry = ChannelRegistry::open(&path);
        registry.register(reg(1, 10, "raids")).unwrap();
        registry.register(reg(2, 20, "pvp")).unwrap();

        let reopened = ChannelRegistry::open(&path);
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get(ChannelId(2)).unwrap().filter, "pvp");
    }

    #[test]
    fn test_register_replaces_same_channel() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ChannelRegistry::open(&dir.path().join("channels.json"));
        registry.register(reg(1, 10, "raids")).unwrap();
        registry.register(reg(1, 10, "pvp")).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(ChannelId(1)).unwrap().filter, "pvp");
    }

    #[test]
    fn test_unregister() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ChannelRegistry::open(&dir.path().join("channels.json"));
        registry.register(reg(1, 10, "raids")).unwrap();
        assert_eq!(registry.unregister(ChannelId(1)).unwrap().channel_id, ChannelId(1));
        assert!(registry.is_empty());
        assert!(matches!(registry.unregister(ChannelId(1)), Err(LfgError::NotFound(_))));
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ChannelRegistry::open(&dir.path().join("channels.json"));
        registry.register(reg(1, 10, "Raids")).unwrap();
        registry.register(reg(2, 20, "raids")).unwrap();
        registry.register(reg(3, 30, "pvp")).unwrap();
        let ids: Vec<_> = registry
            .channels_for_filter("RAIDS")
            .iter()
            .map(|r| r.channel_id)
            .collect();
        assert_eq!(ids, vec![ChannelId(1), ChannelId(2)]);
    }

    #[test]
    fn test_corrupt_file_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channels.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(ChannelRegistry::open(&path).is_empty());
    }

    #[tokio::test]
    async fn test_directory_lists_channels() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ChannelRegistry::open(&dir.path().join("channels.json"));
        registry.register(reg(5, 10, "raids")).unwrap();
        registry.register(reg(6, 20, "pvp")).unwrap();
        assert_eq!(
            registry.list_registered_channels().await,
            vec![ChannelId(5), ChannelId(6)]
        );
    }
}
