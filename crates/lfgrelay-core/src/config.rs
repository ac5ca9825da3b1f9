//! LfgRelay configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{LfgError, Result};

/// Environment variable that overrides `discord.bot_token`.
pub const TOKEN_ENV: &str = "LFGRELAY_DISCORD_TOKEN";

/// Longest accepted BigLFG timeout (one year).
pub const MAX_TIMEOUT_MINS: u64 = 365 * 24 * 60;

/// Longest accepted poll interval (one hour).
pub const MAX_POLL_INTERVAL_SECS: u64 = 60 * 60;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LfgRelayConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub biglfg: BigLfgConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

impl LfgRelayConfig {
    /// Load config from the default path (~/.lfgrelay/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default().with_env_overrides())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LfgError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| LfgError::Config(format!("Failed to parse config: {e}")))?;
        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| LfgError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_POLL_INTERVAL_SECS).contains(&self.biglfg.poll_interval_secs) {
            return Err(LfgError::Config(format!(
                "biglfg.poll_interval_secs must be between 1 and {MAX_POLL_INTERVAL_SECS}"
            )));
        }
        if !(1..=MAX_TIMEOUT_MINS).contains(&self.biglfg.timeout_mins) {
            return Err(LfgError::Config(format!(
                "biglfg.timeout_mins must be between 1 and {MAX_TIMEOUT_MINS}"
            )));
        }
        if self.biglfg.target_count == 0 {
            return Err(LfgError::Config("biglfg.target_count must be > 0".into()));
        }
        if self.biglfg.interest_emoji.trim().is_empty() {
            return Err(LfgError::Config("biglfg.interest_emoji must not be empty".into()));
        }
        if self.relay.max_attempts == 0 {
            return Err(LfgError::Config("relay.max_attempts must be > 0".into()));
        }
        Ok(())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var(TOKEN_ENV)
            && !token.is_empty()
        {
            self.discord.bot_token = token;
        }
        self
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the LfgRelay home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".lfgrelay")
    }
}

/// Discord REST configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_base() -> String { "https://discord.com/api/v10".into() }
fn default_request_timeout() -> u64 { 10 }

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: default_api_base(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// BigLFG lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BigLfgConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_timeout_mins")]
    pub timeout_mins: u64,
    #[serde(default = "default_target_count")]
    pub target_count: u32,
    #[serde(default = "default_interest_emoji")]
    pub interest_emoji: String,
}

fn default_poll_interval() -> u64 { 5 }
fn default_timeout_mins() -> u64 { 15 }
fn default_target_count() -> u32 { 4 }
fn default_interest_emoji() -> String { "👍".into() }

impl Default for BigLfgConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            timeout_mins: default_timeout_mins(),
            target_count: default_target_count(),
            interest_emoji: default_interest_emoji(),
        }
    }
}

/// Relay fan-out configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_registry_path")]
    pub registry_path: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

fn default_registry_path() -> String { "~/.lfgrelay/channels.json".into() }
fn default_max_attempts() -> u32 { 3 }
fn default_base_delay() -> u64 { 500 }
fn default_max_delay() -> u64 { 8000 }

impl RelayConfig {
    /// Registry path with `~` expanded.
    pub fn registry_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.registry_path).to_string())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            registry_path: default_registry_path(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}
