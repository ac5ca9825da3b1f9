//! # LfgRelay Core
//!
//! Shared building blocks for the relay and BigLFG crates:
//! ids and message types, the error type, TOML configuration,
//! and the narrow platform traits the engine talks through.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::LfgRelayConfig;
pub use error::{LfgError, Result};
pub use traits::{ChannelDirectory, MessagePlatform};
pub use types::{ChannelId, GuildId, InboundMessage, MessageId, WebhookPayload};
