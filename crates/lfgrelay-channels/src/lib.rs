//! # LfgRelay Channels
//! Chat platform adapters and the cross-server relay.
//!
//! - `discord` — Discord REST adapter (`MessagePlatform`)
//! - `memory` — in-process adapter for dry runs and tests
//! - `registry` — registered relay channels, persisted as JSON
//! - `relay` — filter-matched webhook fan-out with retry/backoff

pub mod discord;
pub mod memory;
pub mod registry;
pub mod relay;
pub mod retry;

pub use discord::DiscordPlatform;
pub use memory::MemoryPlatform;
pub use registry::{ChannelRegistry, Registration};
pub use relay::{RelayFanout, RelayReport};
pub use retry::RetryPolicy;
