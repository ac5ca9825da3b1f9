//! # LfgRelay Scheduler
//!
//! BigLFG lifecycle engine: timed group-formation prompts broadcast to every
//! registered channel, polled for interest reactions, closed when full or
//! cancelled after inactivity.
//!
//! ## Architecture
//! ```text
//! create_big_lfg ──► send + seed reaction per channel ──► GroupRequestStore::insert
//!
//! LfgEngine loop (tokio interval, one pass at a time)
//!   └── snapshot() ─► per request, in insertion order
//!         ├── past timeout?      → remove → edit "cancelled" + clear reactions
//!         ├── refresh count      ← get_reaction_count (last answer wins, minus bot)
//!         └── count >= target?   → remove → edit "full" + clear reactions
//! ```

pub mod engine;
pub mod render;
pub mod request;
pub mod store;

pub use engine::{LfgEngine, LfgOptions, LfgSettings, LifecycleHandle, TickReport};
pub use request::{DistributedMessage, GroupRequest, Termination, TickOutcome};
pub use store::GroupRequestStore;
