//! Folio cache engine.
//!
//! Two tiers sit in front of every expensive lookup:
//!
//! - **Memory**: per-process LRU map with absolute expiry per entry
//! - **Remote**: Redis, shared by all instances, JSON encoded
//!
//! Concurrent callers of the same key share a single load. On a memory miss
//! the load function races the remote tier and the first success wins.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! memory_capacity = 512
//! redis_url = "redis://127.0.0.1:6379"
//! ```
//!
//! Caching is disabled entirely when `mode = "development"`.

mod config;
mod error;
pub mod keys;
mod lock;
mod race;
mod remote;
mod store;
mod tiered;

pub use config::CacheConfig;
pub use error::CacheError;
pub use race::{Branch, BranchFuture, RaceWin, success_race};
pub use remote::{RedisTier, RemoteTier, decode, encode};
pub use store::MemoryStore;
pub use tiered::{CacheOptions, TieredCache};
