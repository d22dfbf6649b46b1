//! Read cache subsystem for aeromodel
//!
//! # Design Principles
//!
//! - Keyed by primary key; whole-query results are never cached
//! - Entries are snapshots, never live instances
//! - Every write invalidates what it touches before returning
//! - `delete_all` invalidates everything
//! - The default LRU is fully replaceable by a caller-supplied provider

mod config;
mod layer;
mod lru;
mod provider;

pub use config::CacheConfig;
pub use layer::{cache_key, CacheLayer};
pub use lru::{CacheStats, LruCache, DEFAULT_MAX_ENTRIES};
pub use provider::CacheProvider;
