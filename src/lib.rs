//! LRU/TTL Cache - A thread-safe in-memory cache
//!
//! Bounds itself by entry count (least recently used eviction) and/or by a
//! per-entry time to live, reclaimed lazily on access and by a background
//! reaper that starts and stops itself on demand.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{Cache, CacheBuilder, CacheStats, ExpiringCounter, RefreshMode};
pub use config::Config;
pub use error::CacheError;
pub use tasks::ReaperState;
