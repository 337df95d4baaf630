//! Cache Module
//!
//! Provides in-memory caching with LRU eviction and TTL expiration.
//!
//! # Layout
//! - `store`: single-threaded engine over a `HashMap` plus two ordered lists
//! - `lru` / `expiry`: recency and deadline orderings on an arena list
//! - `handle`: the thread-safe [`Cache`] and its lazily started reaper
//! - `counter`: a sliding-window counter built on the same reaper

mod builder;
mod counter;
mod entry;
mod expiry;
mod handle;
mod list;
mod lru;
mod stats;
mod store;


// Re-export public types
pub(crate) use builder::check_min_sweep_interval;
pub use builder::{CacheBuilder, DEFAULT_MIN_SWEEP_INTERVAL};
pub use counter::ExpiringCounter;
pub use entry::CacheEntry;
pub use expiry::{ExpiryList, RefreshMode, MAX_TTL};
pub use handle::Cache;
pub use list::{NodeHandle, NodeList};
pub use lru::RecencyList;
pub use stats::CacheStats;
pub use store::{CacheStore, SetOutcome};
