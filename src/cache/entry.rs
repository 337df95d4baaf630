//! Cache Entry Module
//!
//! Defines the state kept per key: value, deadline and list handles.

use std::time::Duration;

use tokio::time::Instant;

use crate::cache::list::NodeHandle;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Expiration deadline, None = no expiration
    pub expires_at: Option<Instant>,
    /// Position in the recency list, when LRU bounding is enabled
    pub(crate) recency: Option<NodeHandle>,
    /// Position in the expiry list, when TTL is enabled
    pub(crate) expiry: Option<NodeHandle>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry that is not yet linked into any list.
    pub fn new(value: V, expires_at: Option<Instant>) -> Self {
        Self {
            value,
            expires_at,
            recency: None,
            expiry: None,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// Boundary condition: an entry is expired once `now` reaches its deadline.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the time left before the deadline, or None if the entry never expires.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the deadline has passed
    /// - `Some(remaining)` if the entry has TTL and hasn't expired
    /// - `None` if the entry has no TTL
    pub fn ttl_remaining_at(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}
