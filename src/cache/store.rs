//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking and TTL expiration.
//!
//! The store is a plain single-threaded structure. Every time-dependent method
//! takes `now` explicitly; [`crate::Cache`] supplies the clock and the locking.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::cache::{CacheEntry, CacheStats, ExpiryList, RecencyList, RefreshMode};
use crate::tasks::SweepStep;

// == Set Outcome ==
/// What a `set` did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome<K> {
    /// The key existed and its value was replaced
    Updated,
    /// A new entry was created
    Inserted {
        /// True when the entry joined the expiry list
        scheduled: bool,
        /// Key evicted to bring the store back under capacity
        evicted: Option<K>,
    },
}

// == Cache Store ==
/// Cache storage with optional LRU bounding and optional TTL.
#[derive(Debug)]
pub struct CacheStore<K, V> {
    /// Key-value storage
    entries: HashMap<K, CacheEntry<V>>,
    /// Recency order, present when a capacity is configured
    lru: Option<RecencyList<K>>,
    /// Deadline order, present when a TTL is configured
    expiry: Option<ExpiryList<K>>,
    /// Performance statistics
    stats: CacheStats,
}

impl<K, V> CacheStore<K, V> {
    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Length ==
    /// Returns the current number of entries, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured capacity, `None` when LRU bounding is disabled.
    pub fn capacity(&self) -> Option<usize> {
        self.lru.as_ref().map(RecencyList::capacity)
    }

    /// Configured TTL, `None` when expiration is disabled.
    pub fn ttl(&self) -> Option<Duration> {
        self.expiry.as_ref().map(ExpiryList::ttl)
    }
}

impl<K, V> CacheStore<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates a new store.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries, `0` disables LRU bounding
    /// * `ttl` - Per-entry time to live and refresh policy, `None` disables expiration
    pub fn new(capacity: usize, ttl: Option<(Duration, RefreshMode)>) -> Self {
        Self {
            entries: HashMap::new(),
            lru: (capacity > 0).then(|| RecencyList::new(capacity)),
            expiry: ttl.map(|(ttl, refresh)| ExpiryList::new(ttl, refresh)),
            stats: CacheStats::new(),
        }
    }

    // == Set ==
    /// Inserts or replaces a value.
    ///
    /// An existing key moves to the front of the recency list and, when the
    /// refresh policy includes writes, gets a new deadline. A new key is linked
    /// into every configured list; if that pushes the store over capacity the
    /// least recently used entry is evicted, expired or not.
    pub fn set(&mut self, key: K, value: V, now: Instant) -> SetOutcome<K> {
        if let Some(entry) = self.entries.get_mut(&key) {
            if let (Some(lru), Some(handle)) = (self.lru.as_mut(), entry.recency) {
                lru.touch(handle);
            }
            if let (Some(expiry), Some(handle)) = (self.expiry.as_mut(), entry.expiry) {
                if expiry.refresh_mode().on_write() {
                    entry.expires_at = Some(expiry.deadline_from(now));
                    expiry.reschedule(handle);
                }
            }
            entry.value = value;
            return SetOutcome::Updated;
        }

        // Deadline first, so nothing is linked if it cannot be computed
        let deadline = self.expiry.as_ref().map(|expiry| expiry.deadline_from(now));
        let mut entry = CacheEntry::new(value, deadline);
        if let Some(lru) = self.lru.as_mut() {
            entry.recency = Some(lru.push(key.clone()));
        }
        let scheduled = match self.expiry.as_mut() {
            Some(expiry) => {
                entry.expiry = Some(expiry.schedule(key.clone()));
                true
            }
            None => false,
        };
        self.entries.insert(key, entry);

        let evicted = self.evict_over_capacity();
        self.stats.set_total_entries(self.entries.len());

        SetOutcome::Inserted { scheduled, evicted }
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// An entry whose deadline has passed is removed on the spot and reported
    /// as absent, whether or not the reaper has reached it yet.
    pub fn get(&mut self, key: &K, now: Instant) -> Option<&V> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.unlink(key);
            self.stats.record_expiration();
            self.stats.record_miss();
            self.stats.set_total_entries(self.entries.len());
            return None;
        }

        let entry = self.entries.get_mut(key)?;
        if let (Some(lru), Some(handle)) = (self.lru.as_mut(), entry.recency) {
            lru.touch(handle);
        }
        if let (Some(expiry), Some(handle)) = (self.expiry.as_mut(), entry.expiry) {
            if expiry.refresh_mode().on_read() {
                entry.expires_at = Some(expiry.deadline_from(now));
                expiry.reschedule(handle);
            }
        }
        self.stats.record_hit();
        Some(&entry.value)
    }

    // == Remove ==
    /// Removes an entry by key. Absent keys are a no-op.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let entry = self.unlink(key)?;
        self.stats.set_total_entries(self.entries.len());
        Some(entry.value)
    }

    // == Sweep Step ==
    /// Inspects the soonest deadline once.
    ///
    /// Removes that entry if it has expired, otherwise reports how long until
    /// it does. Reports `Drained` when no entry is scheduled.
    pub fn sweep_step(&mut self, now: Instant) -> SweepStep {
        let Some(expiry) = self.expiry.as_mut() else {
            return SweepStep::Drained;
        };
        let Some(key) = expiry.soonest() else {
            return SweepStep::Drained;
        };

        match self.entries.get(key).and_then(|entry| entry.expires_at) {
            Some(deadline) if deadline > now => SweepStep::Pending(deadline - now),
            Some(_) => {
                let key = key.clone();
                self.unlink(&key);
                self.stats.record_expiration();
                self.stats.set_total_entries(self.entries.len());
                SweepStep::Reclaimed
            }
            None => {
                // Node without a scheduled entry: drop it so the sweep progresses
                expiry.pop_soonest();
                SweepStep::Reclaimed
            }
        }
    }

    /// Time left before `key` expires, without touching its position.
    pub fn ttl_remaining(&self, key: &K, now: Instant) -> Option<Duration> {
        self.entries.get(key)?.ttl_remaining_at(now)
    }

    fn evict_over_capacity(&mut self) -> Option<K> {
        let lru = self.lru.as_ref()?;
        if !lru.is_over_capacity(self.entries.len()) {
            return None;
        }
        let key = lru.least_recent()?.clone();
        self.unlink(&key)?;
        self.stats.record_eviction();
        trace!("Evicted least recently used entry");
        Some(key)
    }

    fn unlink(&mut self, key: &K) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        if let (Some(lru), Some(handle)) = (self.lru.as_mut(), entry.recency) {
            lru.unlink(handle);
        }
        if let (Some(expiry), Some(handle)) = (self.expiry.as_mut(), entry.expiry) {
            expiry.unlink(handle);
        }
        Some(entry)
    }

    /// Keys from most to least recently used.
    #[cfg(test)]
    pub(crate) fn recency_order(&self) -> Vec<K> {
        self.lru
            .as_ref()
            .map(|lru| lru.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Deadlines of the expiry list from front (latest) to back (soonest).
    #[cfg(test)]
    pub(crate) fn expiry_deadlines(&self) -> Vec<Instant> {
        self.expiry
            .as_ref()
            .map(|expiry| {
                expiry
                    .keys()
                    .filter_map(|key| self.entries.get(key).and_then(|entry| entry.expires_at))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Checks that every entry is linked into exactly the configured lists.
    #[cfg(test)]
    pub(crate) fn assert_linked(&self) {
        let len = self.entries.len();
        if let Some(lru) = &self.lru {
            assert_eq!(lru.len(), len, "recency list out of sync");
        }
        if let Some(expiry) = &self.expiry {
            assert_eq!(expiry.len(), len, "expiry list out of sync");
        }
        for entry in self.entries.values() {
            assert_eq!(entry.recency.is_some(), self.lru.is_some());
            assert_eq!(entry.expiry.is_some(), self.expiry.is_some());
        }
    }
}
