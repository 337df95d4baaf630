//! Cache Handle Module
//!
//! Thread-safe cache combining the store, one exclusive lock and the reaper.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cache::{CacheBuilder, CacheStats, CacheStore, RefreshMode, SetOutcome};
use crate::tasks::{Reaper, ReaperState, Sweep, SweepStep};

/// State shared between the cache handle and its reaper task.
struct Shared<K, V> {
    /// `None` once the cache is closed
    store: RwLock<Option<CacheStore<K, V>>>,
    /// Present when a TTL is configured
    reaper: Option<Reaper>,
}

impl<K, V> Sweep for Shared<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn sweep_step(&self, now: Instant) -> SweepStep {
        let mut guard = self.store.write();
        let step = match guard.as_mut() {
            Some(store) => store.sweep_step(now),
            None => SweepStep::Drained,
        };
        if step == SweepStep::Drained {
            if let Some(reaper) = &self.reaper {
                reaper.mark_idle();
            }
        }
        step
    }
}

// == Cache ==
/// A thread-safe key-value cache with optional LRU bounding and TTL expiration.
///
/// All mutating operations, `get` included, take one exclusive lock; `len`
/// and `stats` take it shared. Expired entries are reclaimed lazily by `get`
/// and proactively by a background reaper that runs only while TTL entries
/// exist.
///
/// After [`Cache::close`] the cache is inert: `set` does nothing, `get` and
/// `remove` return `None` and `len` is 0. Closing twice is a no-op, and
/// dropping the cache closes it.
pub struct Cache<K, V> {
    shared: Arc<Shared<K, V>>,
    capacity: Option<usize>,
    ttl: Option<(Duration, RefreshMode)>,
}

impl<K, V> Cache<K, V> {
    // == Builder ==
    pub fn builder() -> CacheBuilder<K, V> {
        CacheBuilder::new()
    }

    // == Length ==
    /// Returns the number of stored entries.
    ///
    /// Does not sweep, so expired entries not yet reclaimed are counted.
    pub fn len(&self) -> usize {
        self.shared.store.read().as_ref().map_or(0, CacheStore::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Stats ==
    /// Returns current statistics; all zero after close.
    pub fn stats(&self) -> CacheStats {
        self.shared
            .store
            .read()
            .as_ref()
            .map(CacheStore::stats)
            .unwrap_or_default()
    }

    /// Configured capacity, `None` when LRU bounding is disabled.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Effective TTL after clamping, `None` when expiration is disabled.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl.map(|(ttl, _)| ttl)
    }

    pub fn refresh_mode(&self) -> Option<RefreshMode> {
        self.ttl.map(|(_, refresh)| refresh)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.store.read().is_none()
    }

    // == Reaper State ==
    pub fn reaper_state(&self) -> ReaperState {
        match &self.shared.reaper {
            Some(reaper) => reaper.state(),
            None if self.is_closed() => ReaperState::Terminated,
            None => ReaperState::Idle,
        }
    }

    // == Close ==
    /// Stops the reaper and releases every entry. The cache stays inert afterwards.
    pub fn close(&self) {
        let mut guard = self.shared.store.write();
        let Some(store) = guard.take() else {
            debug!("Cache already closed");
            return;
        };
        if let Some(reaper) = &self.shared.reaper {
            reaper.shutdown();
        }
        drop(guard);
        info!("Cache closed, released {} entries", store.len());
    }
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn from_parts(
        capacity: usize,
        ttl: Option<(Duration, RefreshMode)>,
        min_sweep_interval: Duration,
        runtime: Option<Handle>,
    ) -> Self {
        let reaper = ttl
            .zip(runtime)
            .map(|(_, runtime)| Reaper::new(runtime, min_sweep_interval, "cache"));
        Self {
            shared: Arc::new(Shared {
                store: RwLock::new(Some(CacheStore::new(capacity, ttl))),
                reaper,
            }),
            capacity: (capacity > 0).then_some(capacity),
            ttl,
        }
    }

    // == Set ==
    /// Inserts or replaces the value stored under `key`.
    pub fn set(&self, key: K, value: V) {
        let mut guard = self.shared.store.write();
        let Some(store) = guard.as_mut() else {
            return;
        };

        let outcome = store.set(key, value, Instant::now());
        if let SetOutcome::Inserted {
            scheduled: true, ..
        } = outcome
        {
            if let (Some(reaper), Some(ttl)) = (&self.shared.reaper, store.ttl()) {
                // Launch under the lock so it cannot race the reaper going idle
                reaper.ensure_running(Arc::clone(&self.shared), ttl);
            }
        }
    }

    // == Get ==
    /// Returns a clone of the value under `key`, or `None` if absent or expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut guard = self.shared.store.write();
        guard.as_mut()?.get(key, Instant::now()).cloned()
    }

    // == Remove ==
    /// Removes `key` and returns its value. Absent keys are a no-op.
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut guard = self.shared.store.write();
        guard.as_mut()?.remove(key)
    }

    // == TTL Remaining ==
    /// Time left before `key` expires, without refreshing it.
    ///
    /// Returns `None` for absent keys and when expiration is disabled.
    pub fn ttl_remaining(&self, key: &K) -> Option<Duration> {
        let guard = self.shared.store.read();
        guard.as_ref()?.ttl_remaining(key, Instant::now())
    }
}

impl<K, V> Drop for Cache<K, V> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<K, V> fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("reaper", &self.reaper_state())
            .finish()
    }
}
