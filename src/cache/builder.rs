//! Cache Builder Module
//!
//! Collects construction options and validates them into a [`Cache`].

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::debug;

use crate::cache::{Cache, RefreshMode, MAX_TTL};
use crate::error::{CacheError, Result};

/// Default lower bound on TTL and on any reaper timer reset.
pub const DEFAULT_MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

// == Cache Builder ==
/// Options for a new [`Cache`].
///
/// ```
/// use std::time::Duration;
/// use lru_ttl_cache::{Cache, RefreshMode};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> lru_ttl_cache::error::Result<()> {
/// let cache: Cache<String, u64> = Cache::builder()
///     .with_lru(1000)
///     .with_ttl(Duration::from_secs(30), RefreshMode::ON_READ)
///     .build()?;
///
/// cache.set("requests".to_string(), 1);
/// assert_eq!(cache.get(&"requests".to_string()), Some(1));
/// # Ok(())
/// # }
/// ```
pub struct CacheBuilder<K, V> {
    capacity: usize,
    ttl: Option<(Duration, RefreshMode)>,
    min_sweep_interval: Duration,
    runtime: Option<Handle>,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Default for CacheBuilder<K, V> {
    fn default() -> Self {
        Self {
            capacity: 0,
            ttl: None,
            min_sweep_interval: DEFAULT_MIN_SWEEP_INTERVAL,
            runtime: None,
            _marker: PhantomData,
        }
    }
}

impl<K, V> fmt::Debug for CacheBuilder<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("min_sweep_interval", &self.min_sweep_interval)
            .field("runtime", &self.runtime.is_some())
            .finish()
    }
}

impl<K, V> CacheBuilder<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    // == LRU ==
    /// Bounds the cache to `capacity` entries. `0` disables bounding.
    pub fn with_lru(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    // == TTL ==
    /// Expires entries `ttl` after insertion or after a refreshing access.
    ///
    /// A TTL shorter than the minimum sweep interval is raised to it, one
    /// longer than [`MAX_TTL`] is capped.
    pub fn with_ttl(mut self, ttl: Duration, refresh: RefreshMode) -> Self {
        self.ttl = Some((ttl, refresh));
        self
    }

    // == Min Sweep Interval ==
    /// Sets the TTL resolution: the shortest TTL and the shortest reaper sleep.
    pub fn with_min_sweep_interval(mut self, interval: Duration) -> Self {
        self.min_sweep_interval = interval;
        self
    }

    // == Runtime ==
    /// Spawns the reaper on `runtime` instead of the current one.
    ///
    /// If that runtime shuts down first, the reaper stays `Idle` and expired
    /// entries are only reclaimed by `get`.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    // == Build ==
    /// Validates the options and creates the cache.
    ///
    /// # Errors
    /// - `InvalidConfig` if the minimum sweep interval is zero or above [`MAX_TTL`]
    /// - `NoRuntime` if a TTL is set, no runtime was given and none is current
    pub fn build(self) -> Result<Cache<K, V>>
    where
        K: Hash + Eq + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        check_min_sweep_interval(self.min_sweep_interval)?;

        let ttl = self.ttl.map(|(ttl, refresh)| {
            (ttl.max(self.min_sweep_interval).min(MAX_TTL), refresh)
        });

        let runtime = match (ttl, self.runtime) {
            (None, _) => None,
            (Some(_), Some(runtime)) => Some(runtime),
            (Some(_), None) => Some(
                Handle::try_current().map_err(|e| CacheError::NoRuntime(e.to_string()))?,
            ),
        };

        debug!(
            "Building cache: capacity={}, ttl={:?}, min_sweep_interval={:?}",
            self.capacity, ttl, self.min_sweep_interval
        );

        Ok(Cache::from_parts(
            self.capacity,
            ttl,
            self.min_sweep_interval,
            runtime,
        ))
    }
}

/// Validates a minimum sweep interval shared by caches and counters.
pub(crate) fn check_min_sweep_interval(interval: Duration) -> Result<()> {
    if interval.is_zero() {
        return Err(CacheError::InvalidConfig(
            "min sweep interval must be greater than zero".to_string(),
        ));
    }
    if interval > MAX_TTL {
        return Err(CacheError::InvalidConfig(format!(
            "min sweep interval must not exceed {:?}",
            MAX_TTL
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_builder_defaults() {
        let builder: CacheBuilder<u32, u32> = CacheBuilder::new();
        assert_eq!(builder.capacity, 0);
        assert!(builder.ttl.is_none());
        assert_eq!(builder.min_sweep_interval, DEFAULT_MIN_SWEEP_INTERVAL);
    }

    #[test]
    fn test_lru_only_needs_no_runtime() {
        let cache: Cache<u32, u32> = assert_ok!(CacheBuilder::new().with_lru(4).build());
        assert_eq!(cache.capacity(), Some(4));
        assert_eq!(cache.ttl(), None);
    }

    #[test]
    fn test_ttl_outside_runtime_fails() {
        let result: Result<Cache<u32, u32>> = CacheBuilder::new()
            .with_ttl(Duration::from_secs(5), RefreshMode::NONE)
            .build();
        assert!(matches!(assert_err!(result), CacheError::NoRuntime(_)));
    }

    #[test]
    fn test_explicit_runtime_handle() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let cache: Cache<u32, u32> = assert_ok!(CacheBuilder::new()
            .with_ttl(Duration::from_secs(5), RefreshMode::NONE)
            .with_runtime(runtime.handle().clone())
            .build());
        assert_eq!(cache.ttl(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_zero_min_sweep_interval_rejected() {
        let result: Result<Cache<u32, u32>> = CacheBuilder::new()
            .with_min_sweep_interval(Duration::ZERO)
            .build();
        assert!(matches!(assert_err!(result), CacheError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_ttl_clamped_to_min_sweep_interval() {
        let cache: Cache<u32, u32> = CacheBuilder::new()
            .with_ttl(Duration::from_millis(1), RefreshMode::NONE)
            .with_min_sweep_interval(Duration::from_millis(100))
            .build()
            .unwrap();
        assert_eq!(cache.ttl(), Some(Duration::from_millis(100)));

        let cache: Cache<u32, u32> = CacheBuilder::new()
            .with_ttl(Duration::from_millis(1), RefreshMode::NONE)
            .build()
            .unwrap();
        assert_eq!(cache.ttl(), Some(DEFAULT_MIN_SWEEP_INTERVAL));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_capped() {
        let cache: Cache<u32, u32> = assert_ok!(CacheBuilder::new()
            .with_lru(2)
            .with_ttl(Duration::MAX, RefreshMode::ON_READ)
            .build());
        assert_eq!(cache.ttl(), Some(MAX_TTL));

        cache.set(1, 1);
        cache.set(2, 2);
        cache.set(3, 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&3), Some(3));
        assert_eq!(cache.ttl_remaining(&3), Some(MAX_TTL));
    }

    #[test]
    fn test_oversized_min_sweep_interval_rejected() {
        let result: Result<Cache<u32, u32>> = CacheBuilder::new()
            .with_min_sweep_interval(Duration::MAX)
            .build();
        assert!(matches!(assert_err!(result), CacheError::InvalidConfig(_)));
    }
}
