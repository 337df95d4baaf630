//! Configuration Module
//!
//! Handles loading cache and workload settings from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::cache::{CacheBuilder, RefreshMode};

/// Cache and workload runner configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of entries, 0 disables LRU bounding
    pub capacity: usize,
    /// Entry time to live in milliseconds, 0 disables expiration
    pub ttl_ms: u64,
    /// Which accesses restart an entry's TTL
    pub refresh_mode: RefreshMode,
    /// Minimum reaper sleep and TTL resolution in milliseconds
    pub min_sweep_ms: u64,
    /// Number of distinct keys the workload touches
    pub key_space: u64,
    /// Operations issued per workload tick
    pub ops_per_tick: u64,
    /// Workload tick in milliseconds
    pub tick_ms: u64,
    /// Statistics report interval in seconds
    pub report_interval_secs: u64,
    /// Write-rate window in seconds
    pub rate_window_secs: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 1000)
    /// - `CACHE_TTL_MS` - Entry TTL in milliseconds (default: 0, no TTL)
    /// - `CACHE_REFRESH_MODE` - `none`, `read`, `write` or `read,write` (default: none)
    /// - `CACHE_MIN_SWEEP_MS` - Minimum sweep interval in milliseconds (default: 1000)
    /// - `WORKLOAD_KEY_SPACE` - Distinct keys touched by the runner (default: 5000)
    /// - `WORKLOAD_OPS_PER_TICK` - Operations per tick (default: 100)
    /// - `WORKLOAD_TICK_MS` - Tick length in milliseconds (default: 10)
    /// - `REPORT_INTERVAL_SECS` - Stats report frequency in seconds (default: 5)
    /// - `RATE_WINDOW_SECS` - Write-rate counter window in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: env_or("CACHE_CAPACITY", defaults.capacity),
            ttl_ms: env_or("CACHE_TTL_MS", defaults.ttl_ms),
            refresh_mode: env::var("CACHE_REFRESH_MODE")
                .ok()
                .and_then(|v| match v.parse() {
                    Ok(mode) => Some(mode),
                    Err(e) => {
                        warn!("Ignoring CACHE_REFRESH_MODE: {}", e);
                        None
                    }
                })
                .unwrap_or(defaults.refresh_mode),
            min_sweep_ms: env_or("CACHE_MIN_SWEEP_MS", defaults.min_sweep_ms),
            key_space: env_or("WORKLOAD_KEY_SPACE", defaults.key_space),
            ops_per_tick: env_or("WORKLOAD_OPS_PER_TICK", defaults.ops_per_tick),
            tick_ms: env_or("WORKLOAD_TICK_MS", defaults.tick_ms),
            report_interval_secs: env_or("REPORT_INTERVAL_SECS", defaults.report_interval_secs),
            rate_window_secs: env_or("RATE_WINDOW_SECS", defaults.rate_window_secs),
        }
    }

    /// Returns a builder carrying the cache part of this configuration.
    pub fn cache_builder<K, V>(&self) -> CacheBuilder<K, V> {
        let mut builder = CacheBuilder::new()
            .with_lru(self.capacity)
            .with_min_sweep_interval(Duration::from_millis(self.min_sweep_ms));
        if self.ttl_ms > 0 {
            builder = builder.with_ttl(Duration::from_millis(self.ttl_ms), self.refresh_mode);
        }
        builder
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl_ms: 0,
            refresh_mode: RefreshMode::NONE,
            min_sweep_ms: 1000,
            key_space: 5000,
            ops_per_tick: 100,
            tick_ms: 10,
            report_interval_secs: 5,
            rate_window_secs: 1,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
