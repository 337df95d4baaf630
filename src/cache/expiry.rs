//! Expiry List Module
//!
//! Orders TTL entries by deadline and defines the refresh-on-access policy.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::list::{NodeHandle, NodeList};
use crate::error::CacheError;

// == Refresh Mode ==
/// Bitmask selecting which accesses restart an entry's TTL.
///
/// Modes combine with `|`:
///
/// ```
/// use lru_ttl_cache::RefreshMode;
///
/// let mode = RefreshMode::ON_READ | RefreshMode::ON_WRITE;
/// assert!(mode.on_read() && mode.on_write());
/// assert!(!RefreshMode::NONE.on_read());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RefreshMode(u8);

impl RefreshMode {
    /// Entries expire on their original schedule.
    pub const NONE: Self = Self(0);
    /// A successful `get` restarts the TTL.
    pub const ON_READ: Self = Self(1);
    /// A `set` on an existing key restarts the TTL.
    pub const ON_WRITE: Self = Self(1 << 1);

    pub fn on_read(self) -> bool {
        self.0 & Self::ON_READ.0 != 0
    }

    pub fn on_write(self) -> bool {
        self.0 & Self::ON_WRITE.0 != 0
    }
}

impl BitOr for RefreshMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RefreshMode {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.on_read(), self.on_write()) {
            (false, false) => f.write_str("none"),
            (true, false) => f.write_str("read"),
            (false, true) => f.write_str("write"),
            (true, true) => f.write_str("read,write"),
        }
    }
}

impl FromStr for RefreshMode {
    type Err = CacheError;

    /// Parses `none`, `read`, `write` or a `,`/`|` separated combination.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut mode = Self::NONE;
        for part in s.split([',', '|']).map(str::trim) {
            match part.to_ascii_lowercase().as_str() {
                "none" | "" => {}
                "read" | "get" => mode |= Self::ON_READ,
                "write" | "set" => mode |= Self::ON_WRITE,
                other => {
                    return Err(CacheError::InvalidConfig(format!(
                        "Unknown refresh mode '{}'",
                        other
                    )))
                }
            }
        }
        Ok(mode)
    }
}

/// Longest TTL an entry can be given; longer ones are capped to it.
///
/// Matches the far-future horizon tokio uses for its own timers, so
/// deadlines never overflow `Instant`.
pub const MAX_TTL: Duration = Duration::from_secs(86400 * 365 * 30);

// == Expiry List ==
/// Keys ordered by deadline: soonest to expire at the back.
///
/// Every entry shares one TTL, so a freshly scheduled deadline is always the
/// latest one. Pushing or moving it to the front keeps the list sorted.
#[derive(Debug)]
pub struct ExpiryList<K> {
    /// Keys from latest (front) to soonest (back) deadline
    order: NodeList<K>,
    /// TTL applied to every entry
    ttl: Duration,
    /// Which accesses restart the TTL
    refresh: RefreshMode,
}

impl<K> ExpiryList<K> {
    // == Constructor ==
    /// Creates an empty list. `ttl` is capped to [`MAX_TTL`].
    pub fn new(ttl: Duration, refresh: RefreshMode) -> Self {
        Self {
            order: NodeList::new(),
            ttl: ttl.min(MAX_TTL),
            refresh,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn refresh_mode(&self) -> RefreshMode {
        self.refresh
    }

    // == Deadline ==
    /// Returns the deadline of an entry scheduled at `now`.
    pub fn deadline_from(&self, now: Instant) -> Instant {
        now + self.ttl
    }

    // == Schedule ==
    /// Adds a key with the latest deadline.
    pub fn schedule(&mut self, key: K) -> NodeHandle {
        self.order.push_front(key)
    }

    // == Reschedule ==
    /// Moves a refreshed key to the front.
    pub fn reschedule(&mut self, handle: NodeHandle) {
        self.order.move_to_front(handle);
    }

    // == Unlink ==
    pub fn unlink(&mut self, handle: NodeHandle) -> Option<K> {
        self.order.remove(handle)
    }

    // == Soonest ==
    /// Returns the key that expires first.
    pub fn soonest(&self) -> Option<&K> {
        self.order.back()
    }

    // == Pop Soonest ==
    /// Drops the back node regardless of which entry it belongs to.
    pub fn pop_soonest(&mut self) -> Option<K> {
        self.order.pop_back()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates keys from latest to soonest deadline.
    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.order.iter()
    }
}
