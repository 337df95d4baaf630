//! Expiring Counter Module
//!
//! Sliding-window event counter for rate limiting, swept by the same reaper
//! as the cache.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::debug;

use crate::cache::{check_min_sweep_interval, DEFAULT_MIN_SWEEP_INTERVAL, MAX_TTL};
use crate::error::{CacheError, Result};
use crate::tasks::{Reaper, ReaperState, Sweep, SweepStep};

struct Shared {
    /// Event deadlines, soonest at the front. `None` once closed.
    deadlines: RwLock<Option<VecDeque<Instant>>>,
    reaper: Reaper,
}

impl Sweep for Shared {
    fn sweep_step(&self, now: Instant) -> SweepStep {
        let mut guard = self.deadlines.write();
        let step = match guard.as_mut() {
            None => SweepStep::Drained,
            Some(deadlines) => match deadlines.front().copied() {
                None => SweepStep::Drained,
                Some(deadline) if deadline <= now => {
                    deadlines.pop_front();
                    SweepStep::Reclaimed
                }
                Some(deadline) => SweepStep::Pending(deadline - now),
            },
        };
        if step == SweepStep::Drained {
            self.reaper.mark_idle();
        }
        step
    }
}

// == Expiring Counter ==
/// Counts events that happened within the last `window`.
///
/// Each [`incr`](Self::incr) records one event that the reaper forgets once
/// `window` has passed. Use it for rate limits such as "at most N requests
/// per minute".
pub struct ExpiringCounter {
    shared: Arc<Shared>,
    window: Duration,
}

impl ExpiringCounter {
    // == Constructor ==
    /// Creates a counter on the current runtime with the default sweep interval.
    pub fn new(window: Duration) -> Result<Self> {
        Self::with_min_sweep_interval(window, DEFAULT_MIN_SWEEP_INTERVAL)
    }

    /// Creates a counter whose window and reaper sleeps are at least `min_sweep_interval`.
    ///
    /// A window longer than [`MAX_TTL`] is capped.
    pub fn with_min_sweep_interval(window: Duration, min_sweep_interval: Duration) -> Result<Self> {
        check_min_sweep_interval(min_sweep_interval)?;
        let runtime = Handle::try_current().map_err(|e| CacheError::NoRuntime(e.to_string()))?;
        let window = window.max(min_sweep_interval).min(MAX_TTL);

        Ok(Self {
            shared: Arc::new(Shared {
                deadlines: RwLock::new(Some(VecDeque::new())),
                reaper: Reaper::new(runtime, min_sweep_interval, "counter"),
            }),
            window,
        })
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    // == Incr ==
    /// Records one event. No-op after close.
    pub fn incr(&self) {
        let mut guard = self.shared.deadlines.write();
        let Some(deadlines) = guard.as_mut() else {
            return;
        };
        deadlines.push_back(Instant::now() + self.window);
        self.shared
            .reaper
            .ensure_running(Arc::clone(&self.shared), self.window);
    }

    // == Length ==
    /// Number of recorded events not yet reclaimed.
    pub fn len(&self) -> usize {
        self.shared
            .deadlines
            .read()
            .as_ref()
            .map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reaper_state(&self) -> ReaperState {
        self.shared.reaper.state()
    }

    // == Close ==
    /// Stops the reaper and forgets every event. Closing twice is a no-op.
    pub fn close(&self) {
        let mut guard = self.shared.deadlines.write();
        if guard.take().is_none() {
            return;
        }
        self.shared.reaper.shutdown();
        debug!("Expiring counter closed");
    }
}

impl Drop for ExpiringCounter {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ExpiringCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringCounter")
            .field("len", &self.len())
            .field("window", &self.window)
            .field("reaper", &self.reaper_state())
            .finish()
    }
}
