//! Reaper Task
//!
//! Self-starting background sweeper that reclaims expired entries.
//!
//! The reaper is `Idle` until the first TTL insertion flips its running flag
//! and spawns the sweep task. The task sleeps until the soonest deadline,
//! reclaims everything already expired, re-arms its timer and exits as soon
//! as nothing is left to expire. Closing the owner drops the shutdown sender,
//! which wakes the task exactly once and terminates it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Reclaimed entries between cooperative yields during one sweep.
const SWEEP_BATCH: usize = 128;

// == Sweep Step ==
/// Result of inspecting the soonest-to-expire item once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStep {
    /// One expired item was removed; inspect again
    Reclaimed,
    /// The soonest item expires after this duration
    Pending(Duration),
    /// Nothing is left to expire
    Drained,
}

// == Sweep Target ==
/// Something the reaper can sweep one item at a time.
///
/// Each call must take the target's exclusive lock for its own duration only.
/// An implementation returning [`SweepStep::Drained`] must call
/// [`Reaper::mark_idle`] before releasing that lock, so that a concurrent
/// insertion either sees the flag cleared or is swept by the current task.
pub trait Sweep: Send + Sync + 'static {
    fn sweep_step(&self, now: Instant) -> SweepStep;
}

// == Reaper State ==
/// Lifecycle of the background sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaperState {
    /// No task running
    Idle,
    /// A sweep task owns the timer
    Active,
    /// The owner was closed; the reaper never starts again
    Terminated,
}

// == Reaper ==
/// Running flag, shutdown signal and timing settings of one sweeper.
#[derive(Debug)]
pub struct Reaper {
    /// Set while a sweep task is alive
    running: Arc<AtomicBool>,
    /// Dropped on shutdown; every subscribed task wakes once
    shutdown: Mutex<Option<watch::Sender<()>>>,
    /// Runtime the sweep task is spawned on
    runtime: Handle,
    /// Lower bound for any timer reset
    min_interval: Duration,
    /// Name used in log lines
    label: &'static str,
}

impl Reaper {
    // == Constructor ==
    pub fn new(runtime: Handle, min_interval: Duration, label: &'static str) -> Self {
        let (shutdown, _) = watch::channel(());
        Self {
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Mutex::new(Some(shutdown)),
            runtime,
            min_interval,
            label,
        }
    }

    // == Ensure Running ==
    /// Launches the sweep task if none is running.
    ///
    /// Exactly one caller wins the idle to active transition. Returns the
    /// task handle for the winner, `None` otherwise or after shutdown.
    ///
    /// If the task is dropped without finishing, for instance because its
    /// runtime has shut down, the flag is cleared so a later call can retry.
    pub fn ensure_running<S: Sweep>(
        &self,
        target: Arc<S>,
        first_wait: Duration,
    ) -> Option<JoinHandle<()>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        let shutdown = match self.shutdown.lock().as_ref() {
            Some(sender) => sender.subscribe(),
            None => {
                self.running.store(false, Ordering::Release);
                return None;
            }
        };

        debug!(
            "Starting {} reaper, first sweep in {:?}",
            self.label, first_wait
        );
        let guard = RunGuard {
            running: Arc::clone(&self.running),
            armed: true,
        };
        Some(self.runtime.spawn(run(
            target,
            first_wait,
            self.min_interval,
            shutdown,
            self.label,
            guard,
        )))
    }

    // == Mark Idle ==
    /// Clears the running flag. Called by a sweep target that found nothing
    /// left to expire, while it still holds its lock.
    pub fn mark_idle(&self) {
        self.running.store(false, Ordering::Release);
    }

    // == Shutdown ==
    /// Closes the shutdown channel. Returns false if it was already closed.
    pub fn shutdown(&self) -> bool {
        let closed = self.shutdown.lock().take().is_some();
        if closed {
            debug!("Signalled {} reaper shutdown", self.label);
        }
        closed
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    // == State ==
    pub fn state(&self) -> ReaperState {
        if self.shutdown.lock().is_none() {
            ReaperState::Terminated
        } else if self.is_running() {
            ReaperState::Active
        } else {
            ReaperState::Idle
        }
    }
}

/// Clears the running flag if the sweep task is dropped before it returns.
struct RunGuard {
    running: Arc<AtomicBool>,
    armed: bool,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if self.armed {
            self.running.store(false, Ordering::Release);
        }
    }
}

enum Pass {
    Rearm(Duration),
    Drained,
    Shutdown,
}

async fn run<S: Sweep>(
    target: Arc<S>,
    first_wait: Duration,
    min_interval: Duration,
    shutdown: watch::Receiver<()>,
    label: &'static str,
    mut guard: RunGuard,
) {
    run_epoch(target, first_wait, min_interval, shutdown, label).await;
    // Idle or terminated was already recorded by the target or the owner
    guard.armed = false;
}

async fn run_epoch<S: Sweep>(
    target: Arc<S>,
    first_wait: Duration,
    min_interval: Duration,
    mut shutdown: watch::Receiver<()>,
    label: &'static str,
) {
    let timer = tokio::time::sleep(first_wait);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                debug!("{} reaper stopped by shutdown", label);
                return;
            }
            () = &mut timer => {
                match sweep(target.as_ref(), &shutdown, label).await {
                    Pass::Rearm(wait) => {
                        let wait = wait.max(min_interval);
                        trace!("{} reaper sleeping for {:?}", label, wait);
                        timer.as_mut().reset(Instant::now() + wait);
                    }
                    Pass::Drained => {
                        debug!("{} reaper drained, going idle", label);
                        return;
                    }
                    Pass::Shutdown => {
                        debug!("{} reaper stopped mid-sweep by shutdown", label);
                        return;
                    }
                }
            }
        }
    }
}

async fn sweep<S: Sweep>(target: &S, shutdown: &watch::Receiver<()>, label: &str) -> Pass {
    let mut reclaimed = 0usize;
    loop {
        if shutdown.has_changed().is_err() {
            return Pass::Shutdown;
        }
        match target.sweep_step(Instant::now()) {
            SweepStep::Reclaimed => {
                reclaimed += 1;
                if reclaimed % SWEEP_BATCH == 0 {
                    tokio::task::yield_now().await;
                }
            }
            SweepStep::Pending(wait) => {
                if reclaimed > 0 {
                    debug!("{} reaper: removed {} expired entries", label, reclaimed);
                }
                return Pass::Rearm(wait);
            }
            SweepStep::Drained => {
                if reclaimed > 0 {
                    debug!("{} reaper: removed {} expired entries", label, reclaimed);
                }
                return Pass::Drained;
            }
        }
    }
}
