//! Background Tasks Module
//!
//! Contains the background work that runs alongside a cache.
//!
//! # Tasks
//! - Reaper: sweeps expired entries, started on demand and stopped when idle

mod reaper;

pub use reaper::{Reaper, ReaperState, Sweep, SweepStep};
