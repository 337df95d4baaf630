//! LRU/TTL Cache workload runner
//!
//! Drives a configurable set/get/remove workload against a cache and reports
//! its statistics until interrupted.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lru_ttl_cache::{Cache, Config, ExpiringCounter};

/// Cache type exercised by the runner.
type WorkloadCache = Cache<u64, Arc<String>>;

/// Multiplier spreading consecutive operations over the key space.
const KEY_STRIDE: u64 = 7919;

/// Main entry point for the workload runner.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the cache and the write-rate counter
/// 4. Start the workload and reporting tasks
/// 5. On SIGINT/SIGTERM stop the tasks, close the cache and print final stats
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lru_ttl_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting LRU/TTL cache workload runner");

    let config = Config::from_env();
    info!(
        "Configuration loaded: capacity={}, ttl={}ms, refresh={}, min_sweep={}ms, keys={}, ops/tick={}, tick={}ms",
        config.capacity,
        config.ttl_ms,
        config.refresh_mode,
        config.min_sweep_ms,
        config.key_space,
        config.ops_per_tick,
        config.tick_ms
    );

    let cache: Arc<WorkloadCache> = Arc::new(config.cache_builder().build()?);
    let writes = Arc::new(ExpiringCounter::new(Duration::from_secs(
        config.rate_window_secs,
    ))?);
    info!("Cache initialized: {:?}", cache);

    let workload = spawn_workload(Arc::clone(&cache), Arc::clone(&writes), &config);
    let reporter = spawn_reporter(Arc::clone(&cache), Arc::clone(&writes), &config);

    shutdown_signal().await;

    workload.abort();
    reporter.abort();
    warn!("Workload stopped");

    let stats = cache.stats();
    cache.close();
    writes.close();

    println!("{}", serde_json::to_string_pretty(&stats)?);
    info!("Runner shutdown complete");
    Ok(())
}

/// Issues `ops_per_tick` operations every tick: mostly reads, some writes
/// and the occasional remove, over a deterministic key sequence.
fn spawn_workload(
    cache: Arc<WorkloadCache>,
    writes: Arc<ExpiringCounter>,
    config: &Config,
) -> JoinHandle<()> {
    let key_space = config.key_space.max(1);
    let ops_per_tick = config.ops_per_tick;
    let tick = Duration::from_millis(config.tick_ms.max(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tick);
        let mut sequence: u64 = 0;
        loop {
            ticker.tick().await;
            for _ in 0..ops_per_tick {
                sequence = sequence.wrapping_add(1);
                let key = sequence.wrapping_mul(KEY_STRIDE) % key_space;
                match sequence % 10 {
                    0..=5 => {
                        if cache.get(&key).is_none() {
                            cache.set(key, Arc::new(format!("value-{}", sequence)));
                            writes.incr();
                        }
                    }
                    6..=8 => {
                        cache.set(key, Arc::new(format!("value-{}", sequence)));
                        writes.incr();
                    }
                    _ => {
                        cache.remove(&key);
                    }
                }
            }
        }
    })
}

/// Logs cache statistics every report interval.
fn spawn_reporter(
    cache: Arc<WorkloadCache>,
    writes: Arc<ExpiringCounter>,
    config: &Config,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(config.report_interval_secs.max(1));
    let window = writes.window();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let stats = cache.stats();
            info!(
                "Stats: entries={}, hits={}, misses={}, hit_rate={:.3}, evictions={}, expirations={}, writes/{:?}={}, reaper={:?}",
                stats.total_entries,
                stats.hits,
                stats.misses,
                stats.hit_rate(),
                stats.evictions,
                stats.expirations,
                window,
                writes.len(),
                cache.reaper_state()
            );
        }
    })
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
