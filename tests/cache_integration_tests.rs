//! Integration Tests for the Cache
//!
//! Exercises the public API end to end, including the background reaper.
//! Timing tests run on a paused clock so sleeps advance virtual time.

use std::sync::Arc;
use std::time::Duration;

use lru_ttl_cache::{Cache, CacheError, ExpiringCounter, ReaperState, RefreshMode};
use tokio::runtime::Handle;

// == Helper Functions ==

const TTL: Duration = Duration::from_millis(200);
const MIN_SWEEP: Duration = Duration::from_millis(50);

fn ttl_cache(mode: RefreshMode) -> Cache<String, i32> {
    Cache::builder()
        .with_ttl(TTL, mode)
        .with_min_sweep_interval(MIN_SWEEP)
        .build()
        .unwrap()
}

fn key(name: &str) -> String {
    name.to_string()
}

fn alive_tasks() -> usize {
    Handle::current().metrics().num_alive_tasks()
}

/// Polls `condition` until it holds or `timeout` elapses.
async fn wait_until(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

// == Capacity ==

#[test]
fn test_capacity_scenario() {
    let cache: Cache<String, i32> = Cache::builder().with_lru(2).build().unwrap();

    cache.set(key("x"), 1);
    cache.set(key("y"), 2);
    cache.set(key("z"), 3);

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get(&key("x")), None);
    assert_eq!(cache.get(&key("y")), Some(2));
    assert_eq!(cache.get(&key("z")), Some(3));
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn test_lru_evicts_least_recently_used() {
    let cache: Cache<String, i32> = Cache::builder().with_lru(2).build().unwrap();

    cache.set(key("a"), 1);
    cache.set(key("b"), 2);
    assert_eq!(cache.get(&key("a")), Some(1));
    cache.set(key("c"), 3);

    assert_eq!(cache.get(&key("b")), None);
    assert_eq!(cache.get(&key("a")), Some(1));
    assert_eq!(cache.get(&key("c")), Some(3));
}

#[test]
fn test_capacity_never_exceeded() {
    let cache: Cache<u32, u32> = Cache::builder().with_lru(5).build().unwrap();
    for i in 0..100 {
        cache.set(i % 13, i);
        assert!(cache.len() <= 5);
    }
}

#[test]
fn test_unbounded_cache() {
    let cache: Cache<u32, u32> = Cache::builder().with_lru(0).build().unwrap();
    for i in 0..1000 {
        cache.set(i, i);
    }
    assert_eq!(cache.len(), 1000);
    assert_eq!(cache.capacity(), None);
}

// == TTL ==

#[tokio::test(start_paused = true)]
async fn test_ttl_expiry_without_refresh() {
    let cache = ttl_cache(RefreshMode::NONE);

    cache.set(key("k"), 7);
    assert_eq!(cache.get(&key("k")), Some(7));
    assert_eq!(cache.reaper_state(), ReaperState::Active);

    // Reads do not extend life under NONE
    tokio::time::sleep(TTL - MIN_SWEEP).await;
    assert_eq!(cache.get(&key("k")), Some(7));

    // Swept within the minimum sweep interval with no further reads
    tokio::time::sleep(MIN_SWEEP * 2).await;
    assert_eq!(cache.len(), 0);
    assert_eq!(cache.get(&key("k")), None);
    assert_eq!(cache.reaper_state(), ReaperState::Idle);
    assert_eq!(cache.stats().expirations, 1);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_on_read_extends_life() {
    let cache = ttl_cache(RefreshMode::ON_READ);
    cache.set(key("k"), 1);

    for _ in 0..10 {
        tokio::time::sleep(TTL / 2).await;
        assert_eq!(cache.get(&key("k")), Some(1));
    }

    tokio::time::sleep(TTL - MIN_SWEEP).await;
    assert_eq!(cache.len(), 1);

    tokio::time::sleep(MIN_SWEEP * 3).await;
    assert_eq!(cache.len(), 0);
    assert_eq!(cache.get(&key("k")), None);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_on_write_extends_life() {
    let cache = ttl_cache(RefreshMode::ON_WRITE);
    cache.set(key("k"), 1);

    tokio::time::sleep(TTL / 2).await;
    cache.set(key("k"), 2);
    assert_eq!(cache.ttl_remaining(&key("k")), Some(TTL));

    tokio::time::sleep(TTL - MIN_SWEEP).await;
    assert_eq!(cache.get(&key("k")), Some(2));

    tokio::time::sleep(MIN_SWEEP * 3).await;
    assert_eq!(cache.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_on_read_ignores_writes() {
    let cache = ttl_cache(RefreshMode::ON_READ);
    cache.set(key("k"), 1);

    tokio::time::sleep(TTL / 2).await;
    cache.set(key("k"), 2);
    assert_eq!(cache.ttl_remaining(&key("k")), Some(TTL / 2));

    tokio::time::sleep(TTL / 2 + MIN_SWEEP).await;
    assert_eq!(cache.len(), 0);
}

#[test]
fn test_lazy_expiration_without_reaper_progress() {
    // The reaper is spawned on a runtime nobody drives, so only get() can reclaim
    let idle_runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let cache: Cache<String, i32> = Cache::builder()
        .with_ttl(Duration::from_millis(30), RefreshMode::NONE)
        .with_min_sweep_interval(Duration::from_millis(10))
        .with_runtime(idle_runtime.handle().clone())
        .build()
        .unwrap();

    cache.set(key("k"), 1);
    std::thread::sleep(Duration::from_millis(60));

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&key("k")), None);
    assert_eq!(cache.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_lru_and_ttl_together() {
    let cache: Cache<String, i32> = Cache::builder()
        .with_lru(2)
        .with_ttl(TTL, RefreshMode::NONE)
        .with_min_sweep_interval(MIN_SWEEP)
        .build()
        .unwrap();

    cache.set(key("1"), 1);
    cache.set(key("a"), 2);
    assert_eq!(cache.get(&key("1")), Some(1));
    cache.set(key("2"), 3);

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get(&key("a")), None);
    assert_eq!(cache.get(&key("1")), Some(1));
    assert_eq!(cache.get(&key("2")), Some(3));

    tokio::time::sleep(TTL + MIN_SWEEP).await;
    assert_eq!(cache.len(), 0);
    assert_eq!(cache.reaper_state(), ReaperState::Idle);
}

// == Remove ==

#[tokio::test(start_paused = true)]
async fn test_remove_is_idempotent() {
    let cache = ttl_cache(RefreshMode::NONE);
    cache.remove(&key("missing"));

    cache.set(key("k"), 1);
    assert_eq!(cache.remove(&key("k")), Some(1));
    assert_eq!(cache.remove(&key("k")), None);
    assert!(cache.is_empty());

    // Reaper finds an empty expiry list and goes idle
    tokio::time::sleep(TTL + MIN_SWEEP).await;
    assert_eq!(cache.reaper_state(), ReaperState::Idle);
}

// == Reaper Lifecycle ==

#[tokio::test(start_paused = true)]
async fn test_reaper_stops_when_drained_and_restarts() {
    let baseline = alive_tasks();
    let cache = ttl_cache(RefreshMode::NONE);

    cache.set(key("a"), 1);
    cache.set(key("b"), 2);
    assert_eq!(alive_tasks(), baseline + 1);

    assert!(wait_until(|| cache.is_empty(), TTL * 2).await);
    assert!(wait_until(|| alive_tasks() == baseline, TTL).await);
    assert_eq!(cache.reaper_state(), ReaperState::Idle);

    cache.set(key("c"), 3);
    assert_eq!(cache.reaper_state(), ReaperState::Active);
    assert_eq!(alive_tasks(), baseline + 1);

    assert!(wait_until(|| cache.is_empty(), TTL * 2).await);
    assert!(wait_until(|| alive_tasks() == baseline, TTL).await);
}

#[tokio::test(start_paused = true)]
async fn test_close_releases_reaper() {
    let baseline = alive_tasks();
    let cache: Cache<String, i32> = Cache::builder()
        .with_lru(2)
        .with_ttl(Duration::from_secs(3600), RefreshMode::NONE)
        .build()
        .unwrap();

    cache.set(key("k"), 1);
    assert_eq!(cache.get(&key("k")), Some(1));
    assert_eq!(alive_tasks(), baseline + 1);

    cache.close();
    assert!(wait_until(|| alive_tasks() == baseline, Duration::from_millis(100)).await);
    assert_eq!(cache.len(), 0);
    assert_eq!(cache.reaper_state(), ReaperState::Terminated);
}

#[tokio::test]
async fn test_close_before_reaper_ever_ran() {
    let cache = ttl_cache(RefreshMode::NONE);
    assert_eq!(cache.reaper_state(), ReaperState::Idle);

    cache.close();
    assert_eq!(cache.reaper_state(), ReaperState::Terminated);

    // No launch after close
    let baseline = alive_tasks();
    cache.set(key("k"), 1);
    assert_eq!(alive_tasks(), baseline);
    assert_eq!(cache.len(), 0);
}

#[tokio::test]
async fn test_double_close_is_safe() {
    let cache = ttl_cache(RefreshMode::NONE);
    cache.set(key("k"), 1);

    cache.close();
    cache.close();

    assert!(cache.is_closed());
    assert_eq!(cache.get(&key("k")), None);
    assert_eq!(cache.remove(&key("k")), None);
}

#[tokio::test(start_paused = true)]
async fn test_drop_stops_reaper() {
    let baseline = alive_tasks();
    {
        let cache: Cache<u32, u32> = Cache::builder()
            .with_ttl(Duration::from_secs(60), RefreshMode::NONE)
            .build()
            .unwrap();
        cache.set(1, 1);
        assert_eq!(alive_tasks(), baseline + 1);
    }
    assert!(wait_until(|| alive_tasks() == baseline, Duration::from_millis(100)).await);
}

// == Concurrency ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sets_launch_one_reaper() {
    let baseline = alive_tasks();
    let cache: Arc<Cache<u32, u32>> = Arc::new(
        Cache::builder()
            .with_lru(64)
            .with_ttl(Duration::from_secs(60), RefreshMode::ON_READ)
            .build()
            .unwrap(),
    );

    let workers: Vec<_> = (0..8u32)
        .map(|worker| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                for i in 0..500u32 {
                    cache.set(worker * 1000 + i, i);
                    cache.get(&(worker * 1000 + i / 2));
                    assert!(cache.len() <= 64);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.await.unwrap();
    }

    assert_eq!(cache.len(), 64);
    assert_eq!(cache.reaper_state(), ReaperState::Active);
    assert!(wait_until(|| alive_tasks() == baseline + 1, Duration::from_secs(1)).await);

    cache.close();
    assert!(wait_until(|| alive_tasks() == baseline, Duration::from_secs(1)).await);
}

// == Construction ==

#[test]
fn test_ttl_requires_runtime() {
    let result: Result<Cache<u32, u32>, CacheError> = Cache::builder()
        .with_ttl(Duration::from_secs(1), RefreshMode::NONE)
        .build();
    assert!(matches!(result, Err(CacheError::NoRuntime(_))));
}

// == Expiring Counter ==

#[tokio::test(start_paused = true)]
async fn test_counter_as_rate_limiter() {
    let window = Duration::from_millis(500);
    let limit = 3;
    let counter =
        ExpiringCounter::with_min_sweep_interval(window, Duration::from_millis(50)).unwrap();

    let mut allowed = 0;
    for _ in 0..5 {
        if counter.len() < limit {
            counter.incr();
            allowed += 1;
        }
    }
    assert_eq!(allowed, 3);

    tokio::time::sleep(window + Duration::from_millis(50)).await;
    assert!(counter.is_empty());
    assert_eq!(counter.reaper_state(), ReaperState::Idle);

    counter.incr();
    assert_eq!(counter.len(), 1);
}
