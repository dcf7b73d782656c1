//! Integration tests for the single-flight TTL read cache.
//!
//! Uses `start_paused = true` so the tokio clock only moves when we
//! `advance` it (or when every task is idle and a timer is pending).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sessync_cache::ReadCache;

// =========================================================================
// Helpers
// =========================================================================

const TTL: Duration = Duration::from_secs(300);

type BoxedRead = Pin<Box<dyn Future<Output = Result<usize, String>> + Send>>;

/// Builds a read that counts how often it is issued, takes 50 ms, and
/// returns the call number.
fn counting_read(calls: &Arc<AtomicUsize>) -> impl FnOnce() -> BoxedRead + use<> {
    let calls = Arc::clone(calls);
    move || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(n)
        })
    }
}

fn failing_read(calls: &Arc<AtomicUsize>) -> impl FnOnce() -> BoxedRead + use<> {
    let calls = Arc::clone(calls);
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err("status 504".to_string())
        })
    }
}

// =========================================================================
// Deduplication
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_one_read() {
    let cache = ReadCache::new(TTL);
    let calls = Arc::new(AtomicUsize::new(0));

    let (a, b, c) = tokio::join!(
        cache.get_or_fetch(counting_read(&calls)),
        cache.get_or_fetch(counting_read(&calls)),
        cache.get_or_fetch(counting_read(&calls)),
    );

    assert_eq!(calls.load(Ordering::SeqCst), 1, "only one read may be issued");
    assert_eq!((a, b, c), (Ok(1), Ok(1), Ok(1)));
    assert_eq!(cache.stats().fetches, 1);
    assert_eq!(cache.stats().hits, 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_across_tasks_share_one_read() {
    let cache = Arc::new(ReadCache::new(TTL));
    let calls = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..5 {
        let cache = Arc::clone(&cache);
        let read = counting_read(&calls);
        handles.push(tokio::spawn(async move { cache.get_or_fetch(read).await }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), Ok(1));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// =========================================================================
// TTL
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_call_within_ttl_reuses_result() {
    let cache = ReadCache::new(TTL);
    let calls = Arc::new(AtomicUsize::new(0));

    cache.get_or_fetch(counting_read(&calls)).await.unwrap();
    tokio::time::advance(Duration::from_secs(200)).await;
    let second = cache.get_or_fetch(counting_read(&calls)).await;

    assert_eq!(second, Ok(1));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_call_after_ttl_issues_new_read() {
    let cache = ReadCache::new(TTL);
    let calls = Arc::new(AtomicUsize::new(0));

    cache.get_or_fetch(counting_read(&calls)).await.unwrap();
    tokio::time::advance(Duration::from_secs(301)).await;
    assert!(!cache.is_fresh());

    let second = cache.get_or_fetch(counting_read(&calls)).await;

    assert_eq!(second, Ok(2));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// =========================================================================
// Failure policy
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_failed_read_is_not_cached() {
    let cache = ReadCache::new(TTL);
    let calls = Arc::new(AtomicUsize::new(0));

    let first = cache.get_or_fetch(failing_read(&calls)).await;
    assert_eq!(first, Err("status 504".to_string()));
    assert!(!cache.is_fresh());

    // Immediate retry goes to the network again and can succeed.
    let second = cache.get_or_fetch(counting_read(&calls)).await;

    assert_eq!(second, Ok(2));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.stats().failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_read_is_shared_by_waiting_callers() {
    let cache = ReadCache::new(TTL);
    let calls = Arc::new(AtomicUsize::new(0));

    let (a, b) = tokio::join!(
        cache.get_or_fetch(failing_read(&calls)),
        cache.get_or_fetch(failing_read(&calls)),
    );

    assert!(a.is_err() && b.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().failures, 1, "one failure, however many waiters");
}

// =========================================================================
// prime / invalidate
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_primed_value_served_without_read() {
    let cache = ReadCache::new(TTL);
    let calls = Arc::new(AtomicUsize::new(0));

    cache.prime(42);
    let value = cache.get_or_fetch(counting_read(&calls)).await;

    assert_eq!(value, Ok(42));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_prime_replaces_stale_value() {
    let cache = ReadCache::new(TTL);
    let calls = Arc::new(AtomicUsize::new(0));

    cache.get_or_fetch(counting_read(&calls)).await.unwrap();
    cache.prime(99);

    assert_eq!(cache.get_or_fetch(counting_read(&calls)).await, Ok(99));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_primed_value_expires_after_ttl() {
    let cache = ReadCache::new(TTL);
    let calls = Arc::new(AtomicUsize::new(0));

    cache.prime(42);
    tokio::time::advance(Duration::from_secs(301)).await;
    assert!(!cache.is_fresh());

    assert_eq!(cache.get_or_fetch(counting_read(&calls)).await, Ok(1));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_primed_value_within_ttl_is_fresh() {
    let cache = ReadCache::new(TTL);
    let calls = Arc::new(AtomicUsize::new(0));

    cache.prime(42);
    tokio::time::advance(Duration::from_secs(299)).await;
    assert!(cache.is_fresh());

    assert_eq!(cache.get_or_fetch(counting_read(&calls)).await, Ok(42));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_forces_new_read() {
    let cache = ReadCache::new(TTL);
    let calls = Arc::new(AtomicUsize::new(0));

    cache.get_or_fetch(counting_read(&calls)).await.unwrap();
    cache.invalidate();
    cache.get_or_fetch(counting_read(&calls)).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
