//! Single-flight TTL read cache for Sessync.
//!
//! Wraps an expensive async read (the session load) so that:
//!
//! - at most ONE read is outstanding at any time; callers arriving while
//!   it is in flight attach to it instead of issuing their own;
//! - a successful result is reused until the TTL (measured from when the
//!   read was issued) elapses;
//! - a failed result is never reused, and the next caller retries at once.
//!
//! # Timing
//!
//! Time is read from `tokio::time::Instant`, so tests can pause the clock
//! and `advance` past the TTL without sleeping:
//!
//! ```ignore
//! tokio::time::pause();
//! cache.get_or_fetch(fetch).await;          // issues a read
//! tokio::time::advance(Duration::from_secs(301)).await;
//! cache.get_or_fetch(fetch).await;          // issues another
//! ```

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::{self, BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::{debug, trace};

/// How long a successful read stays fresh unless configured otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// A read that any number of callers can await; all see the same output.
type SharedRead<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Counters describing how the cache has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads actually issued.
    pub fetches: u64,
    /// Calls served by an in-flight or fresh read.
    pub hits: u64,
    /// Reads that resolved to an error.
    pub failures: u64,
    /// Values stored directly with [`ReadCache::prime`].
    pub primes: u64,
}

// ---------------------------------------------------------------------------
// Cache entry
// ---------------------------------------------------------------------------

struct CacheEntry<T, E> {
    issued_at: Instant,
    /// Distinguishes this entry from any that replaced it while its read
    /// was still in flight.
    generation: u64,
    read: SharedRead<T, E>,
}

impl<T, E> CacheEntry<T, E>
where
    T: Clone,
    E: Clone,
{
    /// In-flight reads are always reusable, whatever their age. Resolved
    /// reads are reusable while fresh and successful.
    fn is_reusable(&self, ttl: Duration) -> bool {
        match self.read.peek() {
            None => true,
            Some(Ok(_)) => self.issued_at.elapsed() < ttl,
            Some(Err(_)) => false,
        }
    }
}

struct Inner<T, E> {
    entry: Option<CacheEntry<T, E>>,
    next_generation: u64,
    stats: CacheStats,
}

impl<T, E> Inner<T, E> {
    fn store(&mut self, read: SharedRead<T, E>) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.entry = Some(CacheEntry {
            issued_at: Instant::now(),
            generation,
            read,
        });
        generation
    }
}

// ---------------------------------------------------------------------------
// ReadCache
// ---------------------------------------------------------------------------

/// Deduplicating, time-boxed memo around an async read.
///
/// `T` and `E` must be `Clone` because one result is handed to every
/// caller that awaited it.
///
/// The internal lock is only held for bookkeeping, never across an
/// `.await`, so the cache can be shared freely between tasks.
pub struct ReadCache<T, E> {
    ttl: Duration,
    inner: Mutex<Inner<T, E>>,
}

impl<T, E> ReadCache<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Creates an empty cache whose reads stay fresh for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        debug!(ttl_secs = ttl.as_secs_f64(), "read cache created");
        Self {
            ttl,
            inner: Mutex::new(Inner {
                entry: None,
                next_generation: 0,
                stats: CacheStats::default(),
            }),
        }
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached or in-flight result, or starts a new read.
    ///
    /// `fetch` is only called when there's nothing reusable; it must
    /// build the read future without touching this cache.
    ///
    /// A read that fails is dropped from the cache as soon as it
    /// resolves, so the following call issues a fresh one.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (generation, read) = {
            let mut inner = self.lock();
            let reusable = inner
                .entry
                .as_ref()
                .filter(|entry| entry.is_reusable(self.ttl))
                .map(|entry| (entry.generation, entry.read.clone()));

            match reusable {
                Some(hit) => {
                    inner.stats.hits += 1;
                    trace!(generation = hit.0, "read cache hit");
                    hit
                }
                None => {
                    let read = fetch().boxed().shared();
                    let generation = inner.store(read.clone());
                    inner.stats.fetches += 1;
                    debug!(generation, "read cache miss, issuing read");
                    (generation, read)
                }
            }
        };

        let result = read.await;
        if result.is_err() {
            self.forget(generation);
        }
        result
    }

    /// Stores an already-known value as if a read had just returned it.
    ///
    /// Replaces whatever was cached, including an in-flight read (callers
    /// already awaiting that read still get its result).
    pub fn prime(&self, value: T) {
        let read = future::ready(Ok(value)).boxed().shared();
        // Resolve it now so `peek` sees a result and the TTL applies.
        let _ = read.clone().now_or_never();

        let mut inner = self.lock();
        let generation = inner.store(read);
        inner.stats.primes += 1;
        debug!(generation, "read cache primed");
    }

    /// Drops the cached entry; the next call issues a read.
    pub fn invalidate(&self) {
        let mut inner = self.lock();
        if inner.entry.take().is_some() {
            debug!("read cache invalidated");
        }
    }

    /// Whether the next call would be served without a new read.
    pub fn is_fresh(&self) -> bool {
        self.lock()
            .entry
            .as_ref()
            .is_some_and(|entry| entry.is_reusable(self.ttl))
    }

    /// Snapshot of the usage counters.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    /// Removes a failed entry, unless it was already replaced.
    fn forget(&self, generation: u64) {
        let mut inner = self.lock();
        if inner
            .entry
            .as_ref()
            .is_some_and(|entry| entry.generation == generation)
        {
            inner.entry = None;
            inner.stats.failures += 1;
            debug!(generation, "read failed, not caching");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T, E>> {
        // The guarded data is plain bookkeeping with no invariants a
        // panicking holder could break half-way.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, E> Default for ReadCache<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
