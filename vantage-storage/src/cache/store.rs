//! Keyed TTL cache with stale-on-error reads and in-flight coalescing.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use vantage_core::{FetchError, FetchResult};

use super::freshness::{CacheEntry, CacheRead};
use super::stats::CacheStats;

type InFlight<V> = Shared<BoxFuture<'static, FetchResult<CacheRead<V>>>>;

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    in_flight: HashMap<String, InFlight<V>>,
    stats: CacheStats,
}

/// In-memory cache keyed by string with per-entry TTL.
///
/// Reads go through [`CacheStore::get_or_fetch`]:
///
/// - a fresh entry is returned without calling the fetcher;
/// - a call already in flight for the key is joined, never duplicated;
/// - otherwise the fetcher runs in its own task. Success replaces the entry.
///   Failure falls back to the previous entry, however old, and only
///   surfaces the error when there is nothing to fall back to.
///
/// The store is cheap to clone; clones share the same entries.
pub struct CacheStore<V> {
    state: Arc<Mutex<CacheState<V>>>,
}

impl<V> Clone for CacheStore<V> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<V> Default for CacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> CacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                entries: HashMap::new(),
                in_flight: HashMap::new(),
                stats: CacheStats::default(),
            })),
        }
    }

    /// Return the value for `key`, fetching it when no fresh entry exists.
    ///
    /// `fetcher` is only invoked when this call starts a network request; it
    /// is called while the store lock is held, so it must do nothing beyond
    /// constructing its future.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetcher: F,
    ) -> FetchResult<CacheRead<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchResult<V>> + Send + 'static,
    {
        let pending = {
            let mut guard = lock(&self.state);
            let state = &mut *guard;

            if let Some(entry) = state.entries.get(key) {
                if entry.is_fresh(Instant::now()) {
                    state.stats.hits += 1;
                    return Ok(CacheRead::cached(entry));
                }
            }

            match state.in_flight.get(key) {
                Some(in_flight) => {
                    state.stats.coalesced += 1;
                    tracing::trace!(key, "joining in-flight request");
                    in_flight.clone()
                }
                None => {
                    state.stats.misses += 1;
                    let pending = self.spawn_fetch(key.to_string(), ttl, fetcher());
                    state.in_flight.insert(key.to_string(), pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Read whatever is cached for `key`, fresh or not, without fetching.
    pub fn peek(&self, key: &str) -> Option<CacheRead<V>> {
        let guard = lock(&self.state);
        guard.entries.get(key).map(CacheRead::cached)
    }

    /// Check whether `key` has an entry that would be served without a fetch.
    pub fn is_fresh(&self, key: &str) -> bool {
        let guard = lock(&self.state);
        guard
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_fresh(Instant::now()))
    }

    /// Check whether a network call for `key` is outstanding.
    pub fn is_in_flight(&self, key: &str) -> bool {
        lock(&self.state).in_flight.contains_key(key)
    }

    /// Force one entry stale. It remains available as a stale fallback.
    pub fn invalidate(&self, key: &str) {
        if let Some(entry) = lock(&self.state).entries.get_mut(key) {
            entry.invalidate();
        }
    }

    /// Force every entry stale, keeping them as stale fallbacks.
    pub fn invalidate_all(&self) {
        let mut guard = lock(&self.state);
        for entry in guard.entries.values_mut() {
            entry.invalidate();
        }
    }

    /// Drop every entry. Requests already in flight are not affected.
    pub fn clear(&self) {
        let mut guard = lock(&self.state);
        let dropped = guard.entries.len();
        guard.entries.clear();
        tracing::debug!(dropped, "cache cleared");
    }

    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let guard = lock(&self.state);
        CacheStats {
            entry_count: guard.entries.len() as u64,
            ..guard.stats.clone()
        }
    }

    fn spawn_fetch<Fut>(&self, key: String, ttl: Duration, fetch: Fut) -> InFlight<V>
    where
        Fut: Future<Output = FetchResult<V>> + Send + 'static,
    {
        // Completion runs inside the task, so the entry is stored even when
        // every caller awaiting it has gone away.
        let task_state = Arc::clone(&self.state);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let outcome = fetch.await;
            complete(&task_state, &task_key, ttl, outcome, Instant::now())
        });

        let state = Arc::clone(&self.state);
        async move {
            match handle.await {
                Ok(read) => read,
                Err(join_err) => {
                    let err = FetchError::Interrupted {
                        resource: key.clone(),
                        reason: join_err.to_string(),
                    };
                    complete(&state, &key, ttl, Err(err), Instant::now())
                }
            }
        }
        .boxed()
        .shared()
    }
}

fn complete<V: Clone>(
    state: &Mutex<CacheState<V>>,
    key: &str,
    ttl: Duration,
    outcome: FetchResult<V>,
    fetched_at: Instant,
) -> FetchResult<CacheRead<V>> {
    let mut guard = lock(state);
    let state = &mut *guard;
    state.in_flight.remove(key);

    match outcome {
        Ok(value) => {
            let entry = CacheEntry::new(value, fetched_at, ttl);
            let read = CacheRead::fetched(&entry);
            state.entries.insert(key.to_string(), entry);
            Ok(read)
        }
        Err(err) => match state.entries.get(key) {
            Some(entry) => {
                state.stats.stale_served += 1;
                tracing::warn!(
                    key,
                    error = %err,
                    age_ms = (fetched_at.saturating_duration_since(entry.fetched_at()).as_millis() as u64),
                    "Serving stale cache entry after failed fetch"
                );
                Ok(CacheRead::stale(entry, err))
            }
            None => {
                tracing::debug!(key, error = %err, "Fetch failed with no cached fallback");
                Err(err)
            }
        },
    }
}

// The state is plain data, so a panic elsewhere cannot leave it half-written.
fn lock<V>(state: &Mutex<CacheState<V>>) -> MutexGuard<'_, CacheState<V>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
